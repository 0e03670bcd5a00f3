//! Pipeline coordinator: one image in, one averaged record (or a typed
//! failure) out.
//!
//! ```text
//! Started -> FanningOut -> Aggregating -> Completed
//!    \            \             \
//!     +------------+-------------+-----> Failed
//! ```
//!
//! Nothing is retried at this level. A failed run leaves no partial state
//! behind; the caller re-invokes from scratch if it wants another try.

pub mod logging;
pub mod types;

use serde_json::json;

use crate::aggregate::aggregate;
use crate::errors::PipelineError;
use crate::estimator::EstimatorClient;
use crate::fanout::{AttemptOutcome, FanOutScheduler};
use crate::nutrition::AggregateResult;
use crate::types::RunId;

pub use logging::PipelineLogger;
pub use types::{PipelineConfig, PipelineOverrides, PipelineStage};

pub struct NutritionPipeline {
    scheduler: FanOutScheduler,
    config: PipelineConfig,
    logger: Option<PipelineLogger>,
}

impl NutritionPipeline {
    pub fn new(estimator: EstimatorClient, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let scheduler = FanOutScheduler::new(estimator).with_timeout(config.per_call_timeout);
        Ok(Self {
            scheduler,
            config,
            logger: None,
        })
    }

    pub fn with_logger(mut self, logger: PipelineLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run_pipeline(
        &self,
        image: &[u8],
        instruction: &str,
        overrides: &PipelineOverrides,
    ) -> Result<AggregateResult, PipelineError> {
        let mut run = Run::start(RunId::generate(), self.logger.as_ref());
        let result = self.drive(&mut run, image, instruction, overrides).await;

        match &result {
            Ok(aggregate) => {
                run.advance(
                    PipelineStage::Completed,
                    json!({
                        "samples_used": aggregate.samples_used(),
                        "samples_requested": aggregate.samples_requested(),
                    }),
                );
                log::info!(
                    "run {}: {}/{} samples, {} kcal",
                    run.id,
                    aggregate.samples_used(),
                    aggregate.samples_requested(),
                    aggregate.calories()
                );
            }
            Err(e) => {
                run.advance(PipelineStage::Failed, json!({ "error": e.to_string() }));
                log::warn!("run {} failed: {e}", run.id);
            }
        }

        result
    }

    async fn drive(
        &self,
        run: &mut Run<'_>,
        image: &[u8],
        instruction: &str,
        overrides: &PipelineOverrides,
    ) -> Result<AggregateResult, PipelineError> {
        if image.is_empty() {
            return Err(PipelineError::EmptyImage);
        }
        let (n, min_quorum) = self.config.resolve(overrides)?;

        let estimator = self.scheduler.estimator();
        run.advance(
            PipelineStage::FanningOut,
            json!({
                "samples_requested": n,
                "min_quorum": min_quorum,
                "image_bytes": image.len(),
                "provider": estimator.provider_name(),
                "model": estimator.model(),
            }),
        );
        let outcomes = self.scheduler.run(image, instruction, n).await;

        for (slot, outcome) in outcomes.iter().enumerate() {
            run.record_attempt(slot, outcome);
        }
        if outcomes.len() != n {
            return Err(PipelineError::Internal(format!(
                "fan-out returned {} outcomes for {n} requested samples",
                outcomes.len()
            )));
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        run.advance(PipelineStage::Aggregating, json!({ "succeeded": succeeded }));
        aggregate(&outcomes, n, min_quorum)
    }
}

struct Run<'a> {
    id: RunId,
    stage: PipelineStage,
    logger: Option<&'a PipelineLogger>,
}

impl<'a> Run<'a> {
    fn start(id: RunId, logger: Option<&'a PipelineLogger>) -> Self {
        let run = Self {
            id,
            stage: PipelineStage::Started,
            logger,
        };
        log::debug!("run {}: {}", run.id, run.stage);
        run.emit(PipelineStage::Started.as_str(), json!({}));
        run
    }

    fn advance(&mut self, next: PipelineStage, data: serde_json::Value) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.stage
        );
        log::debug!("run {}: {} -> {next}", self.id, self.stage);
        self.stage = next;
        self.emit(next.as_str(), data);
    }

    fn record_attempt(&self, slot: usize, outcome: &AttemptOutcome) {
        let data = match outcome {
            AttemptOutcome::Success(estimate) => json!({
                "slot": slot,
                "outcome": "success",
                "estimate": estimate,
            }),
            AttemptOutcome::Failure(failure) => json!({
                "slot": slot,
                "outcome": failure.kind(),
                "detail": crate::sanitize::sanitize_for_log(&failure.to_string()),
            }),
        };
        self.emit("attempt", data);
    }

    fn emit(&self, step: &str, data: serde_json::Value) {
        if let Some(logger) = self.logger {
            if let Err(e) = logger.log_event(&self.id, step, data) {
                log::warn!("failed to write pipeline event {step}: {e}");
            }
        }
    }
}
