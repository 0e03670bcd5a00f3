use futures::future::join_all;
use std::time::Duration;
use thiserror::Error;

use crate::errors::{ParseError, ProviderError};
use crate::estimator::EstimatorClient;
use crate::nutrition::NutritionEstimate;
use crate::parser::parse_estimate;
use crate::sanitize::sanitize_for_log;

#[derive(Error, Debug)]
pub enum AttemptFailure {
    #[error("transport error: {0}")]
    Transport(#[from] ProviderError),

    #[error("malformed response: {0}")]
    MalformedResponse(#[from] ParseError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl AttemptFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptFailure::Transport(_) => "transport",
            AttemptFailure::MalformedResponse(_) => "malformed_response",
            AttemptFailure::Timeout(_) => "timeout",
        }
    }
}

/// Terminal state of one fanned-out sample.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(NutritionEstimate),
    Failure(AttemptFailure),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success(_))
    }

    pub fn estimate(&self) -> Option<&NutritionEstimate> {
        match self {
            AttemptOutcome::Success(estimate) => Some(estimate),
            AttemptOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&AttemptFailure> {
        match self {
            AttemptOutcome::Success(_) => None,
            AttemptOutcome::Failure(failure) => Some(failure),
        }
    }
}

/// Issues `n` independent estimator calls for the same image and waits for
/// every one of them to settle.
#[derive(Clone)]
pub struct FanOutScheduler {
    estimator: EstimatorClient,
    per_call_timeout: Option<Duration>,
}

impl FanOutScheduler {
    pub fn new(estimator: EstimatorClient) -> Self {
        Self {
            estimator,
            per_call_timeout: None,
        }
    }

    pub fn with_timeout(mut self, per_call_timeout: Option<Duration>) -> Self {
        self.per_call_timeout = per_call_timeout;
        self
    }

    pub fn estimator(&self) -> &EstimatorClient {
        &self.estimator
    }

    /// Always returns exactly `n` outcomes. Callers must not read meaning into
    /// their order.
    pub async fn run(&self, image: &[u8], instruction: &str, n: usize) -> Vec<AttemptOutcome> {
        join_all((0..n).map(|slot| self.attempt(slot, image, instruction))).await
    }

    async fn attempt(&self, slot: usize, image: &[u8], instruction: &str) -> AttemptOutcome {
        let outcome = match self.call(image, instruction).await {
            Ok(raw) => match parse_estimate(&raw) {
                Ok(estimate) => AttemptOutcome::Success(estimate),
                Err(e) => {
                    log::debug!("sample {slot} reply: {}", sanitize_for_log(&raw));
                    AttemptOutcome::Failure(e.into())
                }
            },
            Err(failure) => AttemptOutcome::Failure(failure),
        };

        if let AttemptOutcome::Failure(failure) = &outcome {
            log::warn!(
                "sample {slot} failed: {}",
                sanitize_for_log(&failure.to_string())
            );
        }
        outcome
    }

    async fn call(&self, image: &[u8], instruction: &str) -> Result<String, AttemptFailure> {
        let call = self.estimator.estimate(image, instruction);
        match self.per_call_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => Ok(result?),
                Err(_) => Err(AttemptFailure::Timeout(limit)),
            },
            None => Ok(call.await?),
        }
    }
}
