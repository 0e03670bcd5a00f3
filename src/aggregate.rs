//! Reduction of fanned-out samples into one record.
//!
//! Each field is the arithmetic mean over the successful samples only (never
//! over the number requested). Means are rounded half away from zero:
//! calories and gram fields to [`MASS_DECIMALS`] decimal place, the satiety
//! index to [`SATIETY_DECIMALS`]. So calories `{100, 150, 201}` average to
//! `150.3`.

use crate::errors::{InsufficientSamples, PipelineError};
use crate::fanout::AttemptOutcome;
use crate::nutrition::{AggregateResult, NutritionEstimate};

pub const MASS_DECIMALS: i32 = 1;
pub const SATIETY_DECIMALS: i32 = 2;

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Mean of the `Success` outcomes, provided at least `min_quorum` of them
/// exist. A quorum of zero is treated as one.
///
/// `samples_requested` is reported back unchanged; more outcomes than that
/// is an internal fault.
pub fn aggregate(
    outcomes: &[AttemptOutcome],
    samples_requested: usize,
    min_quorum: usize,
) -> Result<AggregateResult, PipelineError> {
    if outcomes.len() > samples_requested {
        return Err(PipelineError::Internal(format!(
            "{} outcomes for {samples_requested} requested samples",
            outcomes.len()
        )));
    }

    let successes: Vec<&NutritionEstimate> =
        outcomes.iter().filter_map(AttemptOutcome::estimate).collect();
    let k = successes.len();
    let required = min_quorum.max(1);

    if k < required {
        return Err(InsufficientSamples {
            succeeded: k,
            required,
            requested: samples_requested,
        }
        .into());
    }

    let mean = |field: fn(&NutritionEstimate) -> f64| {
        successes.iter().map(|e| field(e)).sum::<f64>() / k as f64
    };

    let averaged = NutritionEstimate::new(
        round_to(mean(NutritionEstimate::calories), MASS_DECIMALS),
        round_to(mean(NutritionEstimate::protein_g), MASS_DECIMALS),
        round_to(mean(NutritionEstimate::fat_g), MASS_DECIMALS),
        round_to(mean(NutritionEstimate::carbs_g), MASS_DECIMALS),
        round_to(mean(NutritionEstimate::sugar_g), MASS_DECIMALS),
        round_to(mean(NutritionEstimate::fiber_g), MASS_DECIMALS),
        round_to(mean(NutritionEstimate::satiety_index), SATIETY_DECIMALS),
    );

    Ok(AggregateResult::from_mean(averaged, k, samples_requested))
}
