use serde::{Deserialize, Serialize};

use crate::types::{EntryId, UserId};

/// One parsed model sample. Only the response parser builds these, so every
/// value is finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutritionEstimate {
    calories: f64,
    protein_g: f64,
    fat_g: f64,
    carbs_g: f64,
    sugar_g: f64,
    fiber_g: f64,
    satiety_index: f64,
}

impl NutritionEstimate {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        calories: f64,
        protein_g: f64,
        fat_g: f64,
        carbs_g: f64,
        sugar_g: f64,
        fiber_g: f64,
        satiety_index: f64,
    ) -> Self {
        Self {
            calories,
            protein_g,
            fat_g,
            carbs_g,
            sugar_g,
            fiber_g,
            satiety_index,
        }
    }

    pub fn calories(&self) -> f64 {
        self.calories
    }

    pub fn protein_g(&self) -> f64 {
        self.protein_g
    }

    pub fn fat_g(&self) -> f64 {
        self.fat_g
    }

    pub fn carbs_g(&self) -> f64 {
        self.carbs_g
    }

    pub fn sugar_g(&self) -> f64 {
        self.sugar_g
    }

    pub fn fiber_g(&self) -> f64 {
        self.fiber_g
    }

    /// Scale is whatever the instruction asks the model for; treated as an opaque scalar.
    pub fn satiety_index(&self) -> f64 {
        self.satiety_index
    }
}

/// Mean of the successful samples of one pipeline run.
///
/// Invariant: `0 < samples_used <= samples_requested`. Built only by
/// [`crate::aggregate::aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateResult {
    calories: f64,
    protein_g: f64,
    fat_g: f64,
    carbs_g: f64,
    sugar_g: f64,
    fiber_g: f64,
    satiety_index: f64,
    samples_used: usize,
    samples_requested: usize,
}

impl AggregateResult {
    pub(crate) fn from_mean(
        mean: NutritionEstimate,
        samples_used: usize,
        samples_requested: usize,
    ) -> Self {
        debug_assert!(samples_used > 0 && samples_used <= samples_requested);
        Self {
            calories: mean.calories,
            protein_g: mean.protein_g,
            fat_g: mean.fat_g,
            carbs_g: mean.carbs_g,
            sugar_g: mean.sugar_g,
            fiber_g: mean.fiber_g,
            satiety_index: mean.satiety_index,
            samples_used,
            samples_requested,
        }
    }

    pub fn calories(&self) -> f64 {
        self.calories
    }

    pub fn protein_g(&self) -> f64 {
        self.protein_g
    }

    pub fn fat_g(&self) -> f64 {
        self.fat_g
    }

    pub fn carbs_g(&self) -> f64 {
        self.carbs_g
    }

    pub fn sugar_g(&self) -> f64 {
        self.sugar_g
    }

    pub fn fiber_g(&self) -> f64 {
        self.fiber_g
    }

    pub fn satiety_index(&self) -> f64 {
        self.satiety_index
    }

    pub fn samples_used(&self) -> usize {
        self.samples_used
    }

    pub fn samples_requested(&self) -> usize {
        self.samples_requested
    }
}

/// Row persisted for one analysed photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub eid: EntryId,
    pub uid: UserId,
    pub image_url: String,
    pub timestamp: i64,
    pub calories: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
    pub sugar_g: f64,
    pub fiber_g: f64,
    pub satiety_index: f64,
    pub samples_used: usize,
    pub samples_requested: usize,
}

impl EntryRecord {
    pub fn new(
        eid: EntryId,
        uid: UserId,
        image_url: String,
        timestamp: i64,
        result: &AggregateResult,
    ) -> Self {
        Self {
            eid,
            uid,
            image_url,
            timestamp,
            calories: result.calories,
            protein_g: result.protein_g,
            fat_g: result.fat_g,
            carbs_g: result.carbs_g,
            sugar_g: result.sugar_g,
            fiber_g: result.fiber_g,
            satiety_index: result.satiety_index,
            samples_used: result.samples_used,
            samples_requested: result.samples_requested,
        }
    }
}
