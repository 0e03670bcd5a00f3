pub mod aggregate;
pub mod app_config;
pub mod config_file;
pub mod errors;
pub mod estimator;
pub mod fanout;
pub mod identity;
pub mod nutrition;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod sanitize;
pub mod server;
pub mod store;
pub mod types;
pub mod ui;

pub use crate::aggregate::aggregate;
pub use crate::app_config::AppConfig;
pub use crate::errors::{InsufficientSamples, ParseError, PipelineError, ProviderError};
pub use crate::estimator::EstimatorClient;
pub use crate::fanout::{AttemptFailure, AttemptOutcome, FanOutScheduler};
pub use crate::nutrition::{AggregateResult, EntryRecord, NutritionEstimate};
pub use crate::parser::parse_estimate;
pub use crate::pipeline::{NutritionPipeline, PipelineConfig, PipelineOverrides, PipelineStage};
pub use crate::providers::{
    ProviderOverrides, VisionProvider, VisionRequest, VisionResponse, create_provider,
    create_provider_with_overrides,
};
pub use crate::types::{EntryId, ModelId, RunId, SessionId, UserId};
