use thiserror::Error;

/// Failure talking to a vision provider. Every variant is a transport error
/// from the pipeline's point of view.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Missing API key for {0}")]
    MissingApiKey(String),

    #[error("No vision provider configured (set PROVIDER, GEMINI_API_KEY or OPENAI_API_KEY)")]
    NoProviderConfigured,

    #[error("Provider configuration error: {0}")]
    Config(String),

    #[error("Image payload is empty")]
    EmptyImage,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    ApiError(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Why a model reply could not be turned into a nutrition estimate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Reply is not a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {0} is not a number")]
    NonNumeric(&'static str),

    #[error("Field {field} is negative ({value})")]
    Negative { field: &'static str, value: f64 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Only {succeeded} of {requested} samples succeeded; at least {required} required")]
pub struct InsufficientSamples {
    pub succeeded: usize,
    pub required: usize,
    pub requested: usize,
}

/// The only error a pipeline caller has to handle.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Image payload is empty")]
    EmptyImage,

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    InsufficientSamples(#[from] InsufficientSamples),

    #[error("Internal pipeline fault: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Unexpected store response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Identity response missing {0}")]
    MissingClaim(&'static str),
}
