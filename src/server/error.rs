use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::errors::{AuthError, PipelineError, StoreError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing form field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Identity provider error: {0}")]
    Auth(#[from] AuthError),

    #[error("Sign-in is not configured")]
    IdentityUnavailable,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) | AppError::MissingField(_) => StatusCode::BAD_REQUEST,
            AppError::Pipeline(PipelineError::EmptyImage | PipelineError::InvalidConfig(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Pipeline(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::BAD_GATEWAY,
            AppError::IdentityUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}", crate::sanitize::sanitize_for_log(&self.to_string()));
        }

        (status, self.to_string()).into_response()
    }
}
