//! Errors surfaced by the HTTP routes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed request field.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Prediction input that is not a number.
    #[error("could not convert string to float: '{0}'")]
    Parse(String),

    /// Upstream completion or messaging call failed.
    #[error("External service error: {0:#}")]
    ExternalService(anyhow::Error),

    /// Regression artifact missing or unreadable.
    #[error("Failed to load regression artifact: {0:#}")]
    Load(anyhow::Error),

    #[error("Template rendering error: {0}")]
    Render(#[from] askama::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Parse(_) => StatusCode::BAD_REQUEST,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Load(_) | AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!("Request failed ({}): {}", status, self);
        (status, self.to_string()).into_response()
    }
}
