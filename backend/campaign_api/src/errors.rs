//! Application-wide error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use funding_engine::{ErrorKind, FundingError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Funding(#[from] FundingError),

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("Unknown campaign id: {0}")]
    InvalidId(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Funding(err) => {
                let kind = err.kind();
                let status = match kind {
                    ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::CampaignClosed => StatusCode::CONFLICT,
                    ErrorKind::Contention => StatusCode::SERVICE_UNAVAILABLE,
                    ErrorKind::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, kind.as_str())
            }
            Self::BadRequest(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Validation.as_str(),
            ),
            Self::InvalidId(_) => (StatusCode::NOT_FOUND, ErrorKind::NotFound.as_str()),
            Self::Database(_) | Self::Migrate(_) | Self::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::StoreUnavailable.as_str(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                kind,
            }),
        )
            .into_response()
    }
}
