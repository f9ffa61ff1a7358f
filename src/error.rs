use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    dao::valorant::{FetchClass, FetchError},
    services::engine::QueueClosed,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Registry storage backend failed.
    #[error("storage unavailable")]
    Storage(#[source] StorageError),
    /// The user has no registration in the guild.
    #[error("user is not registered in this guild")]
    NotRegistered,
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Provider rate limit exhausted.
    #[error("match provider rate limited")]
    RateLimited(#[source] FetchError),
    /// Provider unreachable or erroring.
    #[error("match provider unavailable")]
    ProviderUnavailable(#[source] FetchError),
    /// The engine task is gone; signals cannot be accepted.
    #[error("signal ingestion unavailable")]
    QueueClosed(#[from] QueueClosed),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage(err)
    }
}

impl From<FetchError> for ServiceError {
    fn from(err: FetchError) -> Self {
        match err.class() {
            FetchClass::NotFound => {
                ServiceError::NotFound("account or recent match not found".into())
            }
            FetchClass::ModeExcluded => {
                ServiceError::NotFound("no recent competitive match".into())
            }
            FetchClass::RateLimited => ServiceError::RateLimited(err),
            FetchClass::Unavailable => ServiceError::ProviderUnavailable(err),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Upstream rate limit hit; the client should come back later.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::NotRegistered => {
                AppError::NotFound("user is not registered in this guild".into())
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::RateLimited(_) => {
                AppError::RateLimited("match provider rate limited, try again later".into())
            }
            ServiceError::ProviderUnavailable(source) => {
                AppError::ServiceUnavailable(source.to_string())
            }
            ServiceError::QueueClosed(_) => {
                AppError::ServiceUnavailable("signal ingestion unavailable".into())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
