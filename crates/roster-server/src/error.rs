//! Error taxonomy shared by the upstream client, the service and the HTTP
//! layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Everything that can go wrong while serving an employee request.
///
/// Must be `Clone`: one failed upstream call is handed to every request
/// coalesced onto it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    /// A malformed request, or a 4xx from upstream other than 404 and 429.
    #[error("{0}")]
    BadRequest(String),

    /// Field name to message, for every field that failed validation.
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    /// Upstream answered 429. Retried.
    #[error("{0}")]
    RateLimited(String),

    /// Upstream answered 503. Retried.
    #[error("{0}")]
    Unavailable(String),

    /// Unexpected upstream 5xx, transport failure, or a success response
    /// without the expected data.
    #[error("{0}")]
    Internal(String),

    /// Upstream did not confirm a deletion. Carries the upstream status, even
    /// when that status is 200.
    #[error("Failed to delete employee with id {id}")]
    DeleteFailed { id: String, status: StatusCode },
}

impl ApiError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DeleteFailed { status, .. } => *status,
        }
    }

    /// Whether retrying the same upstream call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::RateLimited(_) | ApiError::Unavailable(_))
    }
}

/// Body of every non-validation error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub status_code: u16,
}

/// Body of a validation error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorBody {
    pub message: String,
    pub status: u16,
    pub errors: BTreeMap<String, String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        match self {
            ApiError::Validation(errors) => {
                let body = ValidationErrorBody {
                    message: "Validation failed".to_string(),
                    status: status.as_u16(),
                    errors,
                };
                (status, Json(body)).into_response()
            }
            other => {
                let body = ErrorBody {
                    message: other.to_string(),
                    status_code: status.as_u16(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
