//! API error handling utilities.

use crate::services::OrchestratorError;
use crate::storage::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

/// API error response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.message,
            "status": self.status.as_u16(),
        });

        (self.status, axum::Json(body)).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        let status = match &e {
            OrchestratorError::NotFound(_) | OrchestratorError::DeploymentNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            OrchestratorError::Forbidden(_) => StatusCode::FORBIDDEN,
            OrchestratorError::EmptyTopology | OrchestratorError::InvalidTopology(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            OrchestratorError::NothingDeployed | OrchestratorError::StillDeployed => {
                StatusCode::CONFLICT
            }
            OrchestratorError::Storage(storage) => match storage {
                StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
                StorageError::VersionConflict { .. }
                | StorageError::InvalidTransition(_)
                | StorageError::Finalized { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };

        if status.is_server_error() {
            error!(error = %e, "Request failed");
            // Storage internals are not echoed back to clients
            if matches!(e, OrchestratorError::Storage(_)) {
                return Self::new(status, "Internal server error");
            }
        }
        Self::new(status, e.to_string())
    }
}
