//! API routes module - organizes all route handlers.
//!
//! Everything except health and the OpenAPI document requires a bearer token.

pub mod app_state;
pub mod architectures;
pub mod auth_context;
pub mod deployments;
pub mod error;
pub mod layout;
pub mod openapi;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

pub use app_state::AppState;
pub use error::ApiError;

/// Create the main API router combining all route modules
pub fn create_api_router(_app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .merge(layout::layout_router())
        .merge(architectures::architectures_router())
        .merge(deployments::deployments_router())
        // OpenAPI documentation endpoints
        .merge(openapi::openapi_router())
    // Note: State is applied by callers (main and TestServer)
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
