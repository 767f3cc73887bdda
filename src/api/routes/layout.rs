//! Stateless layout route.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::ApiError;
use crate::models::{DiagramEdge, DiagramNode};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LayoutRequest {
    pub nodes: Vec<DiagramNode>,
    #[serde(default)]
    pub edges: Vec<DiagramEdge>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LayoutResponse {
    pub nodes: Vec<DiagramNode>,
}

pub fn layout_router() -> Router<AppState> {
    Router::new().route("/layout", post(compute_layout))
}

/// POST /layout - Lay out nodes without storing anything
#[utoipa::path(
    post,
    path = "/layout",
    tag = "Layout",
    request_body = LayoutRequest,
    responses(
        (status = 200, description = "Nodes with computed positions and sizes", body = LayoutResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 422, description = "Invalid containment")
    ),
    security(("bearer_auth" = []))
)]
pub async fn compute_layout(
    State(state): State<AppState>,
    _auth: AuthContext,
    Json(request): Json<LayoutRequest>,
) -> Result<Json<LayoutResponse>, ApiError> {
    let nodes = state
        .orchestrator
        .compute_layout(&request.nodes, &request.edges)?;
    Ok(Json(LayoutResponse { nodes }))
}
