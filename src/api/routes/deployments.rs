//! Deploy, teardown and deployment status routes.
//!
//! Deploy and teardown answer `202 Accepted` with the deployment id; the
//! outcome is only visible through the status routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::ApiError;
use crate::models::{Deployment, DeploymentTicket};

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Number of most recent deployments to return
    pub limit: Option<usize>,
}

pub fn deployments_router() -> Router<AppState> {
    Router::new()
        .route("/architectures/{id}/deploy", post(deploy_architecture))
        .route("/architectures/{id}/teardown", post(tear_down_architecture))
        .route("/architectures/{id}/deployments", get(list_deployments))
        .route(
            "/architectures/{id}/deployments/{deployment_id}",
            get(get_deployment),
        )
}

/// POST /architectures/{id}/deploy - Queue a deployment of the current diagram
#[utoipa::path(
    post,
    path = "/architectures/{id}/deploy",
    tag = "Deployments",
    params(("id" = Uuid, Path, description = "Architecture id")),
    responses(
        (status = 202, description = "Deployment queued", body = DeploymentTicket),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "Architecture not found"),
        (status = 422, description = "Empty or invalid topology")
    ),
    security(("bearer_auth" = []))
)]
pub async fn deploy_architecture(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<DeploymentTicket>), ApiError> {
    let ticket = state.orchestrator.deploy(&auth.user_context, id).await?;
    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

/// POST /architectures/{id}/teardown - Queue deletion of the deployed stack
#[utoipa::path(
    post,
    path = "/architectures/{id}/teardown",
    tag = "Deployments",
    params(("id" = Uuid, Path, description = "Architecture id")),
    responses(
        (status = 202, description = "Teardown queued", body = DeploymentTicket),
        (status = 404, description = "Architecture not found"),
        (status = 409, description = "Nothing deployed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn tear_down_architecture(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<DeploymentTicket>), ApiError> {
    let ticket = state.orchestrator.tear_down(&auth.user_context, id).await?;
    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

/// GET /architectures/{id}/deployments - Most recent deployments first
#[utoipa::path(
    get,
    path = "/architectures/{id}/deployments",
    tag = "Deployments",
    params(("id" = Uuid, Path, description = "Architecture id"), HistoryQuery),
    responses(
        (status = 200, description = "Deployment history", body = Vec<Deployment>),
        (status = 404, description = "Architecture not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_deployments(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Deployment>>, ApiError> {
    let deployments = state
        .orchestrator
        .get_status(&auth.user_context, id, None, query.limit)
        .await?;
    Ok(Json(deployments))
}

/// GET /architectures/{id}/deployments/{deployment_id}
#[utoipa::path(
    get,
    path = "/architectures/{id}/deployments/{deployment_id}",
    tag = "Deployments",
    params(
        ("id" = Uuid, Path, description = "Architecture id"),
        ("deployment_id" = Uuid, Path, description = "Deployment id")
    ),
    responses(
        (status = 200, description = "Deployment", body = Deployment),
        (status = 404, description = "Architecture or deployment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_deployment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, deployment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Deployment>, ApiError> {
    let deployment = state
        .orchestrator
        .get_status(&auth.user_context, id, Some(deployment_id), None)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Deployment not found"))?;
    Ok(Json(deployment))
}
