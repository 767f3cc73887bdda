//! Architecture CRUD routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::ApiError;
use crate::models::{
    Architecture, CreateArchitectureRequest, Resource, UpdateArchitectureRequest,
};

pub fn architectures_router() -> Router<AppState> {
    Router::new()
        .route(
            "/architectures",
            get(list_architectures).post(create_architecture),
        )
        .route(
            "/architectures/{id}",
            get(get_architecture)
                .put(update_architecture)
                .delete(delete_architecture),
        )
        .route("/architectures/{id}/layout", post(apply_layout))
        .route("/architectures/{id}/resources", get(list_resources))
}

/// GET /architectures - Architectures owned by the caller
#[utoipa::path(
    get,
    path = "/architectures",
    tag = "Architectures",
    responses(
        (status = 200, description = "Architectures owned by the caller", body = Vec<Architecture>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_architectures(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Architecture>>, ApiError> {
    let architectures = state.architectures.list(&auth.user_context).await?;
    Ok(Json(architectures))
}

/// POST /architectures - Create an architecture in draft status
#[utoipa::path(
    post,
    path = "/architectures",
    tag = "Architectures",
    request_body = CreateArchitectureRequest,
    responses(
        (status = 201, description = "Architecture created", body = Architecture),
        (status = 401, description = "Missing or invalid token"),
        (status = 422, description = "Invalid containment")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_architecture(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateArchitectureRequest>,
) -> Result<(StatusCode, Json<Architecture>), ApiError> {
    let architecture = state
        .architectures
        .create(&auth.user_context, request)
        .await?;
    Ok((StatusCode::CREATED, Json(architecture)))
}

/// GET /architectures/{id}
#[utoipa::path(
    get,
    path = "/architectures/{id}",
    tag = "Architectures",
    params(("id" = Uuid, Path, description = "Architecture id")),
    responses(
        (status = 200, description = "Architecture", body = Architecture),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "Architecture not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_architecture(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Architecture>, ApiError> {
    let architecture = state.architectures.get(&auth.user_context, id).await?;
    Ok(Json(architecture))
}

/// PUT /architectures/{id} - Replace the diagram
#[utoipa::path(
    put,
    path = "/architectures/{id}",
    tag = "Architectures",
    params(("id" = Uuid, Path, description = "Architecture id")),
    request_body = UpdateArchitectureRequest,
    responses(
        (status = 200, description = "Updated architecture with a new version", body = Architecture),
        (status = 404, description = "Architecture not found"),
        (status = 409, description = "Stale expectedVersion"),
        (status = 422, description = "Invalid containment")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_architecture(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateArchitectureRequest>,
) -> Result<Json<Architecture>, ApiError> {
    let architecture = state
        .architectures
        .update_diagram(&auth.user_context, id, request)
        .await?;
    Ok(Json(architecture))
}

/// DELETE /architectures/{id}
#[utoipa::path(
    delete,
    path = "/architectures/{id}",
    tag = "Architectures",
    params(("id" = Uuid, Path, description = "Architecture id")),
    responses(
        (status = 204, description = "Architecture deleted"),
        (status = 404, description = "Architecture not found"),
        (status = 409, description = "A stack is still deployed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_architecture(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.architectures.delete(&auth.user_context, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /architectures/{id}/layout - Lay out the stored diagram in place
#[utoipa::path(
    post,
    path = "/architectures/{id}/layout",
    tag = "Architectures",
    params(("id" = Uuid, Path, description = "Architecture id")),
    responses(
        (status = 200, description = "Architecture with the laid-out diagram", body = Architecture),
        (status = 404, description = "Architecture not found"),
        (status = 422, description = "Invalid containment")
    ),
    security(("bearer_auth" = []))
)]
pub async fn apply_layout(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Architecture>, ApiError> {
    let architecture = state
        .architectures
        .apply_layout(&auth.user_context, id)
        .await?;
    Ok(Json(architecture))
}

/// GET /architectures/{id}/resources - Reconciled provider resources
#[utoipa::path(
    get,
    path = "/architectures/{id}/resources",
    tag = "Architectures",
    params(("id" = Uuid, Path, description = "Architecture id")),
    responses(
        (status = 200, description = "Resources of the deployed stack", body = Vec<Resource>),
        (status = 404, description = "Architecture not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_resources(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Resource>>, ApiError> {
    let resources = state
        .architectures
        .list_resources(&auth.user_context, id)
        .await?;
    Ok(Json(resources))
}
