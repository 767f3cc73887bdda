//! Authentication context extractor.
//!
//! Every architecture route takes an [`AuthContext`], so a missing or invalid
//! bearer token is rejected before the handler runs.

use super::app_state::AppState;
use super::error::ApiError;
use crate::services::jwt_service::JwtService;
use crate::storage::UserContext;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

/// Authentication context extracted from request
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_context: UserContext,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(JwtService::extract_bearer_token)
            .ok_or_else(|| {
                tracing::warn!("No authorization token provided");
                ApiError::unauthorized("Missing bearer token")
            })?;

        let claims = state.jwt.validate_access_token(token).map_err(|e| {
            tracing::warn!("JWT validation failed: {}", e);
            ApiError::unauthorized("Invalid or expired token")
        })?;

        Ok(AuthContext {
            user_context: claims.user_context(),
        })
    }
}
