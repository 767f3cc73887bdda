//! JWT Service for access token validation.
//!
//! Tokens are issued by an external identity service; this service only
//! checks signature and expiry and turns the claims into a [`UserContext`].
//! Issuing is kept for development tooling and tests.

use crate::storage::UserContext;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id (UUID) or email
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// Principal behind the token.
    ///
    /// A non-UUID subject maps to a deterministic v5 UUID so the same
    /// subject always owns the same architectures.
    pub fn user_context(&self) -> UserContext {
        let user_id = Uuid::parse_str(&self.sub)
            .unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_DNS, self.sub.as_bytes()));
        UserContext {
            user_id,
            email: self.email.clone().unwrap_or_else(|| self.sub.clone()),
        }
    }
}

/// JWT Service configuration
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_duration: Duration,
}

impl JwtService {
    /// Create a new JWT service with the given secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_duration: Duration::minutes(15),
        }
    }

    /// Issue an access token for a principal
    pub fn issue_access_token(&self, subject: &str, email: Option<&str>) -> Result<String, String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.map(str::to_string),
            exp: (now + self.access_token_duration).timestamp(),
            iat: now.timestamp(),
        };

        debug!("Issuing access token for {}", subject);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| format!("Failed to encode access token: {}", e))
    }

    /// Validate an access token and return the claims
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, String> {
        let token_data = self.decode_token(token)?;
        if token_data.claims.sub.trim().is_empty() {
            return Err("Token has an empty subject".to_string());
        }
        Ok(token_data.claims)
    }

    /// Decode and validate a token (checks signature and expiration)
    fn decode_token(&self, token: &str) -> Result<TokenData<Claims>, String> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token has expired".to_string(),
            jsonwebtoken::errors::ErrorKind::InvalidToken => "Invalid token format".to_string(),
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                "Invalid token signature".to_string()
            }
            _ => format!("Token validation failed: {}", e),
        })
    }

    /// Extract bearer token from Authorization header
    pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
        auth_header.strip_prefix("Bearer ")
    }
}

/// Shared JWT service for use across the application
pub type SharedJwtService = Arc<JwtService>;
