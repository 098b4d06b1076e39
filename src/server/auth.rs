//! Bearer JWT authentication for the chat history routes
//!
//! Tokens are HS256-signed and carry the owning user in a `userId` claim.
//! Expiry is enforced when the token has an `exp` claim, but not required.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::AuthConfig;

/// Claims read from a chat token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Owner of the chat history
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Expiry, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Caller identity injected into request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// User id from the token
    pub id: String,
}

/// Verifies chat tokens
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
    enabled: bool,
}

impl JwtVerifier {
    /// Build a verifier from a shared secret
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            enabled: !secret.is_empty(),
        }
    }

    /// Build a verifier from `auth` config, resolving `env:` secrets
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = config.resolve_jwt_secret();
        if secret.is_empty() {
            warn!("No JWT secret configured; every chat history request will be rejected");
        }
        Self::new(&secret)
    }

    /// Decode and check a token
    pub fn verify(&self, token: &str) -> Option<AuthenticatedUser> {
        if !self.enabled {
            return None;
        }
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) if !data.claims.user_id.is_empty() => Some(AuthenticatedUser {
                id: data.claims.user_id,
            }),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Token rejected");
                None
            }
        }
    }
}

/// Authentication middleware for the `/chats` routes
pub async fn auth_middleware(
    State(verifier): State<Arc<JwtVerifier>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
        .filter(|v| !v.is_empty());

    let Some(token) = token else {
        warn!(path = %path, "Missing Authorization header");
        return unauthorized_response("No token provided");
    };

    if let Some(user) = verifier.verify(token) {
        debug!(user = %user.id, path = %path, "Authenticated request");
        request.extensions_mut().insert(user);
        next.run(request).await
    } else {
        warn!(path = %path, "Invalid token");
        unauthorized_response("Invalid token")
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(json!({ "error": message })),
    )
        .into_response()
}
