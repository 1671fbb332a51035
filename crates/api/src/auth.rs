//! HTTP Basic authentication.
//!
//! [`require_auth`] resolves the caller through the injected
//! [`CredentialStore`](domain::CredentialStore) and stores a [`Caller`] in
//! the request extensions for handlers to pick up.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::Role;

use crate::error::ApiError;
use crate::state::{AppState, Backend};

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub username: String,
    pub role: Role,
}

impl Caller {
    /// Fails with 403 unless the caller has `role`.
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("{role} role required")))
        }
    }
}

/// Splits a `Basic` authorization header into username and password.
pub fn parse_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Middleware rejecting requests without valid credentials.
pub async fn require_auth<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("authorization required".to_string()))?;
    let (username, password) = value
        .to_str()
        .ok()
        .and_then(parse_basic)
        .ok_or_else(|| ApiError::Unauthorized("invalid authorization header".to_string()))?;

    let credential = state
        .credentials
        .authenticate(&username, &password)
        .await
        .ok_or_else(|| {
            tracing::info!(%username, "rejected credentials");
            metrics::counter!("auth_failures_total").increment(1);
            ApiError::Unauthorized("invalid credentials".to_string())
        })?;

    request.extensions_mut().insert(Caller {
        username: credential.username,
        role: credential.role,
    });
    Ok(next.run(request).await)
}
