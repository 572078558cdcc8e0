//! Bearer-token guard for protected routes.
//!
//! `NoToken -> 401`, `Invalid | Expired -> 401`, `Valid -> user lookup`,
//! `lookup miss -> 404`, `found -> Identity attached, handler runs`.

use super::service::{AuthService, Identity};
use crate::error::AppError;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// Extract the token from `Authorization: Bearer <token>`. Any other shape
/// counts as no token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects the request unless it carries a valid token for an existing user.
pub async fn require_auth(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers()).ok_or(AppError::MissingToken)?;
    let identity = auth.resolve(token)?;

    tracing::debug!(user_id = %identity.user_id, "Request authenticated");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AppError::MissingToken)
    }
}
