//! `/auth/*` handlers.

use super::AppState;
use crate::auth::{AuthSession, Identity, LoginRequest, RegisterRequest};
use crate::error::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;

/// POST /auth/register: create an account and start a session.
pub async fn handle_register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthSession>)> {
    let Json(body) = body?;
    let session = state.auth.register(body).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /auth/login: exchange credentials for a session token.
pub async fn handle_login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthSession>> {
    let Json(body) = body?;
    let session = state.auth.login(body).await?;
    Ok(Json(session))
}

/// GET /auth/me: the identity the middleware attached.
pub async fn handle_me(identity: Identity) -> Json<Identity> {
    Json(identity)
}
