//! Request-level error taxonomy and its HTTP mapping.
//!
//! Every handler and middleware returns [`AppError`]; the status code and JSON
//! body are decided here so route code never builds error responses by hand.

use crate::auth::password::HashingError;
use crate::auth::token::TokenError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Internal failure text, carried on the response so the gateway can decide
/// whether to surface it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("User already exists")]
    DuplicateEmail,

    /// Same shape for unknown email and wrong password.
    #[error("Invalid email or password!")]
    InvalidCredentials,

    #[error("No auth token found. Please log in.")]
    MissingToken,

    #[error("Invalid or expired token. Please log in again.")]
    TokenInvalid,

    #[error("Invalid or expired token. Please log in again.")]
    TokenExpired,

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure on one field; the field message doubles as the summary.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Validation {
            errors: vec![FieldError::new(field, message.clone())],
            message,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::DuplicateEmail => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials
            | Self::MissingToken
            | Self::TokenInvalid
            | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Internal(anyhow::Error::new(err).context("storage failure"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(anyhow::Error::new(err).context("stored document is not valid JSON"))
    }
}

impl From<HashingError> for AppError {
    fn from(err: HashingError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid(_) => Self::TokenInvalid,
            TokenError::Signing(_) => Self::Internal(anyhow::Error::new(err)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_field("body", format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation { message, errors } => {
                serde_json::json!({ "message": message, "errors": errors })
            }
            other => serde_json::json!({ "message": other.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if let Self::Internal(err) = &self {
            let detail = format!("{err:#}");
            tracing::error!("Request failed: {detail}");
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}
