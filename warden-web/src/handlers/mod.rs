//! Request handlers for the Warden API

pub mod admin;
pub mod auth;
pub mod health;
pub mod resources;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use warden_auth::{AnonymousReason, AuthState, User};
use warden_core::WardenError;

/// Handler-level error with the uniform `{"error", "detail"}` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Validation failed",
            detail: detail.into(),
        }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "Unauthorized",
            detail: detail.into(),
        }
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            error: "Forbidden",
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: "Not found",
            detail: detail.into(),
        }
    }

    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Internal server error",
            detail: "Something went wrong".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.error, "detail": self.detail })),
        )
            .into_response()
    }
}

impl From<WardenError> for ApiError {
    fn from(err: WardenError) -> Self {
        match err {
            WardenError::Validation { message, .. } => ApiError::bad_request(message),
            WardenError::NotFound { resource, .. } => {
                ApiError::not_found(format!("{} not found", resource))
            }
            other => {
                other.log();
                ApiError::internal()
            }
        }
    }
}

/// The authenticated user behind a request, or the mapped 401
pub fn require_user(auth_state: &AuthState) -> Result<&User, ApiError> {
    match auth_state {
        AuthState::Authenticated(user) => Ok(user),
        AuthState::Anonymous(AnonymousReason::NoToken) => {
            Err(ApiError::unauthorized("Authentication required"))
        }
        AuthState::Anonymous(AnonymousReason::InvalidOrExpired) => {
            Err(ApiError::unauthorized("Token is invalid or expired"))
        }
    }
}
