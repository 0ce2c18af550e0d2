//! Account lifecycle: register, login, profile, logout, deletion

use super::{require_user, ApiError};
use crate::AppState;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use warden_auth::{password, store::NewUser, store::ProfileUpdate, AuthState, UserInfo};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
}

fn validate_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') || !email.contains('.') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(ApiError::bad_request("First and last name are required"));
    }
    if request.password.len() < 6 {
        return Err(ApiError::bad_request(
            "Password must be at least 6 characters",
        ));
    }
    if request.password != request.password_confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    Ok(())
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserInfo>), ApiError> {
    validate_registration(&request)?;

    let email = request.email.trim().to_lowercase();
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("Email is already registered"));
    }

    let role = state
        .rules
        .find_role_by_name(&state.access.default_role)
        .await?
        .ok_or_else(ApiError::internal)?;

    let user = state
        .users
        .create(NewUser {
            email: email.clone(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            middle_name: request.middle_name,
            password_hash: password::hash_password(&request.password)?,
            role_id: role.id,
        })
        .await?;

    info!(user_id = user.id, "User registered: {}", email);
    Ok((StatusCode::CREATED, Json(user.to_user_info())))
}

/// POST /api/auth/login
///
/// Invalid credentials and deactivated accounts are indistinguishable in
/// the response.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = request.email.trim().to_lowercase();
    let invalid = || ApiError::bad_request("Invalid email or password");

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !user.is_active || !user.verify_password(&request.password) {
        return Err(invalid());
    }

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let user_agent = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let session = state.sessions.create(&user, ip_address, user_agent).await?;

    info!(user_id = user.id, "User logged in: {}", email);
    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: user.to_user_info(),
    }))
}

/// GET /api/auth/me
pub async fn me(Extension(auth_state): Extension<AuthState>) -> Result<Json<UserInfo>, ApiError> {
    let user = require_user(&auth_state)?;
    Ok(Json(user.to_user_info()))
}

/// PUT|PATCH /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_state): Extension<AuthState>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<UserInfo>, ApiError> {
    let user = require_user(&auth_state)?;

    let updated = state
        .users
        .update_profile(
            user.id,
            ProfileUpdate {
                first_name: request.first_name,
                last_name: request.last_name,
                middle_name: request.middle_name,
            },
        )
        .await?;

    Ok(Json(updated.to_user_info()))
}

/// POST /api/auth/logout
///
/// Revokes exactly the presented token; other sessions stay valid.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth_state): Extension<AuthState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&auth_state)?;

    // Same extraction as authentication, so the revoked token is exactly
    // the one that authenticated this request
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(warden_auth::authenticator::extract_bearer)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    state.sessions.revoke(token).await?;
    info!(user_id = user.id, "User logged out");
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

/// DELETE /api/auth/account
///
/// Soft delete: the account is deactivated and every session revoked.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth_state): Extension<AuthState>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&auth_state)?;

    state.users.deactivate(user.id).await?;
    info!(user_id = user.id, "Account deactivated");
    Ok(Json(json!({ "message": "Account deactivated" })))
}
