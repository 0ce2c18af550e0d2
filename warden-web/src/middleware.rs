//! Tower middleware: authentication and permission gating
//!
//! `authenticate` runs on every API route and attaches an immutable
//! [`AuthState`] to the request. Gating middleware reads that state, runs
//! the relevant gate, and either attaches an [`AccessGrant`] or answers with
//! the mapped error response. Handlers never see ungated requests.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use warden_auth::{AccessDenied, AnonymousReason, AuthState};

/// Resolve the bearer token and attach the outcome to the request
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let auth_state = state.authenticator.resolve(&path, header.as_deref()).await;
    request.extensions_mut().insert(auth_state);
    next.run(request).await
}

/// State for per-element gating middleware
#[derive(Clone)]
pub struct ElementGuard {
    state: AppState,
    element: &'static str,
}

impl ElementGuard {
    pub fn new(state: AppState, element: &'static str) -> Self {
        Self { state, element }
    }
}

/// Run the access gate for the guarded element and attach the grant
pub async fn guard_element(
    State(guard): State<ElementGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_state = current_auth_state(&request);
    match guard
        .state
        .gate
        .authorize(&auth_state, guard.element, request.method().as_str())
        .await
    {
        Ok(grant) => {
            request.extensions_mut().insert(grant);
            next.run(request).await
        }
        Err(denied) => denied_response(denied),
    }
}

/// Run the coarse admin gate
pub async fn guard_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let auth_state = current_auth_state(&request);
    match state.admin_gate.authorize(&auth_state) {
        Ok(_) => next.run(request).await,
        Err(denied) => denied_response(denied),
    }
}

fn current_auth_state(request: &Request) -> AuthState {
    request
        .extensions()
        .get::<AuthState>()
        .cloned()
        .unwrap_or(AuthState::Anonymous(AnonymousReason::NoToken))
}

/// Map a gate refusal to its HTTP response
pub fn denied_response(denied: AccessDenied) -> Response {
    let (status, error, detail) = match denied {
        AccessDenied::AuthenticationRequired => (
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Authentication required".to_string(),
        ),
        AccessDenied::TokenInvalidOrExpired => (
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Token is invalid or expired".to_string(),
        ),
        AccessDenied::AccountDeactivated => (
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Account is deactivated".to_string(),
        ),
        AccessDenied::MethodNotAllowed => (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
            "No permission verb maps to this method".to_string(),
        ),
        AccessDenied::Forbidden { detail } => (StatusCode::FORBIDDEN, "Forbidden", detail),
    };

    (status, Json(json!({ "error": error, "detail": detail }))).into_response()
}
