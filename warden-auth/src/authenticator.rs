//! Request classification: anonymous or authenticated
//!
//! The authenticator never rejects a request. It resolves the bearer token
//! (when present) to a user and reports the outcome; gates downstream decide
//! what an anonymous request is allowed to do.

use crate::config::AccessConfig;
use crate::models::User;
use crate::session::SessionManager;
use tracing::{debug, error};

/// Why a request ended up anonymous
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousReason {
    /// No `Authorization: Bearer` header was presented
    NoToken,
    /// A token was presented but failed verification, expired, was revoked,
    /// or belongs to a deactivated account
    InvalidOrExpired,
}

/// The resolved identity of a request
#[derive(Debug, Clone)]
pub enum AuthState {
    Anonymous(AnonymousReason),
    Authenticated(User),
}

impl AuthState {
    /// The authenticated user, if any
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            AuthState::Anonymous(_) => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// Resolves the `Authorization` header of each request to an [`AuthState`]
#[derive(Clone)]
pub struct RequestAuthenticator {
    config: AccessConfig,
    sessions: SessionManager,
}

impl RequestAuthenticator {
    pub fn new(config: AccessConfig, sessions: SessionManager) -> Self {
        Self { config, sessions }
    }

    /// Classify a request from its path and `Authorization` header
    ///
    /// Public paths skip token resolution entirely. Lookup failures count as
    /// invalid tokens rather than surfacing as errors, so a broken store can
    /// never authenticate anyone.
    pub async fn resolve(&self, path: &str, auth_header: Option<&str>) -> AuthState {
        if self.config.is_public_path(path) {
            return AuthState::Anonymous(AnonymousReason::NoToken);
        }

        let Some(token) = auth_header.and_then(extract_bearer) else {
            return AuthState::Anonymous(AnonymousReason::NoToken);
        };

        match self.sessions.lookup(token).await {
            Ok(Some(user)) => {
                debug!(user_id = user.id, path = path, "Authenticated request");
                AuthState::Authenticated(user)
            }
            Ok(None) => AuthState::Anonymous(AnonymousReason::InvalidOrExpired),
            Err(e) => {
                error!("Session lookup failed, treating token as invalid: {}", e);
                AuthState::Anonymous(AnonymousReason::InvalidOrExpired)
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// Public so callers that act on the presented token (logout) strip and
/// trim it exactly the way authentication does.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
