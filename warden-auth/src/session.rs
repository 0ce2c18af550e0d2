//! Session lifecycle: issue, validate, expire, revoke
//!
//! Tokens are HS256 JWTs carrying self-describing claims. The signature and
//! embedded expiry are the primary validity check; the session table serves
//! as a revocation list (logout and deactivation delete rows). Expired
//! sessions are garbage-collected the first time a lookup encounters them,
//! so no background sweeper is needed.

use crate::models::{Session, User};
use crate::store::{SessionStore, UserStore};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::LazyLock;
use tracing::{debug, warn};
use uuid::Uuid;
use warden_core::{ErrorContext, WardenError, WardenResult};

/// Signing keys - initialized from environment variable
static KEYS: LazyLock<Keys> = LazyLock::new(|| {
    let secret = std::env::var("WARDEN_TOKEN_SECRET")
        .unwrap_or_else(|_| "warden-default-secret-change-in-production".to_string());
    Keys::new(secret.as_bytes())
});

/// Token signing and verification keys
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Self-describing token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Session id; makes every token unique even when two sessions for the
    /// same user are minted within the same second
    pub jti: String,
    /// Owning user id
    pub sub: i64,
    /// User email at issue time
    pub email: String,
    /// Role id at issue time
    pub role_id: i64,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiration time (unix timestamp)
    pub exp: i64,
}

/// Zero-leeway validation so expiry is exact
fn validation() -> Validation {
    let mut validation = Validation::default();
    validation.leeway = 0;
    validation
}

/// Issues and invalidates sessions bound to a user with a fixed TTL
#[derive(Clone)]
pub struct SessionManager {
    sessions: SessionStore,
    users: UserStore,
    ttl: Duration,
}

impl SessionManager {
    /// Create a manager with the given TTL in hours
    pub fn new(pool: SqlitePool, ttl_hours: i64) -> Self {
        Self::with_ttl(pool, Duration::hours(ttl_hours))
    }

    /// Create a manager with an arbitrary TTL (negative TTLs mint
    /// already-expired sessions, which the tests rely on)
    pub fn with_ttl(pool: SqlitePool, ttl: Duration) -> Self {
        Self {
            sessions: SessionStore::new(pool.clone()),
            users: UserStore::new(pool),
            ttl,
        }
    }

    /// Issue a new session for a user, persisting it and returning the
    /// token together with its expiry
    pub async fn create(
        &self,
        user: &User,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> WardenResult<Session> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let session_id = Uuid::new_v4().to_string();

        let claims = Claims {
            jti: session_id.clone(),
            sub: user.id,
            email: user.email.clone(),
            role_id: user.role_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token =
            encode(&Header::default(), &claims, &KEYS.encoding).map_err(|e| {
                WardenError::Authentication {
                    message: format!("Failed to encode session token: {}", e),
                    context: ErrorContext::new("session"),
                }
            })?;

        let session = Session {
            id: session_id,
            user_id: user.id,
            token,
            expires_at,
            created_at: now,
            ip_address,
            user_agent,
        };

        self.sessions.insert(&session).await?;
        debug!(user_id = user.id, "Issued session expiring at {}", expires_at);
        Ok(session)
    }

    /// Resolve a token to its owning user, or `None` if the token is
    /// invalid, expired, revoked, or owned by an inactive account
    ///
    /// Expired sessions are deleted on sight; a second lookup with the same
    /// token also reports absent.
    pub async fn lookup(&self, token: &str) -> WardenResult<Option<User>> {
        let claims = match decode::<Claims>(token, &KEYS.decoding, &validation()) {
            Ok(data) => data.claims,
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                // GC-on-read: the row is dead weight once the token expired
                self.sessions.delete_by_token(token).await?;
                return Ok(None);
            }
            Err(e) => {
                debug!("Token verification failed: {}", e);
                return Ok(None);
            }
        };

        // Revocation check: a verified token without a row was logged out
        // or swept by deactivation
        let Some(session) = self.sessions.find_by_token(token).await? else {
            return Ok(None);
        };

        if session.user_id != claims.sub {
            warn!(
                session_user = session.user_id,
                claim_sub = claims.sub,
                "Session row and token claims disagree"
            );
            return Ok(None);
        }

        // The row carries its own expiry; treat a stale row like an expired
        // token even if the clock and claims disagree
        if session.is_expired(Utc::now()) {
            self.sessions.delete_by_token(token).await?;
            return Ok(None);
        }

        let Some(user) = self.users.find_by_id(session.user_id).await? else {
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Delete the session matching a token; revoking an absent token is a
    /// no-op
    pub async fn revoke(&self, token: &str) -> WardenResult<()> {
        self.sessions.delete_by_token(token).await
    }

    /// Direct store access, for diagnostics and tests
    pub fn store(&self) -> &SessionStore {
        &self.sessions
    }
}
