//! Request gates composing authentication and permission evaluation
//!
//! [`AccessGate`] runs the full matrix evaluation for a business element.
//! [`AdminGate`] is the coarse role-name check guarding management endpoints
//! and bypasses the matrix entirely.

use crate::authenticator::{AnonymousReason, AuthState};
use crate::models::User;
use crate::permissions::{Action, PermissionEngine};
use sqlx::SqlitePool;

/// Why a gate refused a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    /// No credentials were presented
    AuthenticationRequired,
    /// Credentials were presented but did not resolve to a user
    TokenInvalidOrExpired,
    /// The account behind the credentials is deactivated
    AccountDeactivated,
    /// The HTTP method maps to no permission verb
    MethodNotAllowed,
    /// Authenticated but not permitted
    Forbidden { detail: String },
}

/// A positive gate outcome carried through to the handler
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub user: User,
    /// Collection handlers must restrict results to the user's own objects
    pub requires_ownership_filter: bool,
}

/// Per-element gate: authentication, then matrix evaluation
#[derive(Clone)]
pub struct AccessGate {
    engine: PermissionEngine,
}

impl AccessGate {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            engine: PermissionEngine::new(pool),
        }
    }

    pub fn engine(&self) -> &PermissionEngine {
        &self.engine
    }

    /// Authorize a request against a business element
    ///
    /// Runs collection-scoped (no owner id); handlers operating on a single
    /// object must re-evaluate with the object's owner after fetching it.
    pub async fn authorize(
        &self,
        auth_state: &AuthState,
        element: &str,
        method: &str,
    ) -> Result<AccessGrant, AccessDenied> {
        let user = match auth_state {
            AuthState::Anonymous(AnonymousReason::NoToken) => {
                return Err(AccessDenied::AuthenticationRequired);
            }
            AuthState::Anonymous(AnonymousReason::InvalidOrExpired) => {
                return Err(AccessDenied::TokenInvalidOrExpired);
            }
            AuthState::Authenticated(user) => user,
        };

        if !user.is_active {
            return Err(AccessDenied::AccountDeactivated);
        }

        let Some(action) = Action::from_method(method) else {
            return Err(AccessDenied::MethodNotAllowed);
        };

        let decision = self.engine.evaluate(user, element, action, None).await;
        if !decision.allowed {
            return Err(AccessDenied::Forbidden {
                detail: decision.reason.detail().to_string(),
            });
        }

        Ok(AccessGrant {
            user: user.clone(),
            requires_ownership_filter: decision.requires_ownership_filter,
        })
    }
}

/// Coarse gate for management endpoints: role name match, no matrix lookup
#[derive(Debug, Clone)]
pub struct AdminGate {
    admin_role: String,
}

impl AdminGate {
    pub fn new(admin_role: impl Into<String>) -> Self {
        Self {
            admin_role: admin_role.into(),
        }
    }

    pub fn authorize(&self, auth_state: &AuthState) -> Result<User, AccessDenied> {
        let user = match auth_state {
            AuthState::Anonymous(AnonymousReason::NoToken) => {
                return Err(AccessDenied::AuthenticationRequired);
            }
            AuthState::Anonymous(AnonymousReason::InvalidOrExpired) => {
                return Err(AccessDenied::TokenInvalidOrExpired);
            }
            AuthState::Authenticated(user) => user,
        };

        if !user.is_active {
            return Err(AccessDenied::AccountDeactivated);
        }

        if user.role_name != self.admin_role {
            return Err(AccessDenied::Forbidden {
                detail: "Admin role required".to_string(),
            });
        }

        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleFlags;
    use crate::store::{self, NewUser, RuleStore, UserStore};

    async fn gate_fixture() -> (AccessGate, AdminGate, User, User) {
        let pool = store::connect_memory().await.unwrap();
        let rules = RuleStore::new(pool.clone());

        let admin_role = rules.create_role("admin", None).await.unwrap();
        let user_role = rules.create_role("user", None).await.unwrap();
        let products = rules
            .create_element("products", None, Some("/api/products"))
            .await
            .unwrap();
        rules
            .create_rule(
                user_role.id,
                products.id,
                RuleFlags {
                    read: false,
                    read_all: true,
                    create: false,
                    update: false,
                    update_all: false,
                    delete: false,
                    delete_all: false,
                },
            )
            .await
            .unwrap();

        let users = UserStore::new(pool.clone());
        let admin = users
            .create(NewUser {
                email: "admin@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Admin".to_string(),
                middle_name: None,
                password_hash: "unused".to_string(),
                role_id: admin_role.id,
            })
            .await
            .unwrap();
        let regular = users
            .create(NewUser {
                email: "dave@example.com".to_string(),
                first_name: "Dave".to_string(),
                last_name: "Example".to_string(),
                middle_name: None,
                password_hash: "unused".to_string(),
                role_id: user_role.id,
            })
            .await
            .unwrap();

        (
            AccessGate::new(pool),
            AdminGate::new("admin"),
            admin,
            regular,
        )
    }

    #[tokio::test]
    async fn anonymous_requests_are_split_by_reason() {
        let (gate, _, _, _) = gate_fixture().await;

        let no_token = gate
            .authorize(
                &AuthState::Anonymous(AnonymousReason::NoToken),
                "products",
                "GET",
            )
            .await;
        assert_eq!(no_token.unwrap_err(), AccessDenied::AuthenticationRequired);

        let bad_token = gate
            .authorize(
                &AuthState::Anonymous(AnonymousReason::InvalidOrExpired),
                "products",
                "GET",
            )
            .await;
        assert_eq!(bad_token.unwrap_err(), AccessDenied::TokenInvalidOrExpired);
    }

    #[tokio::test]
    async fn granted_read_all_carries_no_filter() {
        let (gate, _, _, regular) = gate_fixture().await;

        let grant = gate
            .authorize(&AuthState::Authenticated(regular.clone()), "products", "GET")
            .await
            .unwrap();
        assert_eq!(grant.user.id, regular.id);
        assert!(!grant.requires_ownership_filter);
    }

    #[tokio::test]
    async fn denied_action_maps_to_forbidden_with_detail() {
        let (gate, _, _, regular) = gate_fixture().await;

        let err = gate
            .authorize(&AuthState::Authenticated(regular), "products", "POST")
            .await
            .unwrap_err();
        assert!(matches!(err, AccessDenied::Forbidden { .. }));
    }

    #[tokio::test]
    async fn unmapped_method_is_rejected_before_evaluation() {
        let (gate, _, admin, _) = gate_fixture().await;

        let err = gate
            .authorize(&AuthState::Authenticated(admin), "products", "TRACE")
            .await
            .unwrap_err();
        assert_eq!(err, AccessDenied::MethodNotAllowed);
    }

    #[tokio::test]
    async fn admin_gate_matches_role_name_only() {
        let (_, admin_gate, admin, regular) = gate_fixture().await;

        assert!(admin_gate
            .authorize(&AuthState::Authenticated(admin))
            .is_ok());

        let err = admin_gate
            .authorize(&AuthState::Authenticated(regular))
            .unwrap_err();
        assert!(matches!(err, AccessDenied::Forbidden { .. }));
    }

    #[tokio::test]
    async fn deactivated_account_is_refused_even_with_state() {
        let (gate, _, _, mut regular) = gate_fixture().await;
        regular.is_active = false;

        let err = gate
            .authorize(&AuthState::Authenticated(regular), "products", "GET")
            .await
            .unwrap_err();
        assert_eq!(err, AccessDenied::AccountDeactivated);
    }
}
