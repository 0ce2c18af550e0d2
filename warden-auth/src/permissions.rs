//! Role x element x action x ownership decision engine
//!
//! Evaluation is fail-closed: any storage error during rule resolution
//! produces a deny, never a propagated error.

use crate::models::{RuleFlags, User};
use crate::store::RuleStore;
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use tracing::{debug, error};
use warden_core::WardenResult;

/// The four permission verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Map an HTTP method to its permission verb
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "GET" => Some(Action::Read),
            "POST" => Some(Action::Create),
            "PUT" | "PATCH" => Some(Action::Update),
            "DELETE" => Some(Action::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Why a decision came out the way it did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    /// The business element is not registered
    ElementNotFound,
    /// No rule connects the user's role to this element
    NoRule,
    /// A rule exists but does not grant this action
    NoPermission,
    /// The rule grants the action only for owned objects, and the object
    /// belongs to someone else
    NotOwner,
    /// Granted across all objects
    GrantedAll,
    /// Granted for owned objects; collection reads must be filtered
    GrantedOwn,
    /// Rule resolution failed; denied fail-closed
    EvaluationFailed,
}

impl DecisionReason {
    /// Human-readable detail for error responses
    pub fn detail(&self) -> &'static str {
        match self {
            DecisionReason::ElementNotFound => "Unknown business element",
            DecisionReason::NoRule => "No access rule for your role",
            DecisionReason::NoPermission => "Your role does not permit this action",
            DecisionReason::NotOwner => "You can only access your own objects",
            DecisionReason::GrantedAll => "Granted for all objects",
            DecisionReason::GrantedOwn => "Granted for owned objects",
            DecisionReason::EvaluationFailed => "Permission evaluation failed",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.detail())
    }
}

/// Outcome of a permission evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Set only on collection-scoped grants that are limited to owned
    /// objects; the caller must filter results to the requesting user
    pub requires_ownership_filter: bool,
    pub reason: DecisionReason,
}

impl Decision {
    fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            requires_ownership_filter: false,
            reason,
        }
    }

    fn allow(reason: DecisionReason, requires_ownership_filter: bool) -> Self {
        Self {
            allowed: true,
            requires_ownership_filter,
            reason,
        }
    }
}

/// Evaluates the rule matrix for a concrete user, element, and action
#[derive(Clone)]
pub struct PermissionEngine {
    rules: RuleStore,
}

impl PermissionEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            rules: RuleStore::new(pool),
        }
    }

    /// Evaluate whether `user` may perform `action` on `element_name`
    ///
    /// `owner_id` is `None` for collection-scoped calls (list, create) and
    /// `Some` with the object's owner for single-object calls. Storage
    /// errors are logged and converted to denials.
    pub async fn evaluate(
        &self,
        user: &User,
        element_name: &str,
        action: Action,
        owner_id: Option<i64>,
    ) -> Decision {
        match self.try_evaluate(user, element_name, action, owner_id).await {
            Ok(decision) => {
                debug!(
                    user_id = user.id,
                    element = element_name,
                    action = %action,
                    allowed = decision.allowed,
                    reason = %decision.reason,
                    "Permission decision"
                );
                decision
            }
            Err(e) => {
                error!(
                    user_id = user.id,
                    element = element_name,
                    action = %action,
                    "Permission evaluation failed, denying: {}",
                    e
                );
                Decision::deny(DecisionReason::EvaluationFailed)
            }
        }
    }

    async fn try_evaluate(
        &self,
        user: &User,
        element_name: &str,
        action: Action,
        owner_id: Option<i64>,
    ) -> WardenResult<Decision> {
        let Some(element) = self.rules.find_element_by_name(element_name).await? else {
            return Ok(Decision::deny(DecisionReason::ElementNotFound));
        };

        let Some(rule) = self.rules.find_rule_for(user.role_id, element.id).await? else {
            return Ok(Decision::deny(DecisionReason::NoRule));
        };

        Ok(apply_flags(&rule.flags, action, user.id, owner_id))
    }
}

/// The decision table proper
///
/// Create has a single flag. Read, update, and delete each carry a plain
/// flag (own objects) and an `_all` flag (every object). An `_all` grant
/// never requires filtering; a plain grant on a collection call requires
/// the caller to filter, and on a single-object call requires ownership.
fn apply_flags(flags: &RuleFlags, action: Action, user_id: i64, owner_id: Option<i64>) -> Decision {
    let (own, all) = match action {
        Action::Create => {
            return if flags.create {
                Decision::allow(DecisionReason::GrantedAll, false)
            } else {
                Decision::deny(DecisionReason::NoPermission)
            };
        }
        Action::Read => (flags.read, flags.read_all),
        Action::Update => (flags.update, flags.update_all),
        Action::Delete => (flags.delete, flags.delete_all),
    };

    if all {
        return Decision::allow(DecisionReason::GrantedAll, false);
    }
    if !own {
        return Decision::deny(DecisionReason::NoPermission);
    }

    match owner_id {
        None => Decision::allow(DecisionReason::GrantedOwn, true),
        Some(owner) if owner == user_id => Decision::allow(DecisionReason::GrantedOwn, false),
        Some(_) => Decision::deny(DecisionReason::NotOwner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleFlags;
    use crate::store::{self, NewUser, RuleStore, UserStore};

    fn flags(
        read: bool,
        read_all: bool,
        create: bool,
        update: bool,
        update_all: bool,
        delete: bool,
        delete_all: bool,
    ) -> RuleFlags {
        RuleFlags {
            read,
            read_all,
            create,
            update,
            update_all,
            delete,
            delete_all,
        }
    }

    #[test]
    fn create_uses_the_single_create_flag() {
        let granted = flags(false, false, true, false, false, false, false);
        let decision = apply_flags(&granted, Action::Create, 1, None);
        assert!(decision.allowed);
        assert!(!decision.requires_ownership_filter);

        let denied = apply_flags(
            &flags(true, true, false, true, true, true, true),
            Action::Create,
            1,
            None,
        );
        assert!(!denied.allowed);
        assert_eq!(denied.reason, DecisionReason::NoPermission);
    }

    #[test]
    fn all_flag_grants_without_filter_regardless_of_owner() {
        let f = flags(false, true, false, false, false, false, false);

        let collection = apply_flags(&f, Action::Read, 1, None);
        assert!(collection.allowed);
        assert!(!collection.requires_ownership_filter);

        let foreign = apply_flags(&f, Action::Read, 1, Some(99));
        assert!(foreign.allowed);
        assert_eq!(foreign.reason, DecisionReason::GrantedAll);
    }

    #[test]
    fn plain_flag_on_collection_requires_filter() {
        let f = flags(true, false, false, false, false, false, false);
        let decision = apply_flags(&f, Action::Read, 1, None);
        assert!(decision.allowed);
        assert!(decision.requires_ownership_filter);
        assert_eq!(decision.reason, DecisionReason::GrantedOwn);
    }

    #[test]
    fn plain_flag_on_single_object_checks_ownership() {
        let f = flags(false, false, false, true, false, false, false);

        let own = apply_flags(&f, Action::Update, 3, Some(3));
        assert!(own.allowed);
        assert!(!own.requires_ownership_filter);

        let foreign = apply_flags(&f, Action::Update, 3, Some(4));
        assert!(!foreign.allowed);
        assert_eq!(foreign.reason, DecisionReason::NotOwner);
    }

    #[test]
    fn no_flag_at_all_denies() {
        let f = flags(false, false, false, false, false, false, false);
        let decision = apply_flags(&f, Action::Delete, 1, Some(1));
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::NoPermission);
    }

    #[test]
    fn method_mapping() {
        assert_eq!(Action::from_method("GET"), Some(Action::Read));
        assert_eq!(Action::from_method("POST"), Some(Action::Create));
        assert_eq!(Action::from_method("PUT"), Some(Action::Update));
        assert_eq!(Action::from_method("PATCH"), Some(Action::Update));
        assert_eq!(Action::from_method("DELETE"), Some(Action::Delete));
        assert_eq!(Action::from_method("OPTIONS"), None);
    }

    async fn engine_fixture() -> (PermissionEngine, User) {
        let pool = store::connect_memory().await.unwrap();
        let rules = RuleStore::new(pool.clone());

        let role = rules.create_role("user", None).await.unwrap();
        let orders = rules
            .create_element("orders", Some("Customer orders"), Some("/api/orders"))
            .await
            .unwrap();
        rules
            .create_element("stores", Some("Store fronts"), Some("/api/stores"))
            .await
            .unwrap();
        rules
            .create_rule(
                role.id,
                orders.id,
                flags(true, false, true, true, false, true, false),
            )
            .await
            .unwrap();

        let users = UserStore::new(pool.clone());
        let user = users
            .create(NewUser {
                email: "carol@example.com".to_string(),
                first_name: "Carol".to_string(),
                last_name: "Example".to_string(),
                middle_name: None,
                password_hash: "unused".to_string(),
                role_id: role.id,
            })
            .await
            .unwrap();

        (PermissionEngine::new(pool), user)
    }

    #[tokio::test]
    async fn unknown_element_denies() {
        let (engine, user) = engine_fixture().await;
        let decision = engine.evaluate(&user, "invoices", Action::Read, None).await;
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::ElementNotFound);
    }

    #[tokio::test]
    async fn missing_rule_denies() {
        let (engine, user) = engine_fixture().await;
        let decision = engine.evaluate(&user, "stores", Action::Read, None).await;
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::NoRule);
    }

    #[tokio::test]
    async fn owned_object_lifecycle_through_the_store() {
        let (engine, user) = engine_fixture().await;

        // Collection read is granted but must be filtered
        let list = engine.evaluate(&user, "orders", Action::Read, None).await;
        assert!(list.allowed && list.requires_ownership_filter);

        // Own object passes, foreign object is denied
        let own = engine
            .evaluate(&user, "orders", Action::Update, Some(user.id))
            .await;
        assert!(own.allowed);

        let foreign = engine
            .evaluate(&user, "orders", Action::Update, Some(user.id + 1))
            .await;
        assert!(!foreign.allowed);
        assert_eq!(foreign.reason, DecisionReason::NotOwner);
    }
}
