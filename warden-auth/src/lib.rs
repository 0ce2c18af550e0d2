//! Warden Auth - the access decision core
//!
//! Four cooperating pieces gate every protected operation:
//! - [`SessionManager`] issues and invalidates bearer-token sessions
//! - [`RequestAuthenticator`] classifies a request as anonymous or authenticated
//! - [`PermissionEngine`] evaluates role x element x action x ownership rules
//! - [`AccessGate`] / [`AdminGate`] compose the above into a request contract
//!
//! All components are stateless across requests; durable state lives in the
//! SQLite stores under [`store`].

pub mod authenticator;
pub mod config;
pub mod gate;
pub mod models;
pub mod password;
pub mod permissions;
pub mod seed;
pub mod session;
pub mod store;

pub use authenticator::{AnonymousReason, AuthState, RequestAuthenticator};
pub use config::AccessConfig;
pub use gate::{AccessDenied, AccessGate, AccessGrant, AdminGate};
pub use models::{
    AccessRule, AccessRuleDetail, BusinessElement, Role, RuleFlags, Session, User, UserInfo,
};
pub use permissions::{Action, Decision, DecisionReason, PermissionEngine};
pub use session::SessionManager;
pub use store::{RuleStore, SessionStore, UserStore};
