//! Domain models shared by the stores and the decision components

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity record with credential hash and role reference
///
/// The role reference is never null; deleting a role with users attached is
/// refused at the store/handler level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: i64,
    /// Role name, joined in by the store for gate checks
    pub role_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Verify a candidate password against the stored hash
    pub fn verify_password(&self, password: &str) -> bool {
        crate::password::verify_password(password, &self.password_hash).unwrap_or(false)
    }

    /// Convert to the public projection returned by the API
    pub fn to_user_info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            middle_name: self.middle_name.clone(),
            role: self.role_name.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// Public user information (no credential material)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Named permission profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Named resource category subject to access rules (e.g. "orders")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessElement {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Optional descriptive endpoint tag
    pub endpoint: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Seven independent permission flags for one (role, element) pair
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RuleFlags {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub read_all: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub update_all: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub delete_all: bool,
}

/// One permission record per (role, element) pair; uniqueness is enforced
/// by the store. No rule for a pair means no access of any kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRule {
    pub id: i64,
    pub role_id: i64,
    pub element_id: i64,
    #[serde(flatten)]
    pub flags: RuleFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Access rule joined with role and element names, for admin listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRuleDetail {
    pub id: i64,
    pub role_id: i64,
    pub role: String,
    pub element_id: i64,
    pub element: String,
    #[serde(flatten)]
    pub flags: RuleFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Server-side session record backing a bearer token
///
/// Valid iff `now < expires_at` and the owning user is active. Expired rows
/// are deleted the first time a lookup finds them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    /// Whether the session record itself is still within its lifetime
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
