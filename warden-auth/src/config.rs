//! Access control configuration

/// Configuration for the decision core
///
/// The public path set and role names are deployment configuration, not
/// core logic; defaults match the reference policy.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Session lifetime in hours
    pub session_ttl_hours: i64,
    /// Role assigned to newly registered users
    pub default_role: String,
    /// Role name accepted by the coarse admin gate
    pub admin_role: String,
    /// Path prefixes that bypass authentication entirely
    pub public_paths: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24,
            default_role: "user".to_string(),
            admin_role: "admin".to_string(),
            public_paths: vec![
                "/api/auth/register".to_string(),
                "/api/auth/login".to_string(),
                "/api/health".to_string(),
            ],
        }
    }
}

impl AccessConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            session_ttl_hours: std::env::var("WARDEN_SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.session_ttl_hours),
            default_role: std::env::var("WARDEN_DEFAULT_ROLE")
                .unwrap_or(defaults.default_role),
            admin_role: std::env::var("WARDEN_ADMIN_ROLE").unwrap_or(defaults.admin_role),
            public_paths: defaults.public_paths,
        }
    }

    /// Whether a request path bypasses authentication
    ///
    /// A prefix only matches on a segment boundary, so `/api/health` does
    /// not make `/api/healthz` public.
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| {
            path == p
                || path
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_public_paths_cover_registration_and_login() {
        let config = AccessConfig::default();
        assert!(config.is_public_path("/api/auth/login"));
        assert!(config.is_public_path("/api/auth/register"));
        assert!(!config.is_public_path("/api/orders"));
    }

    #[test]
    fn public_prefixes_match_only_on_segment_boundaries() {
        let config = AccessConfig::default();
        assert!(config.is_public_path("/api/health"));
        assert!(config.is_public_path("/api/health/live"));
        assert!(!config.is_public_path("/api/healthz"));
        assert!(!config.is_public_path("/api/auth/login-audit"));
    }
}
