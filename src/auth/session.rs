use crate::auth::rbac::{self, Role};
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub auth_token: String,
    pub roles: Vec<Role>,
    pub is_authenticated: bool,
    pub logged_in_at: DateTime<Utc>,
    pub roles_updated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, auth_token: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            auth_token: auth_token.into(),
            roles,
            is_authenticated: true,
            logged_in_at: Utc::now(),
            roles_updated_at: None,
        }
    }

    pub fn primary_role(&self) -> Option<&Role> {
        rbac::primary_role(&self.roles)
    }

    pub fn landing_path(&self) -> &'static str {
        rbac::landing_path_for(&self.roles)
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// Names in delivery order, for log fields
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }
}

// The token stays out of logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("auth_token", &"<redacted>")
            .field("roles", &self.roles)
            .field("is_authenticated", &self.is_authenticated)
            .field("logged_in_at", &self.logged_in_at)
            .field("roles_updated_at", &self.roles_updated_at)
            .finish()
    }
}
