use serde::{Deserialize, Serialize};
use std::fmt;

/// Landing path for sessions whose primary role has no dashboard section
pub const FORBIDDEN_PATH: &str = "/403";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Receptionist,
    Coach,
    Client,
    /// A role name the dashboard has no section for, kept verbatim
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Receptionist => "receptionist",
            Role::Coach => "coach",
            Role::Client => "client",
            Role::Other(name) => name.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        let normalized = s.trim();
        match normalized.to_lowercase().as_str() {
            "admin" => Role::Admin,
            "receptionist" => Role::Receptionist,
            "coach" => Role::Coach,
            "client" => Role::Client,
            _ => Role::Other(normalized.to_string()),
        }
    }

    /// Dashboard section this role lands on
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Receptionist => "/receptionist",
            Role::Coach => "/coach",
            Role::Client => "/client",
            Role::Other(_) => FORBIDDEN_PATH,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// First role in the list, which picks the dashboard section
pub fn primary_role(roles: &[Role]) -> Option<&Role> {
    roles.first()
}

/// Landing path for an ordered role list; no roles lands on the forbidden page
pub fn landing_path_for(roles: &[Role]) -> &'static str {
    primary_role(roles)
        .map(Role::landing_path)
        .unwrap_or(FORBIDDEN_PATH)
}

/// Order-insensitive comparison key: sorted names joined with commas
pub fn role_set_key(roles: &[Role]) -> String {
    let mut names: Vec<&str> = roles.iter().map(Role::as_str).collect();
    names.sort_unstable();
    names.join(",")
}

pub fn same_role_set(a: &[Role], b: &[Role]) -> bool {
    role_set_key(a) == role_set_key(b)
}

/// True when `current` is `section` itself or a page beneath it
pub fn is_under_path(current: &str, section: &str) -> bool {
    match current.strip_prefix(section) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}
