use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::rbac::Role;

/// A role entry as the backend sends it: a bare name or a role record
#[derive(Deserialize)]
#[serde(untagged)]
enum WireRole {
    Name(String),
    Record { name: String },
}

/// Validates a loosely typed role list at the boundary.
/// The list must be present and non-null; blank names are dropped; order is kept.
pub fn deserialize_roles<'de, D>(deserializer: D) -> Result<Vec<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<WireRole> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|entry| match entry {
            WireRole::Name(name) | WireRole::Record { name } => name,
        })
        .filter(|name| !name.trim().is_empty())
        .map(|name| Role::parse(&name))
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

/// Accepts numeric or string user ids
pub fn deserialize_user_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match WireId::deserialize(deserializer)? {
        WireId::Text(s) => s,
        WireId::Number(n) => n.to_string(),
    })
}

/// Current user's record as returned by the profile endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id", deserialize_with = "deserialize_user_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "fullName")]
    pub name: Option<String>,
    #[serde(deserialize_with = "deserialize_roles")]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// The profile endpoint answers either bare or wrapped in `user` / `data`
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileEnvelope {
    User { user: UserProfile },
    Data { data: UserProfile },
    Bare(UserProfile),
}

impl ProfileEnvelope {
    pub(crate) fn into_profile(self) -> UserProfile {
        match self {
            ProfileEnvelope::User { user } => user,
            ProfileEnvelope::Data { data } => data,
            ProfileEnvelope::Bare(profile) => profile,
        }
    }
}
