use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::rbac::Role;
use crate::error::SyncError;
use crate::models::profile::deserialize_roles;

pub const ROLE_CHANGED_EVENT: &str = "roleChanged";
pub const USER_STATUS_CHANGED_EVENT: &str = "userStatusChanged";
pub const REGISTER_EVENT: &str = "register";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleChangeEvent {
    #[serde(deserialize_with = "deserialize_roles")]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusChangeEvent {
    pub is_active: bool,
    #[serde(default)]
    pub message: String,
}

/// Events the push channel delivers for the registered user
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    RoleChanged(RoleChangeEvent),
    UserStatusChanged(UserStatusChangeEvent),
}

#[derive(Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl PushEvent {
    /// Parse one text frame of the form `{"event": ..., "data": ...}`.
    /// Events this client does not handle come back as `Ok(None)`.
    pub fn parse_frame(text: &str) -> Result<Option<Self>, SyncError> {
        let frame: RawFrame = serde_json::from_str(text)?;
        match frame.event.as_str() {
            ROLE_CHANGED_EVENT => Ok(Some(PushEvent::RoleChanged(serde_json::from_value(
                frame.data,
            )?))),
            USER_STATUS_CHANGED_EVENT => Ok(Some(PushEvent::UserStatusChanged(
                serde_json::from_value(frame.data)?,
            ))),
            _ => Ok(None),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::RoleChanged(_) => ROLE_CHANGED_EVENT,
            PushEvent::UserStatusChanged(_) => USER_STATUS_CHANGED_EVENT,
        }
    }
}

/// Frame announcing which user this connection belongs to
pub fn register_frame(user_id: &str) -> String {
    json!({
        "event": REGISTER_EVENT,
        "data": { "userId": user_id },
    })
    .to_string()
}
