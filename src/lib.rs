pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use auth::{Role, Session};
pub use self::config::Settings;
pub use error::SyncError;
