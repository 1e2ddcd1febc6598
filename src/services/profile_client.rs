use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use url::Url;

use crate::{
    config::Settings,
    error::SyncError,
    models::profile::{ProfileEnvelope, UserProfile},
};

/// Source of the current user's profile
#[async_trait]
pub trait ProfileClient: Send + Sync {
    async fn fetch_profile(&self, auth_token: &str) -> Result<UserProfile, SyncError>;
}

/// Profile client for the backend's REST endpoint
pub struct HttpProfileClient {
    client: Client,
    profile_url: Url,
}

impl HttpProfileClient {
    pub fn new(profile_url: Url, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gym-session-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            profile_url,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SyncError> {
        Self::new(settings.profile_url()?, settings.http_timeout())
    }
}

#[async_trait]
impl ProfileClient for HttpProfileClient {
    async fn fetch_profile(&self, auth_token: &str) -> Result<UserProfile, SyncError> {
        tracing::debug!(url = %self.profile_url, "fetching profile");

        let response = self
            .client
            .get(self.profile_url.clone())
            .bearer_auth(auth_token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SyncError::authentication(format!(
                "profile request rejected with HTTP {}",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::external_service(format!(
                "HTTP {} error: {}",
                status, body
            )));
        }

        let text = response.text().await?;
        let envelope: ProfileEnvelope = serde_json::from_str(&text).map_err(|e| {
            tracing::debug!("profile response: {}", text);
            SyncError::external_service(format!("Failed to parse profile response: {}", e))
        })?;

        Ok(envelope.into_profile())
    }
}
