use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::{
    error::SyncError,
    services::{
        profile_client::ProfileClient,
        role_sync::{EventSource, SyncEvent},
    },
};

/// Periodically re-reads the profile and reports the roles it sees
pub struct RolePoller {
    client: Arc<dyn ProfileClient>,
    events: mpsc::Sender<SyncEvent>,
    interval: Duration,
}

impl RolePoller {
    pub fn new(
        client: Arc<dyn ProfileClient>,
        events: mpsc::Sender<SyncEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            events,
            interval,
        }
    }

    /// Poll every interval until stopped. The first poll is one interval out.
    pub async fn run(self, auth_token: String, mut stop: watch::Receiver<bool>) {
        if *stop.borrow() {
            return;
        }

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "role poller started");

        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                _ = ticker.tick() => {}
            }

            // A stop abandons the in-flight request
            let fetched = tokio::select! {
                biased;
                _ = stop.changed() => break,
                result = self.poll_once(&auth_token) => result,
            };

            match fetched {
                Ok(()) => {}
                Err(SyncError::ChannelClosed(_)) => {
                    tracing::debug!("sync coordinator gone, role poller exiting");
                    break;
                }
                Err(e) if e.is_authentication() => {
                    // Session expiry is the auth layer's job
                    tracing::warn!(error = %e, code = e.code(), "role poll rejected");
                }
                Err(e) => {
                    tracing::error!(error = %e, code = e.code(), "role poll failed");
                }
            }
        }

        tracing::debug!("role poller stopped");
    }

    /// Fetch the profile once and hand its roles to the coordinator
    pub async fn poll_once(&self, auth_token: &str) -> Result<(), SyncError> {
        let profile = self.client.fetch_profile(auth_token).await?;

        tracing::debug!(user_id = %profile.id, roles = ?profile.roles, "profile polled");

        self.events
            .send(SyncEvent::RolesObserved {
                roles: profile.roles,
                source: EventSource::Poll,
                message: None,
            })
            .await
            .map_err(|_| SyncError::channel_closed("sync events"))
    }
}
