use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::sleep;

use crate::{
    models::{register_frame, PushEvent},
    services::{
        push::{
            reconnect::ReconnectPolicy,
            transport::{PushConnection, PushConnector},
        },
        role_sync::SyncEvent,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    Stopped,
    AttemptsExhausted,
    CoordinatorGone,
}

enum Served {
    Stopped,
    CoordinatorGone,
    Disconnected(String),
}

/// Keeps one push connection open for a session and forwards its events
pub struct PushListener {
    connector: Arc<dyn PushConnector>,
    events: mpsc::Sender<SyncEvent>,
    policy: ReconnectPolicy,
}

impl PushListener {
    pub fn new(
        connector: Arc<dyn PushConnector>,
        events: mpsc::Sender<SyncEvent>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            connector,
            events,
            policy,
        }
    }

    pub async fn run(
        self,
        auth_token: String,
        user_id: String,
        mut stop: watch::Receiver<bool>,
    ) -> ListenerExit {
        if *stop.borrow() {
            return ListenerExit::Stopped;
        }

        // Consecutive failures since the last successful connect
        let mut failures: u32 = 0;

        loop {
            let connected = tokio::select! {
                biased;
                _ = stop.changed() => return ListenerExit::Stopped,
                result = self.connector.connect(&auth_token) => result,
            };

            match connected {
                Ok(mut connection) => {
                    failures = 0;
                    tracing::info!(user_id = %user_id, "push channel connected");

                    let served = self.serve(connection.as_mut(), &user_id, &mut stop).await;
                    match served {
                        Served::Stopped => {
                            connection.close().await;
                            tracing::debug!("push channel closed");
                            return ListenerExit::Stopped;
                        }
                        Served::CoordinatorGone => {
                            connection.close().await;
                            return ListenerExit::CoordinatorGone;
                        }
                        Served::Disconnected(reason) => {
                            tracing::warn!(reason = %reason, "push channel disconnected");
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, code = e.code(), "push channel connection error");
                }
            }

            failures += 1;
            let Some(delay) = self.policy.delay_for(failures) else {
                tracing::warn!(
                    attempts = self.policy.max_attempts,
                    "push channel reconnection attempts exhausted"
                );
                return ListenerExit::AttemptsExhausted;
            };

            tracing::info!(
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                "reconnecting push channel"
            );

            tokio::select! {
                biased;
                _ = stop.changed() => return ListenerExit::Stopped,
                _ = sleep(delay) => {}
            }
        }
    }

    async fn serve(
        &self,
        connection: &mut dyn PushConnection,
        user_id: &str,
        stop: &mut watch::Receiver<bool>,
    ) -> Served {
        // Every (re)connect registers the user again
        if let Err(e) = connection.send_text(register_frame(user_id)).await {
            return Served::Disconnected(format!("register failed: {}", e));
        }
        tracing::debug!(user_id = %user_id, "registered with push channel");

        loop {
            let frame = tokio::select! {
                biased;
                _ = stop.changed() => return Served::Stopped,
                frame = connection.next_text() => frame,
            };

            let text = match frame {
                Ok(Some(text)) => text,
                Ok(None) => return Served::Disconnected("closed by server".to_string()),
                Err(e) => return Served::Disconnected(e.to_string()),
            };

            match PushEvent::parse_frame(&text) {
                Ok(Some(event)) => {
                    tracing::debug!(event = event.name(), "push event received");
                    if self.events.send(event.into()).await.is_err() {
                        return Served::CoordinatorGone;
                    }
                }
                Ok(None) => tracing::debug!("ignoring unhandled push event"),
                Err(e) => tracing::warn!(error = %e, "malformed push frame"),
            }
        }
    }
}
