//! Role and account-status reconciliation.
//!
//! The poller and the push listener never touch the session themselves. They
//! enqueue `SyncEvent`s and one `SyncCoordinator` applies them in order, so
//! the store sees a single writer no matter where a change was observed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::sleep;

use crate::{
    auth::rbac::{is_under_path, same_role_set, Role},
    error::SyncError,
    models::{PushEvent, UserStatusChangeEvent},
    services::{navigation::Navigator, notify::Notifier, session_store::SessionStoreHandle},
};

const EVENT_CHANNEL_CAPACITY: usize = 32;

const DEFAULT_DEACTIVATED_MESSAGE: &str =
    "Your account has been deactivated. You will be logged out.";
const DEFAULT_REACTIVATED_MESSAGE: &str = "Your account has been reactivated.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Poll,
    Push,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    RolesObserved {
        roles: Vec<Role>,
        source: EventSource,
        message: Option<String>,
    },
    StatusChanged(UserStatusChangeEvent),
}

impl From<PushEvent> for SyncEvent {
    fn from(event: PushEvent) -> Self {
        match event {
            PushEvent::RoleChanged(change) => SyncEvent::RolesObserved {
                roles: change.roles,
                source: EventSource::Push,
                message: Some(change.message),
            },
            PushEvent::UserStatusChanged(status) => SyncEvent::StatusChanged(status),
        }
    }
}

/// What applying one event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No session to apply the event to
    Ignored,
    /// Observed roles equal the stored set
    Unchanged,
    Redirected(String),
    Reloaded,
    Reactivated,
    /// Account deactivated; the session was torn down
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorExit {
    Stopped,
    SessionTerminated,
    ChannelClosed,
}

pub struct SyncCoordinator {
    store: SessionStoreHandle,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    events: mpsc::Receiver<SyncEvent>,
    grace_period: Duration,
    login_path: String,
}

impl SyncCoordinator {
    pub fn new(
        store: SessionStoreHandle,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        grace_period: Duration,
        login_path: impl Into<String>,
    ) -> (Self, mpsc::Sender<SyncEvent>) {
        let (events_tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let coordinator = Self {
            store,
            navigator,
            notifier,
            events,
            grace_period,
            login_path: login_path.into(),
        };
        (coordinator, events_tx)
    }

    /// Apply events until stopped, the channel closes, or the session is torn down
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> CoordinatorExit {
        if *stop.borrow() {
            return CoordinatorExit::Stopped;
        }

        loop {
            tokio::select! {
                biased;

                _ = stop.changed() => {
                    tracing::debug!("coordinator stopping");
                    return CoordinatorExit::Stopped;
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        return CoordinatorExit::ChannelClosed;
                    };
                    match self.handle_event(event).await {
                        Ok(SyncOutcome::LoggedOut) => {
                            // Anything still queued belongs to a session that no longer exists
                            self.events.close();
                            return CoordinatorExit::SessionTerminated;
                        }
                        Ok(outcome) => tracing::debug!(?outcome, "sync event applied"),
                        Err(e) => tracing::error!(error = %e, code = e.code(), "failed to apply sync event"),
                    }
                }
            }
        }
    }

    pub async fn handle_event(&mut self, event: SyncEvent) -> Result<SyncOutcome, SyncError> {
        match event {
            SyncEvent::RolesObserved {
                roles,
                source,
                message,
            } => self.apply_roles(roles, source, message).await,
            SyncEvent::StatusChanged(status) => self.apply_status(status).await,
        }
    }

    async fn apply_roles(
        &self,
        observed: Vec<Role>,
        source: EventSource,
        message: Option<String>,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(session) = self.store.current().filter(|s| s.is_authenticated) else {
            tracing::debug!(?source, "roles observed without a session");
            return Ok(SyncOutcome::Ignored);
        };

        // Set comparison: a pure reorder is not a change
        if same_role_set(&session.roles, &observed) {
            tracing::debug!(?source, user_id = %session.user_id, "roles unchanged");
            return Ok(SyncOutcome::Unchanged);
        }

        let update = match self.store.update_roles(observed).await {
            Ok(update) => update,
            Err(SyncError::NotAuthenticated) => return Ok(SyncOutcome::Ignored),
            Err(e) => return Err(e),
        };

        tracing::info!(
            ?source,
            user_id = %update.session.user_id,
            previous = ?update.previous,
            roles = ?update.session.role_names(),
            "role change detected"
        );

        if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
            self.notifier.info(&message);
        }

        if update.previous.first() != update.session.primary_role() {
            let target = update.session.landing_path();
            let current = self.navigator.current_path();
            if !is_under_path(&current, target) {
                self.navigator.redirect(target);
                return Ok(SyncOutcome::Redirected(target.to_string()));
            }
        }

        self.navigator.reload();
        Ok(SyncOutcome::Reloaded)
    }

    async fn apply_status(&self, status: UserStatusChangeEvent) -> Result<SyncOutcome, SyncError> {
        let Some(session) = self.store.current().filter(|s| s.is_authenticated) else {
            tracing::debug!("status change observed without a session");
            return Ok(SyncOutcome::Ignored);
        };

        if status.is_active {
            tracing::info!(user_id = %session.user_id, "account reactivated");
            self.notifier.success(non_empty_or(&status.message, DEFAULT_REACTIVATED_MESSAGE));
            return Ok(SyncOutcome::Reactivated);
        }

        tracing::warn!(
            user_id = %session.user_id,
            grace_ms = self.grace_period.as_millis() as u64,
            "account deactivated, forcing logout"
        );
        self.notifier.error(non_empty_or(&status.message, DEFAULT_DEACTIVATED_MESSAGE));

        // Give the user time to read the notice
        sleep(self.grace_period).await;

        self.store.logout().await?;
        self.navigator.redirect(&self.login_path);
        Ok(SyncOutcome::LoggedOut)
    }
}

fn non_empty_or<'a>(message: &'a str, fallback: &'a str) -> &'a str {
    if message.trim().is_empty() {
        fallback
    } else {
        message
    }
}
