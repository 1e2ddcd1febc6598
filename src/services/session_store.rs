//! Process-wide session state behind a single writer.
//!
//! `SessionStore` runs as its own task and is the only code that mutates the
//! session. Everything else holds a cloneable `SessionStoreHandle` that sends
//! commands over an mpsc channel and reads snapshots from a `watch` channel.

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};

use crate::{
    auth::{Role, Session},
    error::SyncError,
};

const STORE_CHANNEL_CAPACITY: usize = 64;

enum StoreCommand {
    Login {
        session: Session,
        reply: oneshot::Sender<()>,
    },
    UpdateRoles {
        roles: Vec<Role>,
        reply: oneshot::Sender<Result<RoleUpdate, SyncError>>,
    },
    Logout {
        reply: oneshot::Sender<Option<Session>>,
    },
}

/// Result of replacing a session's roles
#[derive(Debug, Clone)]
pub struct RoleUpdate {
    pub previous: Vec<Role>,
    pub session: Session,
}

pub struct SessionStore {
    rx: mpsc::Receiver<StoreCommand>,
    state_tx: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// Start the store task and return a handle to it
    pub fn spawn() -> SessionStoreHandle {
        let (tx, rx) = mpsc::channel(STORE_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(None);

        let store = Self { rx, state_tx };
        tokio::spawn(store.run());

        SessionStoreHandle { tx, state_rx }
    }

    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.handle_command(command);
        }
        tracing::debug!("session store stopped");
    }

    fn handle_command(&mut self, command: StoreCommand) {
        match command {
            StoreCommand::Login { session, reply } => {
                tracing::info!(
                    user_id = %session.user_id,
                    roles = ?session.role_names(),
                    "session started"
                );
                self.state_tx.send_replace(Some(session));
                let _ = reply.send(());
            }
            StoreCommand::UpdateRoles { roles, reply } => {
                let result = self.update_roles(roles);
                let _ = reply.send(result);
            }
            StoreCommand::Logout { reply } => {
                let previous = self.state_tx.send_replace(None);
                if let Some(ref session) = previous {
                    tracing::info!(user_id = %session.user_id, "session ended");
                }
                let _ = reply.send(previous);
            }
        }
    }

    fn update_roles(&mut self, roles: Vec<Role>) -> Result<RoleUpdate, SyncError> {
        let mut update = None;
        self.state_tx.send_if_modified(|state| match state {
            Some(session) if session.is_authenticated => {
                let previous = std::mem::replace(&mut session.roles, roles.clone());
                session.roles_updated_at = Some(Utc::now());
                update = Some(RoleUpdate {
                    previous,
                    session: session.clone(),
                });
                true
            }
            _ => false,
        });

        match update {
            Some(update) => {
                tracing::info!(
                    user_id = %update.session.user_id,
                    previous = ?update.previous,
                    roles = ?update.session.role_names(),
                    "session roles updated"
                );
                Ok(update)
            }
            None => Err(SyncError::NotAuthenticated),
        }
    }
}

#[derive(Clone)]
pub struct SessionStoreHandle {
    tx: mpsc::Sender<StoreCommand>,
    state_rx: watch::Receiver<Option<Session>>,
}

impl SessionStoreHandle {
    pub async fn login(&self, session: Session) -> Result<(), SyncError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Login { session, reply }).await?;
        rx.await
            .map_err(|_| SyncError::channel_closed("session store reply"))
    }

    /// Replace the session's roles, keeping their order as given
    pub async fn update_roles(&self, roles: Vec<Role>) -> Result<RoleUpdate, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::UpdateRoles { roles, reply }).await?;
        rx.await
            .map_err(|_| SyncError::channel_closed("session store reply"))?
    }

    /// Clear the session, returning what was cleared
    pub async fn logout(&self) -> Result<Option<Session>, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Logout { reply }).await?;
        rx.await
            .map_err(|_| SyncError::channel_closed("session store reply"))
    }

    pub fn current(&self) -> Option<Session> {
        self.state_rx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state_rx
            .borrow()
            .as_ref()
            .map(|s| s.is_authenticated)
            .unwrap_or(false)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state_rx.clone()
    }

    async fn send(&self, command: StoreCommand) -> Result<(), SyncError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SyncError::channel_closed("session store"))
    }
}
