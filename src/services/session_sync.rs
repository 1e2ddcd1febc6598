//! Ties the sync machinery to the session's lifetime.
//!
//! A supervisor task watches the store. Each authenticated session gets its
//! own coordinator, poller and push listener sharing one stop signal; the set
//! is torn down when the session goes away and rebuilt on the next login.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::Session,
    config::Settings,
    services::{
        navigation::Navigator,
        notify::Notifier,
        poller::RolePoller,
        profile_client::ProfileClient,
        push::{PushConnector, PushListener, ReconnectPolicy},
        role_sync::SyncCoordinator,
        session_store::SessionStoreHandle,
    },
};

/// Collaborators shared by every sync run
#[derive(Clone)]
pub struct SyncDependencies {
    pub profile_client: Arc<dyn ProfileClient>,
    pub connector: Arc<dyn PushConnector>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub poll_interval: Duration,
    pub grace_period: Duration,
    pub login_path: String,
    pub reconnect: ReconnectPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            grace_period: Duration::from_secs(3),
            login_path: "/login".to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl SyncOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            grace_period: settings.deactivation_grace(),
            login_path: settings.login_path.clone(),
            reconnect: settings.reconnect_policy(),
        }
    }
}

pub struct SessionSync;

impl SessionSync {
    /// Start supervising `store`. Sync runs whenever a session is authenticated.
    pub fn start(
        store: SessionStoreHandle,
        deps: SyncDependencies,
        options: SyncOptions,
    ) -> SessionSyncHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (run_tx, run_rx) = watch::channel(None);

        let supervisor = Supervisor {
            store,
            deps,
            options,
            run_tx,
        };
        let supervisor = tokio::spawn(supervisor.run(shutdown_rx));

        SessionSyncHandle {
            shutdown_tx,
            run_rx,
            supervisor: Mutex::new(Some(supervisor)),
        }
    }
}

pub struct SessionSyncHandle {
    shutdown_tx: watch::Sender<bool>,
    run_rx: watch::Receiver<Option<Uuid>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl SessionSyncHandle {
    /// Id of the sync run for the current session, if one is active
    pub fn current_run(&self) -> Option<Uuid> {
        *self.run_rx.borrow()
    }

    pub fn subscribe_runs(&self) -> watch::Receiver<Option<Uuid>> {
        self.run_rx.clone()
    }

    /// Stop any active run and wait for every task to finish. Safe to call twice.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let supervisor = self.supervisor.lock().await.take();
        if let Some(supervisor) = supervisor {
            if let Err(e) = supervisor.await {
                tracing::error!(error = %e, "session sync supervisor panicked");
            }
        }
    }
}

struct Supervisor {
    store: SessionStoreHandle,
    deps: SyncDependencies,
    options: SyncOptions,
    run_tx: watch::Sender<Option<Uuid>>,
}

impl Supervisor {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut sessions = self.store.subscribe();
        let mut active: Option<ActiveSync> = None;

        loop {
            let snapshot = sessions
                .borrow_and_update()
                .clone()
                .filter(|s| s.is_authenticated);

            active = match (active.take(), snapshot) {
                (None, Some(session)) => Some(self.start_run(&session)),
                (Some(run), Some(session)) if run.belongs_to(&session) => Some(run),
                (Some(run), Some(session)) => {
                    tracing::info!(
                        run_id = %run.run_id,
                        user_id = %session.user_id,
                        "session replaced, restarting sync"
                    );
                    run.stop().await;
                    Some(self.start_run(&session))
                }
                (Some(run), None) => {
                    run.stop().await;
                    self.run_tx.send_replace(None);
                    None
                }
                (None, None) => None,
            };

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                changed = sessions.changed() => {
                    if changed.is_err() {
                        tracing::debug!("session store gone");
                        break;
                    }
                }
            }
        }

        if let Some(run) = active.take() {
            run.stop().await;
        }
        self.run_tx.send_replace(None);
        tracing::debug!("session sync supervisor stopped");
    }

    fn start_run(&self, session: &Session) -> ActiveSync {
        let run = ActiveSync::start(self.store.clone(), session, &self.deps, &self.options);
        self.run_tx.send_replace(Some(run.run_id));
        run
    }
}

/// The tasks serving one authenticated session
struct ActiveSync {
    run_id: Uuid,
    user_id: String,
    auth_token: String,
    stop_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl ActiveSync {
    fn start(
        store: SessionStoreHandle,
        session: &Session,
        deps: &SyncDependencies,
        options: &SyncOptions,
    ) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("session_sync", run_id = %run_id, user_id = %session.user_id);
        let (stop_tx, stop_rx) = watch::channel(false);

        let (coordinator, events) = SyncCoordinator::new(
            store,
            deps.navigator.clone(),
            deps.notifier.clone(),
            options.grace_period,
            options.login_path.clone(),
        );
        let poller = RolePoller::new(
            deps.profile_client.clone(),
            events.clone(),
            options.poll_interval,
        );
        let listener = PushListener::new(deps.connector.clone(), events, options.reconnect);

        let coordinator_stop = stop_rx.clone();
        let coordinator_task = tokio::spawn(
            async move {
                let exit = coordinator.run(coordinator_stop).await;
                tracing::debug!(?exit, "sync coordinator exited");
            }
            .instrument(span.clone()),
        );

        let poller_stop = stop_rx.clone();
        let poller_token = session.auth_token.clone();
        let poller_task = tokio::spawn(
            async move { poller.run(poller_token, poller_stop).await }.instrument(span.clone()),
        );

        let listener_token = session.auth_token.clone();
        let listener_user = session.user_id.clone();
        let listener_task = tokio::spawn(
            async move {
                let exit = listener.run(listener_token, listener_user, stop_rx).await;
                tracing::debug!(?exit, "push listener exited");
            }
            .instrument(span.clone()),
        );

        span.in_scope(|| tracing::info!(roles = ?session.role_names(), "session sync started"));

        Self {
            run_id,
            user_id: session.user_id.clone(),
            auth_token: session.auth_token.clone(),
            stop_tx,
            tasks: vec![
                ("coordinator", coordinator_task),
                ("poller", poller_task),
                ("push_listener", listener_task),
            ],
        }
    }

    fn belongs_to(&self, session: &Session) -> bool {
        self.user_id == session.user_id && self.auth_token == session.auth_token
    }

    async fn stop(self) {
        let _ = self.stop_tx.send(true);
        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(run_id = %self.run_id, task = name, error = %e, "sync task panicked");
            }
        }
        tracing::info!(run_id = %self.run_id, user_id = %self.user_id, "session sync stopped");
    }
}
