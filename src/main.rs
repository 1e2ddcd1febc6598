use std::sync::Arc;

use tokio::signal;

use gym_session_sync::{
    auth::{Role, Session},
    config,
    error::SyncError,
    logging,
    services::{
        HttpProfileClient, InMemoryNavigator, SessionStore, SessionStoreHandle, SessionSync,
        SyncDependencies, SyncOptions, TracingNotifier, WsConnector,
    },
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first
    let settings = config::Settings::new()?;

    logging::init_logging(&settings.log_level, &settings.log_format)?;

    tracing::info!("Starting gym session sync v{}", env!("CARGO_PKG_VERSION"));

    let session = session_from_env()?;
    let landing = session.landing_path();

    let store = SessionStore::spawn();
    store.login(session).await?;

    let deps = SyncDependencies {
        profile_client: Arc::new(HttpProfileClient::from_settings(&settings)?),
        connector: Arc::new(WsConnector::from_settings(&settings)?),
        navigator: Arc::new(InMemoryNavigator::new(landing)),
        notifier: Arc::new(TracingNotifier),
    };
    let sync = SessionSync::start(store.clone(), deps, SyncOptions::from_settings(&settings));

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = session_ended(&store) => {
            tracing::info!("Session ended, shutting down");
        }
    }

    sync.shutdown().await;
    tracing::info!("Session sync shutdown complete");
    Ok(())
}

fn session_from_env() -> Result<Session, SyncError> {
    let user_id = required_env("SESSION_USER_ID")?;
    let token = required_env("SESSION_TOKEN")?;
    let roles = std::env::var("SESSION_ROLES")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(Role::parse)
        .collect();

    Ok(Session::new(user_id, token, roles))
}

fn required_env(name: &str) -> Result<String, SyncError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SyncError::validation(format!("{} must be set", name)))
}

async fn session_ended(store: &SessionStoreHandle) {
    let mut sessions = store.subscribe();
    loop {
        if sessions.borrow_and_update().is_none() {
            return;
        }
        if sessions.changed().await.is_err() {
            return;
        }
    }
}

/// Handle graceful shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
