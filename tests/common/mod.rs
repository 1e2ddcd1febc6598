#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{
    handshake::server::{ErrorResponse, Request, Response},
    Message,
};
use url::Url;

use gym_session_sync::{
    auth::Session,
    services::{
        HttpProfileClient, InMemoryNavigator, RecordingNotifier, ReconnectPolicy, SessionStore,
        SessionStoreHandle, SessionSync, SessionSyncHandle, SyncDependencies, SyncOptions,
        WsConnector,
    },
};

pub const PROFILE_PATH: &str = "/api/auth/profile";

enum ServerCommand {
    Send(String),
    Close,
}

#[derive(Default)]
struct PushServerState {
    frames: Mutex<Vec<String>>,
    auth_headers: Mutex<Vec<String>>,
    connections: AtomicUsize,
    client_closes: AtomicUsize,
    current: Mutex<Option<mpsc::UnboundedSender<ServerCommand>>>,
}

/// Local WebSocket server standing in for the backend's push channel
pub struct PushServer {
    pub url: Url,
    state: Arc<PushServerState>,
}

impl PushServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(PushServerState::default());

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(serve_connection(stream, state));
            }
        });

        Self {
            url: Url::parse(&format!("ws://{}/ws", addr)).unwrap(),
            state,
        }
    }

    /// Text frames received from clients, across every connection
    pub fn frames(&self) -> Vec<String> {
        self.state.frames.lock().unwrap().clone()
    }

    pub fn auth_headers(&self) -> Vec<String> {
        self.state.auth_headers.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Connections the client closed (or dropped) from its side
    pub fn client_closes(&self) -> usize {
        self.state.client_closes.load(Ordering::SeqCst)
    }

    /// Push a frame to the most recent connection
    pub fn push(&self, frame: &str) {
        if let Some(tx) = self.state.current.lock().unwrap().as_ref() {
            let _ = tx.send(ServerCommand::Send(frame.to_string()));
        }
    }

    /// Close the most recent connection from the server side
    pub fn drop_connection(&self) {
        if let Some(tx) = self.state.current.lock().unwrap().take() {
            let _ = tx.send(ServerCommand::Close);
        }
    }
}

async fn serve_connection(stream: tokio::net::TcpStream, state: Arc<PushServerState>) {
    let header_state = state.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if let Some(value) = request.headers().get("authorization") {
            if let Ok(value) = value.to_str() {
                header_state.auth_headers.lock().unwrap().push(value.to_string());
            }
        }
        Ok(response)
    };

    let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };
    state.connections.fetch_add(1, Ordering::SeqCst);

    let (tx, mut rx) = mpsc::unbounded_channel();
    *state.current.lock().unwrap() = Some(tx);

    let (mut sink, mut source) = ws.split();
    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(ServerCommand::Send(text)) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(ServerCommand::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            message = source.next() => match message {
                Some(Ok(Message::Text(text))) => state.frames.lock().unwrap().push(text),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    state.client_closes.fetch_add(1, Ordering::SeqCst);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}

pub struct SyncHarness {
    pub store: SessionStoreHandle,
    pub navigator: Arc<InMemoryNavigator>,
    pub notifier: Arc<RecordingNotifier>,
    pub sync: SessionSyncHandle,
}

pub fn fast_options() -> SyncOptions {
    SyncOptions {
        poll_interval: Duration::from_millis(50),
        grace_period: Duration::from_millis(100),
        login_path: "/login".to_string(),
        reconnect: ReconnectPolicy {
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(50),
            max_attempts: 5,
        },
    }
}

/// Log `session` in and start syncing it against local servers
pub async fn start_sync(
    profile_base: &str,
    push: &PushServer,
    start_path: &str,
    session: Session,
    options: SyncOptions,
) -> SyncHarness {
    let store = SessionStore::spawn();
    let navigator = Arc::new(InMemoryNavigator::new(start_path));
    let notifier = Arc::new(RecordingNotifier::new());

    let profile_url = Url::parse(&format!("{}{}", profile_base, PROFILE_PATH)).unwrap();
    let deps = SyncDependencies {
        profile_client: Arc::new(
            HttpProfileClient::new(profile_url, Duration::from_secs(2)).unwrap(),
        ),
        connector: Arc::new(WsConnector::new(push.url.clone())),
        navigator: navigator.clone(),
        notifier: notifier.clone(),
    };

    let sync = SessionSync::start(store.clone(), deps, options);
    store.login(session).await.unwrap();

    SyncHarness {
        store,
        navigator,
        notifier,
        sync,
    }
}

pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for {}", what);
}
