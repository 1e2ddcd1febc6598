use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use url::Url;

use crate::{config::Settings, error::SyncError};

/// One open push connection carrying JSON text frames
#[async_trait]
pub trait PushConnection: Send {
    async fn send_text(&mut self, text: String) -> Result<(), SyncError>;

    /// Next text frame, or `Ok(None)` once the server has closed the connection
    async fn next_text(&mut self) -> Result<Option<String>, SyncError>;

    async fn close(&mut self);
}

/// Opens push connections authenticated with a session token
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self, auth_token: &str) -> Result<Box<dyn PushConnection>, SyncError>;
}

/// WebSocket connector; the token rides on the handshake's Authorization header
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SyncError> {
        Ok(Self::new(Url::parse(&settings.push_url)?))
    }
}

#[async_trait]
impl PushConnector for WsConnector {
    async fn connect(&self, auth_token: &str) -> Result<Box<dyn PushConnection>, SyncError> {
        let mut request = self.url.as_str().into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", auth_token))
            .map_err(|e| SyncError::validation(format!("auth token is not a valid header value: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, response) = connect_async(request).await?;
        tracing::debug!(url = %self.url, status = %response.status(), "push handshake complete");

        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl PushConnection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<(), SyncError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn next_text(&mut self) -> Result<Option<String>, SyncError> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => tracing::debug!("skipping non-UTF-8 binary push frame"),
                },
                Message::Close(frame) => {
                    tracing::debug!(?frame, "push channel closed by server");
                    return Ok(None);
                }
                // Ping/pong are answered by tungstenite
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "push channel close failed");
        }
    }
}
