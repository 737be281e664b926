//! Connection transports the sender pool hands deliveries to.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use newswire_types::{MessageKind, Priority, PushMessage, NewswireError};

/// Transport-level send failure.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// Worth retrying: congestion, timeout, temporary gateway failure.
    Transient(String),
    /// Retrying is pointless: dead token, closed connection, unregistered
    /// device. The pipeline deactivates the subscription.
    Permanent(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(msg) => write!(f, "transient transport error: {msg}"),
            Self::Permanent(msg) => write!(f, "permanent transport error: {msg}"),
        }
    }
}

/// The wire form of a message handed to a transport.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedMessage {
    /// Message id.
    pub id: String,
    /// Channel.
    pub kind: MessageKind,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Short summary for constrained transports.
    pub summary: String,
    /// Optional click-through URL.
    pub url: Option<String>,
    /// Category label.
    pub category: String,
    /// Urgency.
    pub priority: Priority,
    /// Structured payload forwarded verbatim.
    pub payload: Option<serde_json::Value>,
}

impl RenderedMessage {
    /// Render a stored message for transmission.
    #[must_use]
    pub fn from_message(msg: &PushMessage) -> Self {
        Self {
            id: msg.id.clone(),
            kind: msg.kind,
            title: msg.title.clone(),
            body: msg.body.clone(),
            summary: msg.summary.clone(),
            url: msg.url.clone(),
            category: msg.category.clone(),
            priority: msg.priority,
            payload: msg.payload.clone(),
        }
    }
}

/// A way of reaching one device kind.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Stable transport name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Deliver one rendered message to the device behind `device_token`.
    async fn send(
        &self,
        device_token: &str,
        message: &RenderedMessage,
    ) -> Result<(), TransportError>;

    /// Live connections held by this transport, when it holds any.
    fn active_connections(&self) -> usize {
        0
    }
}

/// Long-lived duplex stream transport (desktop clients). Connections
/// register a bounded channel; a full channel is transient back-pressure,
/// a closed one is permanent.
#[derive(Default)]
pub struct StreamTransport {
    connections: RwLock<HashMap<String, mpsc::Sender<RenderedMessage>>>,
}

impl StreamTransport {
    /// Empty transport with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `device_token`, replacing any previous one.
    /// The caller drives the returned receiver.
    pub fn connect(&self, device_token: &str) -> mpsc::Receiver<RenderedMessage> {
        let (tx, rx) = mpsc::channel(64);
        self.connections
            .write()
            .expect("connection lock poisoned")
            .insert(device_token.to_string(), tx);
        rx
    }

    /// Drop the connection for `device_token`.
    pub fn disconnect(&self, device_token: &str) {
        self.connections
            .write()
            .expect("connection lock poisoned")
            .remove(device_token);
    }
}

#[async_trait]
impl PushTransport for StreamTransport {
    fn name(&self) -> &'static str {
        "stream"
    }

    async fn send(
        &self,
        device_token: &str,
        message: &RenderedMessage,
    ) -> Result<(), TransportError> {
        let sender = self
            .connections
            .read()
            .expect("connection lock poisoned")
            .get(device_token)
            .cloned();
        let Some(sender) = sender else {
            return Err(TransportError::Transient(format!(
                "{device_token} is not connected"
            )));
        };
        if sender.send(message.clone()).await.is_err() {
            self.disconnect(device_token);
            return Err(TransportError::Permanent(format!(
                "{device_token} connection closed"
            )));
        }
        Ok(())
    }

    fn active_connections(&self) -> usize {
        self.connections
            .read()
            .expect("connection lock poisoned")
            .values()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

/// Unidirectional server-push transport (web sessions). Unbounded channels:
/// a browser that stops reading gets disconnected, not back-pressured.
#[derive(Default)]
pub struct ServerPushTransport {
    connections: RwLock<HashMap<String, mpsc::UnboundedSender<RenderedMessage>>>,
}

impl ServerPushTransport {
    /// Empty transport with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for `device_token`, replacing any previous one.
    pub fn connect(&self, device_token: &str) -> mpsc::UnboundedReceiver<RenderedMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .expect("connection lock poisoned")
            .insert(device_token.to_string(), tx);
        rx
    }

    /// Drop the session for `device_token`.
    pub fn disconnect(&self, device_token: &str) {
        self.connections
            .write()
            .expect("connection lock poisoned")
            .remove(device_token);
    }
}

#[async_trait]
impl PushTransport for ServerPushTransport {
    fn name(&self) -> &'static str {
        "server-push"
    }

    async fn send(
        &self,
        device_token: &str,
        message: &RenderedMessage,
    ) -> Result<(), TransportError> {
        let sender = self
            .connections
            .read()
            .expect("connection lock poisoned")
            .get(device_token)
            .cloned();
        let Some(sender) = sender else {
            return Err(TransportError::Transient(format!(
                "{device_token} has no open session"
            )));
        };
        if sender.send(message.clone()).is_err() {
            self.disconnect(device_token);
            return Err(TransportError::Permanent(format!(
                "{device_token} session closed"
            )));
        }
        Ok(())
    }

    fn active_connections(&self) -> usize {
        self.connections
            .read()
            .expect("connection lock poisoned")
            .values()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

/// External notification-gateway transport (mobile devices). POSTs the
/// rendered message to the gateway; the gateway owns the device connection.
pub struct GatewayTransport {
    endpoint: url::Url,
    client: reqwest::Client,
}

impl GatewayTransport {
    /// Build a gateway transport for the given push endpoint.
    ///
    /// # Errors
    /// `InvalidArg` on a malformed endpoint URL or client build failure.
    pub fn new(endpoint: &str) -> Result<Self, NewswireError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| NewswireError::InvalidArg(format!("gateway endpoint: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| NewswireError::InvalidArg(format!("gateway client: {e}")))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl PushTransport for GatewayTransport {
    fn name(&self) -> &'static str {
        "gateway"
    }

    async fn send(
        &self,
        device_token: &str,
        message: &RenderedMessage,
    ) -> Result<(), TransportError> {
        let body = serde_json::json!({
            "token": device_token,
            "message": message,
        });
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        // 404/410 mean the gateway no longer knows the token.
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(TransportError::Permanent(format!(
                "gateway rejected token: HTTP {}",
                status.as_u16()
            )));
        }
        Err(TransportError::Transient(format!(
            "gateway error: HTTP {}",
            status.as_u16()
        )))
    }
}
