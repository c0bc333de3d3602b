//! Telemetry channel supervisor
//!
//! Owns the single duplex channel to the bot server. Every close schedules
//! exactly one reconnection attempt after a fixed delay: the previous timer
//! is aborted before a new one is armed, so rapid close bursts never stack
//! duplicate attempts. Retries are unbounded with no backoff growth.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, Connector};
use tracing::{debug, info, warn};

use super::log_console::{forwardable, LogConsole};
use super::render::RenderPort;
use crate::api::ChannelMessage;
use crate::config::constants::CHANNEL_PATH;
use crate::error::{AppError, Result};

/// Inbound text frames; the stream ends when the channel closes
pub type FrameStream = BoxStream<'static, Result<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "disconnected",
        }
    }
}

/// Opens the telemetry channel
#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    async fn open(&self, url: &str) -> Result<FrameStream>;
}

/// Derive the channel URL from the server origin (`https` ⇒ `wss`)
pub fn channel_url(origin: &str) -> Result<String> {
    let mut url = reqwest::Url::parse(origin)
        .map_err(|e| AppError::Config(format!("invalid server origin '{}': {}", origin, e)))?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(AppError::Config(format!(
                "unsupported origin scheme '{}'",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| AppError::Config(format!("cannot derive channel URL from '{}'", origin)))?;
    url.set_path(CHANNEL_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Parse one inbound frame; malformed or unknown frames yield `None`
///
/// Malformed payloads only reach the developer trace, never the operator log.
pub fn parse_frame(text: &str) -> Option<ChannelMessage> {
    match serde_json::from_str::<ChannelMessage>(text) {
        Ok(ChannelMessage::Other) => {
            debug!(frame = %text, "Ignoring telemetry frame of unknown type");
            None
        }
        Ok(message) => Some(message),
        Err(e) => {
            warn!(error = %e, frame = %text, "Malformed telemetry frame dropped");
            None
        }
    }
}

// ============================================================================
// WebSocket transport
// ============================================================================

/// tokio-tungstenite transport (TLSv1.2 minimum for `wss`)
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

#[async_trait]
impl TelemetryTransport for WsTransport {
    async fn open(&self, url: &str) -> Result<FrameStream> {
        let tls = native_tls::TlsConnector::builder()
            .min_protocol_version(Some(native_tls::Protocol::Tlsv12))
            .build()
            .map_err(|e| AppError::Config(format!("TLS error: {}", e)))?;

        let (ws_stream, _response) =
            connect_async_tls_with_config(url, None, false, Some(Connector::NativeTls(tls)))
                .await?;

        let frames = ws_stream.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => String::from_utf8(bytes).ok().map(Ok),
                Ok(_) => None,
                Err(e) => Some(Err(AppError::from(e))),
            }
        });
        Ok(frames.boxed())
    }
}

// ============================================================================
// Supervisor
// ============================================================================

struct Supervisor {
    state: ConnectionState,
    generation: u64,
    session: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
    shut_down: bool,
}

/// Connection supervisor; clones share the same channel
#[derive(Clone)]
pub struct ConnectionManager {
    url: String,
    reconnect_delay: Duration,
    transport: Arc<dyn TelemetryTransport>,
    log: LogConsole,
    port: Arc<dyn RenderPort>,
    inner: Arc<Mutex<Supervisor>>,
}

impl ConnectionManager {
    pub fn new(
        url: String,
        reconnect_delay: Duration,
        transport: Arc<dyn TelemetryTransport>,
        log: LogConsole,
        port: Arc<dyn RenderPort>,
    ) -> Self {
        Self {
            url,
            reconnect_delay,
            transport,
            log,
            port,
            inner: Arc::new(Mutex::new(Supervisor {
                state: ConnectionState::Connecting,
                generation: 0,
                session: None,
                reconnect: None,
                shut_down: false,
            })),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Open the channel, replacing any existing session and pending retry
    pub fn connect(&self) {
        let mut sup = self.lock();
        if let Some(timer) = sup.reconnect.take() {
            timer.abort();
        }
        self.open_session(&mut sup);
    }

    /// Stop the channel and every pending retry; later closes are ignored
    pub fn shutdown(&self) {
        let mut sup = self.lock();
        sup.shut_down = true;
        if let Some(timer) = sup.reconnect.take() {
            timer.abort();
        }
        if let Some(session) = sup.session.take() {
            session.abort();
        }
        info!(url = %self.url, "Telemetry channel shut down");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Supervisor> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open_session(&self, sup: &mut Supervisor) {
        if sup.shut_down {
            return;
        }
        if let Some(session) = sup.session.take() {
            session.abort();
        }
        sup.generation += 1;
        let generation = sup.generation;
        let manager = self.clone();
        sup.session = Some(tokio::spawn(async move {
            manager.run_session(generation).await;
        }));
    }

    async fn run_session(&self, generation: u64) {
        debug!(url = %self.url, generation, "Opening telemetry channel");
        match self.transport.open(&self.url).await {
            Ok(mut frames) => {
                self.handle_open(generation);
                while let Some(frame) = frames.next().await {
                    match frame {
                        Ok(text) => self.handle_frame(&text),
                        Err(e) => {
                            warn!(error = %e, "Telemetry channel error");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Telemetry channel connect failed");
            }
        }
        self.handle_close(generation);
    }

    fn handle_open(&self, generation: u64) {
        let mut sup = self.lock();
        if sup.shut_down || sup.generation != generation {
            return;
        }
        sup.state = ConnectionState::Connected;
        self.port.connection_changed(ConnectionState::Connected);
        drop(sup);
        info!(url = %self.url, "Telemetry channel connected");
        self.log.system("Connected to server");
    }

    fn handle_frame(&self, text: &str) {
        if let Some((kind, message)) = parse_frame(text).and_then(forwardable) {
            self.log.append(message, kind);
        }
    }

    /// Mark disconnected and arm exactly one retry, replacing any armed one
    pub(crate) fn handle_close(&self, generation: u64) {
        let mut sup = self.lock();
        if sup.shut_down || sup.generation != generation {
            return;
        }
        if let Some(timer) = sup.reconnect.take() {
            timer.abort();
        }
        sup.state = ConnectionState::Reconnecting;
        self.port.connection_changed(ConnectionState::Reconnecting);

        let manager = self.clone();
        let delay = self.reconnect_delay;
        sup.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut sup = manager.lock();
            // Drop our own handle without aborting the running task
            sup.reconnect.take();
            sup.state = ConnectionState::Connecting;
            manager.port.connection_changed(ConnectionState::Connecting);
            manager.open_session(&mut sup);
        }));
        drop(sup);

        info!(delay_ms = self.reconnect_delay.as_millis() as u64, "Telemetry channel closed, reconnect scheduled");
        self.log.error("Disconnected from server");
    }

    #[cfg(test)]
    fn current_generation(&self) -> u64 {
        self.lock().generation
    }

    #[cfg(test)]
    fn has_pending_reconnect(&self) -> bool {
        self.lock().reconnect.is_some()
    }
}
