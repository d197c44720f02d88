use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use super::CloseEvent;
use crate::error::StreamError;

/// Event delivered from an open socket to its connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A text frame (not yet parsed)
    Text(String),
    /// A socket-level failure; the socket may still close afterwards
    Error(StreamError),
    /// The socket closed; no further events follow
    Closed(CloseEvent),
}

/// Command sent from a connection to its open socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close(CloseEvent),
}

/// Both directions of an open socket.
///
/// Dropping `outbound` closes the socket.
#[derive(Debug)]
pub struct SocketHandle {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub inbound: mpsc::UnboundedReceiver<SocketEvent>,
}

/// Socket factory used by [`super::StreamingConnection`]
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug + 'static {
    /// Check that an address can be connected to at all, before any I/O
    fn prepare(&self, _url: &str) -> Result<(), StreamError> {
        Ok(())
    }

    /// Open a socket to `url`
    async fn connect(&self, url: &str) -> Result<SocketHandle, StreamError>;
}

// ============================================================================
// WebSocket connector
// ============================================================================

/// WebSocket connector (tokio-tungstenite, rustls)
#[derive(Debug, Clone)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        // Err only means a provider is already installed
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    fn prepare(&self, url: &str) -> Result<(), StreamError> {
        url.into_client_request()
            .map(|_| ())
            .map_err(|e| StreamError::InvalidAddress(e.to_string()))
    }

    async fn connect(&self, url: &str) -> Result<SocketHandle, StreamError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| StreamError::Connection(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<SocketEvent>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => match outbound {
                        Some(Outbound::Text(text)) => {
                            if let Err(e) = sink.send(Message::Text(text.into())).await {
                                tracing::debug!("WebSocket write failed: {}", e);
                                let _ = inbound_tx.send(SocketEvent::Error(StreamError::Transport(e.to_string())));
                            }
                        }
                        Some(Outbound::Close(event)) => {
                            let frame = CloseFrame {
                                code: CloseCode::from(event.code),
                                reason: event.reason.into(),
                            };
                            let _ = sink.send(Message::Close(Some(frame))).await;
                            let _ = sink.close().await;
                            break;
                        }
                        None => {
                            let _ = sink.close().await;
                            break;
                        }
                    },

                    incoming = stream.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let _ = inbound_tx.send(SocketEvent::Text(text.as_str().to_string()));
                        }
                        Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                            Ok(text) => {
                                let _ = inbound_tx.send(SocketEvent::Text(text));
                            }
                            Err(_) => tracing::debug!("Dropping non UTF-8 binary frame"),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let event = frame
                                .map(|f| CloseEvent::new(u16::from(f.code), f.reason.as_str().to_string()))
                                .unwrap_or_else(|| CloseEvent::new(1005, ""));
                            let _ = inbound_tx.send(SocketEvent::Closed(event));
                            break;
                        }
                        // ping/pong are answered by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            let _ = inbound_tx.send(SocketEvent::Error(StreamError::Transport(e.to_string())));
                            let _ = inbound_tx.send(SocketEvent::Closed(CloseEvent::abnormal(e.to_string())));
                            break;
                        }
                        None => {
                            let _ = inbound_tx.send(SocketEvent::Closed(CloseEvent::abnormal("stream ended")));
                            break;
                        }
                    },
                }
            }
        });

        Ok(SocketHandle {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// In-memory connector
// ============================================================================

/// Server side of an in-memory socket
#[derive(Debug)]
pub struct MemorySocket {
    url: String,
    to_client: mpsc::UnboundedSender<SocketEvent>,
    from_client: mpsc::UnboundedReceiver<Outbound>,
}

impl MemorySocket {
    /// Address the client connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push a raw text frame
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.to_client.send(SocketEvent::Text(text.into()));
    }

    /// Push a JSON frame
    pub fn push_json(&self, value: &Value) {
        self.push_text(value.to_string());
    }

    /// Report a socket-level error without closing
    pub fn push_error(&self, message: impl Into<String>) {
        let _ = self
            .to_client
            .send(SocketEvent::Error(StreamError::Transport(message.into())));
    }

    /// Close the socket from the server side
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        let _ = self
            .to_client
            .send(SocketEvent::Closed(CloseEvent::new(code, reason)));
    }

    /// Wait for the next command from the client
    pub async fn next_outbound(&mut self) -> Option<Outbound> {
        self.from_client.recv().await
    }

    /// Next command from the client, if one is already queued
    pub fn try_outbound(&mut self) -> Option<Outbound> {
        self.from_client.try_recv().ok()
    }
}

#[derive(Debug)]
struct MemoryInner {
    attempts: Mutex<Vec<String>>,
    refuse: AtomicBool,
    accepted_tx: mpsc::UnboundedSender<MemorySocket>,
    accepted_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MemorySocket>>,
}

/// In-process connector: every successful connect hands a [`MemorySocket`]
/// to whoever calls [`MemoryConnector::accept`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    inner: Arc<MemoryInner>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(MemoryInner {
                attempts: Mutex::new(Vec::new()),
                refuse: AtomicBool::new(false),
                accepted_tx,
                accepted_rx: tokio::sync::Mutex::new(accepted_rx),
            }),
        }
    }

    /// Make subsequent connects fail (or succeed again)
    pub fn refuse_connections(&self, refuse: bool) {
        self.inner.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Every address a connect was attempted on, in order
    pub fn attempts(&self) -> Vec<String> {
        self.inner.attempts.lock().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.inner.attempts.lock().len()
    }

    /// Wait for the next accepted socket
    pub async fn accept(&self) -> Option<MemorySocket> {
        self.inner.accepted_rx.lock().await.recv().await
    }

    /// Next accepted socket, if one is already waiting
    pub fn try_accept(&self) -> Option<MemorySocket> {
        self.inner.accepted_rx.try_lock().ok()?.try_recv().ok()
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<SocketHandle, StreamError> {
        self.inner.attempts.lock().push(url.to_string());

        if self.inner.refuse.load(Ordering::SeqCst) {
            return Err(StreamError::Connection("connection refused".to_string()));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let socket = MemorySocket {
            url: url.to_string(),
            to_client: inbound_tx,
            from_client: outbound_rx,
        };
        self.inner
            .accepted_tx
            .send(socket)
            .map_err(|e| StreamError::Connection(format!("memory listener gone: {}", e)))?;

        Ok(SocketHandle {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
