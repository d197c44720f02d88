// burger-client/src/stream/mod.rs
// Push streams: connection config, listener contract and close semantics

pub mod connection;
pub mod transport;

pub use connection::StreamingConnection;
pub use transport::{
    Connector, MemoryConnector, MemorySocket, Outbound, SocketEvent, SocketHandle, WsConnector,
};

use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::error::StreamError;

/// Normal closure
pub const CLOSE_NORMAL: u16 = 1000;
/// Endpoint going away
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Closed without a close frame
pub const CLOSE_ABNORMAL: u16 = 1006;

/// The two logical order streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Global order feed, unauthenticated
    Feed,
    /// The signed-in user's order history, authenticated by access token
    ProfileOrders,
}

impl StreamKind {
    /// Whether the stream address carries the access token
    pub fn requires_auth(&self) -> bool {
        matches!(self, StreamKind::ProfileOrders)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Feed => write!(f, "feed"),
            StreamKind::ProfileOrders => write!(f, "profile_orders"),
        }
    }
}

/// Lifecycle state of a [`StreamingConnection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Never connected, or closed manually
    Idle,
    Connecting,
    Open,
    /// Closed by the peer or by a failure; a reconnect may be scheduled
    Closed,
}

/// Close notification passed to [`ConnectionListener::on_close`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
}

impl CloseEvent {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Close without a close frame (failed connect, dropped stream)
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(CLOSE_ABNORMAL, reason)
    }

    /// Normal (1000) and going-away (1001) closes never trigger a reconnect
    pub fn is_clean(&self) -> bool {
        self.code == CLOSE_NORMAL || self.code == CLOSE_GOING_AWAY
    }
}

/// Receiver of connection lifecycle callbacks.
///
/// Every method has a no-op default so implementors only override what
/// they need. Callbacks run on the runtime's worker threads and must not
/// block.
pub trait ConnectionListener: Send + Sync + 'static {
    /// The socket opened (initially or after a reconnect)
    fn on_open(&self) {}

    /// A frame arrived and parsed as JSON
    fn on_message(&self, _data: Value) {}

    /// The socket reported a failure
    fn on_error(&self, _error: &StreamError) {}

    /// The socket closed
    fn on_close(&self, _event: &CloseEvent) {}

    /// The reconnect budget ran out; no further automatic attempts follow
    fn on_reconnect_exhausted(&self) {}
}

/// Push-stream reconnect configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Whether abnormal closes schedule a reconnect
    pub auto_reconnect: bool,
    /// Fixed delay before each reconnect attempt
    pub reconnect_interval: Duration,
    /// Maximum reconnect attempts between two successful opens
    pub max_reconnect_attempts: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_interval: Duration::from_secs(3),
            max_reconnect_attempts: 5,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reconnect delay
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set the maximum reconnect attempts
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Enable or disable automatic reconnects
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = StreamConfig::default();
        assert_eq!(config.reconnect_interval, Duration::from_secs(3));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert!(config.auto_reconnect);
    }

    #[test]
    fn test_config_builder() {
        let config = StreamConfig::new()
            .with_reconnect_interval(Duration::from_millis(100))
            .with_max_reconnect_attempts(2)
            .with_auto_reconnect(false);

        assert_eq!(config.reconnect_interval, Duration::from_millis(100));
        assert_eq!(config.max_reconnect_attempts, 2);
        assert!(!config.auto_reconnect);
    }

    #[test]
    fn test_clean_close_codes() {
        assert!(CloseEvent::new(CLOSE_NORMAL, "bye").is_clean());
        assert!(CloseEvent::new(CLOSE_GOING_AWAY, "restart").is_clean());
        assert!(!CloseEvent::abnormal("reset").is_clean());
        assert!(!CloseEvent::new(4001, "policy").is_clean());
    }
}
