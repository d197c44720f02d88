// burger-client/src/stream/connection.rs
// One push socket per logical stream, with bounded fixed-interval reconnect

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::transport::{Connector, Outbound, SocketEvent, SocketHandle};
use super::{CLOSE_NORMAL, CloseEvent, ConnectionListener, ReadyState, StreamConfig, StreamKind};
use crate::credentials::CredentialStore;
use crate::error::StreamError;

/// Placeholder some login flows store instead of a real token
const TOKEN_PLACEHOLDER: &str = "undefined";
/// Tokens this short cannot be real and are not sent
const MIN_TOKEN_LEN: usize = 10;

/// Strip the bearer prefix and reject values that cannot authenticate
pub(crate) fn stream_auth_token(raw: &str) -> Option<&str> {
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    let plausible =
        !token.is_empty() && token != TOKEN_PLACEHOLDER && token.chars().count() > MIN_TOKEN_LEN;
    plausible.then_some(token)
}

struct Session {
    task: JoinHandle<()>,
    /// Set once the socket is open
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
}

struct ConnectionState {
    ready: ReadyState,
    manual_close: bool,
    /// Reconnect attempts since the last successful open
    attempts: u32,
    /// Bumped on every new socket and on manual close; events carrying an
    /// older generation are ignored
    generation: u64,
    session: Option<Session>,
    reconnect: Option<CancellationToken>,
}

struct Shared {
    kind: StreamKind,
    url: String,
    listener: Arc<dyn ConnectionListener>,
    connector: Arc<dyn Connector>,
    credentials: CredentialStore,
    config: StreamConfig,
    state: Mutex<ConnectionState>,
}

/// Streaming connection
///
/// Owns the full lifecycle of one push socket: opening (with token
/// injection for the per-user stream), frame parsing, and automatic
/// reconnects after abnormal closes. All methods return immediately;
/// socket I/O and reconnect delays run as tokio tasks, so they must be
/// called from within a tokio runtime.
///
/// State machine: `Idle → Connecting → Open → Closed`, `Closed →
/// Connecting` on a scheduled reconnect, any state `→ Idle` on
/// [`close`](Self::close).
#[derive(Clone)]
pub struct StreamingConnection {
    shared: Arc<Shared>,
}

impl StreamingConnection {
    /// Create an inert connection; nothing happens until [`connect`](Self::connect)
    pub fn new(
        kind: StreamKind,
        url: impl Into<String>,
        listener: Arc<dyn ConnectionListener>,
        connector: Arc<dyn Connector>,
        credentials: CredentialStore,
        config: StreamConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                kind,
                url: url.into(),
                listener,
                connector,
                credentials,
                config,
                state: Mutex::new(ConnectionState {
                    ready: ReadyState::Idle,
                    manual_close: false,
                    attempts: 0,
                    generation: 0,
                    session: None,
                    reconnect: None,
                }),
            }),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.shared.kind
    }

    pub fn ready_state(&self) -> ReadyState {
        self.shared.state.lock().ready
    }

    /// Reconnect attempts made since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.state.lock().attempts
    }

    /// True iff the socket is open
    pub fn is_connected(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Open the socket.
    ///
    /// No-op while the socket is open or opening. Clears a previous manual
    /// close; does not reset the reconnect counter (only a successful open
    /// does).
    pub fn connect(&self) {
        let failed = {
            let mut state = self.shared.state.lock();
            if matches!(state.ready, ReadyState::Open | ReadyState::Connecting) {
                tracing::trace!(stream = %self.shared.kind, "connect ignored, socket already active");
                return;
            }
            state.manual_close = false;
            if let Some(timer) = state.reconnect.take() {
                timer.cancel();
            }
            match Shared::start(&self.shared, &mut state) {
                Ok(()) => None,
                Err(e) => {
                    state.ready = ReadyState::Closed;
                    Some(e)
                }
            }
        };

        if let Some(e) = failed {
            tracing::warn!(stream = %self.shared.kind, "Failed to start connection: {}", e);
            Shared::schedule_reconnect(&self.shared);
        }
    }

    /// Send a payload if the socket is open.
    ///
    /// Strings go out verbatim, anything else as JSON text. Best effort:
    /// nothing is reported when the socket is not open or the payload
    /// cannot be serialized.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) {
        let text = match serde_json::to_value(payload) {
            Ok(Value::String(text)) => text,
            Ok(value) => value.to_string(),
            Err(e) => {
                tracing::debug!(stream = %self.shared.kind, "Dropping unserializable payload: {}", e);
                return;
            }
        };

        let state = self.shared.state.lock();
        if state.ready != ReadyState::Open {
            tracing::debug!(stream = %self.shared.kind, "Dropping send, socket not open");
            return;
        }
        let outbound = state.session.as_ref().and_then(|s| s.outbound.as_ref());
        if let Some(outbound) = outbound {
            if outbound.send(Outbound::Text(text)).is_err() {
                tracing::debug!(stream = %self.shared.kind, "Dropping send, socket writer gone");
            }
        }
    }

    /// Close the socket and stop reconnecting.
    ///
    /// Cancels a pending reconnect, closes an open socket with code 1000
    /// and reports that close to the listener. Safe to call repeatedly.
    pub fn close(&self) {
        let was_open = {
            let mut state = self.shared.state.lock();
            state.manual_close = true;
            if let Some(timer) = state.reconnect.take() {
                timer.cancel();
            }

            let was_open = state.ready == ReadyState::Open;
            if let Some(session) = state.session.take() {
                if let (true, Some(outbound)) = (was_open, &session.outbound) {
                    let _ = outbound.send(Outbound::Close(CloseEvent::new(CLOSE_NORMAL, "Manual close")));
                }
                session.task.abort();
            }
            state.generation += 1;
            state.ready = ReadyState::Idle;
            was_open
        };

        if was_open {
            tracing::info!(stream = %self.shared.kind, "Stream closed manually");
            self.shared
                .listener
                .on_close(&CloseEvent::new(CLOSE_NORMAL, "Manual close"));
        }
    }

    /// Address used for the next connect attempt
    pub fn effective_url(&self) -> String {
        self.shared.effective_url()
    }
}

impl fmt::Debug for StreamingConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("StreamingConnection")
            .field("kind", &self.shared.kind)
            .field("url", &self.shared.url)
            .field("ready", &state.ready)
            .field("attempts", &state.attempts)
            .finish()
    }
}

impl Shared {
    fn effective_url(&self) -> String {
        if !self.kind.requires_auth() {
            return self.url.clone();
        }

        let raw = self.credentials.access_token();
        match raw.as_deref().and_then(stream_auth_token) {
            Some(token) => {
                let separator = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{}token={}", self.url, separator, urlencoding::encode(token))
            }
            None => {
                tracing::debug!(stream = %self.kind, "No usable access token, connecting without one");
                self.url.clone()
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    /// Start a new socket attempt. Caller holds the state lock.
    fn start(this: &Arc<Self>, state: &mut ConnectionState) -> Result<(), StreamError> {
        let runtime = Handle::try_current()
            .map_err(|_| StreamError::Connection("no tokio runtime available".to_string()))?;
        let url = this.effective_url();
        this.connector.prepare(&url)?;

        state.generation += 1;
        state.ready = ReadyState::Connecting;
        let generation = state.generation;

        tracing::debug!(stream = %this.kind, generation, "Opening stream");
        let shared = Arc::clone(this);
        let task = runtime.spawn(async move { shared.run_session(generation, url).await });
        state.session = Some(Session {
            task,
            outbound: None,
        });
        Ok(())
    }

    async fn run_session(self: Arc<Self>, generation: u64, url: String) {
        let SocketHandle {
            outbound,
            mut inbound,
        } = match self.connector.connect(&url).await {
            Ok(handle) => handle,
            Err(e) => {
                self.handle_error(generation, &e);
                self.handle_close(generation, CloseEvent::abnormal(e.to_string()));
                return;
            }
        };

        if !self.handle_open(generation, outbound) {
            return;
        }

        while let Some(event) = inbound.recv().await {
            match event {
                SocketEvent::Text(text) => self.handle_text(generation, &text),
                SocketEvent::Error(e) => self.handle_error(generation, &e),
                SocketEvent::Closed(close) => {
                    self.handle_close(generation, close);
                    return;
                }
            }
        }
        self.handle_close(generation, CloseEvent::abnormal("socket dropped"));
    }

    fn handle_open(&self, generation: u64, outbound: mpsc::UnboundedSender<Outbound>) -> bool {
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return false;
            }
            state.ready = ReadyState::Open;
            state.attempts = 0;
            if let Some(session) = state.session.as_mut() {
                session.outbound = Some(outbound);
            }
        }
        tracing::info!(stream = %self.kind, "Stream connected");
        self.listener.on_open();
        true
    }

    fn handle_text(&self, generation: u64, text: &str) {
        if !self.is_current(generation) {
            return;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(data) => self.listener.on_message(data),
            Err(e) => tracing::debug!(stream = %self.kind, "Discarding malformed frame: {}", e),
        }
    }

    fn handle_error(&self, generation: u64, error: &StreamError) {
        if !self.is_current(generation) {
            return;
        }
        tracing::warn!(stream = %self.kind, "Stream error: {}", error);
        self.listener.on_error(error);
    }

    fn handle_close(self: &Arc<Self>, generation: u64, event: CloseEvent) {
        let reconnect = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.ready = ReadyState::Closed;
            state.session = None;
            self.config.auto_reconnect && !state.manual_close && !event.is_clean()
        };

        tracing::info!(stream = %self.kind, code = event.code, reason = %event.reason, "Stream closed");
        if reconnect {
            Self::schedule_reconnect(self);
        }
        self.listener.on_close(&event);
    }

    fn schedule_reconnect(this: &Arc<Self>) {
        let exhausted = {
            let mut state = this.state.lock();
            if state.manual_close {
                return;
            }

            if state.attempts >= this.config.max_reconnect_attempts {
                true
            } else {
                let has_token = this
                    .credentials
                    .access_token()
                    .is_some_and(|token| !token.is_empty());
                if this.kind.requires_auth() && !has_token {
                    tracing::debug!(stream = %this.kind, "No access token, skipping reconnect");
                    return;
                }
                let Ok(runtime) = Handle::try_current() else {
                    tracing::error!(stream = %this.kind, "No tokio runtime, cannot schedule reconnect");
                    return;
                };

                state.attempts += 1;
                let token = CancellationToken::new();
                if let Some(previous) = state.reconnect.replace(token.clone()) {
                    previous.cancel();
                }

                let delay = this.config.reconnect_interval;
                tracing::info!(
                    stream = %this.kind,
                    attempt = state.attempts,
                    max = this.config.max_reconnect_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnect"
                );

                let shared = Arc::clone(this);
                runtime.spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = tokio::time::sleep(delay) => Self::fire_reconnect(&shared, &token),
                    }
                });
                false
            }
        };

        if exhausted {
            tracing::warn!(
                stream = %this.kind,
                max = this.config.max_reconnect_attempts,
                "Reconnect attempts exhausted, giving up"
            );
            this.listener.on_reconnect_exhausted();
        }
    }

    fn fire_reconnect(this: &Arc<Self>, token: &CancellationToken) {
        let failed = {
            let mut state = this.state.lock();
            // close() cancels under this same lock, so a cancelled token here
            // means the timer lost the race and must not reconnect
            if token.is_cancelled() || state.manual_close {
                return;
            }
            state.reconnect = None;
            if matches!(state.ready, ReadyState::Open | ReadyState::Connecting) {
                return;
            }
            match Self::start(this, &mut state) {
                Ok(()) => None,
                Err(e) => {
                    state.ready = ReadyState::Closed;
                    Some(e)
                }
            }
        };

        if let Some(e) = failed {
            tracing::warn!(stream = %this.kind, "Reconnect attempt could not start: {}", e);
            Self::schedule_reconnect(this);
        }
    }
}
