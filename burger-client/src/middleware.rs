//! Socket middleware
//!
//! Sits in front of the reducer: intercepts [`SocketAction`]s to open,
//! close and write the two push streams, and turns stream callbacks into
//! slice actions. Every action, control or not, is handed on unchanged.

use parking_lot::Mutex;
use serde_json::Value;
use shared::{FeedFrame, Frame, FrameError, ProfileOrdersFrame, sorted_newest_first};
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::StreamError;
use crate::store::{Action, Dispatch, FeedAction, ProfileOrdersAction, SocketAction};
use crate::stream::{
    CloseEvent, ConnectionListener, Connector, StreamConfig, StreamKind, StreamingConnection,
};

/// Push error recorded for the feed stream
pub const FEED_CONNECTION_ERROR: &str = "Order feed connection error";
/// Push error recorded for the profile orders stream when the server gives none
pub const PROFILE_ORDERS_CONNECTION_ERROR: &str = "Order history connection error";

/// Live connections, at most one per stream kind
#[derive(Debug, Default)]
struct Registry {
    feed: Option<StreamingConnection>,
    profile_orders: Option<StreamingConnection>,
}

impl Registry {
    fn slot(&mut self, kind: StreamKind) -> &mut Option<StreamingConnection> {
        match kind {
            StreamKind::Feed => &mut self.feed,
            StreamKind::ProfileOrders => &mut self.profile_orders,
        }
    }
}

/// Owner of the feed and profile orders connections
pub struct SocketMiddleware<D> {
    dispatch: D,
    config: ClientConfig,
    stream_config: StreamConfig,
    credentials: CredentialStore,
    connector: Arc<dyn Connector>,
    registry: Mutex<Registry>,
}

impl<D: Dispatch + Clone> SocketMiddleware<D> {
    /// Create a middleware whose stream callbacks dispatch into `dispatch`
    pub fn new(
        dispatch: D,
        config: ClientConfig,
        credentials: CredentialStore,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            dispatch,
            config,
            stream_config: StreamConfig::default(),
            credentials,
            connector,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Set the reconnect policy for connections created from now on
    pub fn with_stream_config(mut self, config: StreamConfig) -> Self {
        self.stream_config = config;
        self
    }

    /// Run an action through the middleware, then hand it to `next`
    pub fn handle(&self, action: Action, next: impl FnOnce(Action)) {
        if let Action::Socket(control) = &action {
            match control {
                SocketAction::Connect(kind) => self.connect(*kind),
                SocketAction::Disconnect(kind) => self.disconnect(*kind),
                SocketAction::Send(payload) => self.send(payload),
            }
        }
        next(action);
    }

    /// Current connection for a stream kind, if any
    pub fn connection(&self, kind: StreamKind) -> Option<StreamingConnection> {
        self.registry.lock().slot(kind).clone()
    }

    pub fn is_connected(&self, kind: StreamKind) -> bool {
        self.connection(kind).is_some_and(|c| c.is_connected())
    }

    fn connect(&self, kind: StreamKind) {
        let connection = {
            let mut registry = self.registry.lock();
            let slot = registry.slot(kind);
            if let Some(existing) = slot.as_ref() {
                if existing.is_connected() {
                    tracing::debug!(stream = %kind, "Already connected");
                    return;
                }
                existing.clone()
            } else {
                let created = self.create_connection(kind);
                *slot = Some(created.clone());
                created
            }
        };
        connection.connect();
    }

    fn disconnect(&self, kind: StreamKind) {
        let connection = self.registry.lock().slot(kind).take();
        match connection {
            Some(connection) => {
                tracing::info!(stream = %kind, "Disconnecting stream");
                connection.close();
            }
            None => tracing::debug!(stream = %kind, "Disconnect ignored, no connection"),
        }
    }

    fn send(&self, payload: &Value) {
        let target = {
            let registry = self.registry.lock();
            [&registry.feed, &registry.profile_orders]
                .into_iter()
                .flatten()
                .find(|c| c.is_connected())
                .cloned()
        };
        match target {
            Some(connection) => connection.send(payload),
            None => tracing::debug!("Dropping send, no stream connected"),
        }
    }

    fn create_connection(&self, kind: StreamKind) -> StreamingConnection {
        let listener: Arc<dyn ConnectionListener> = match kind {
            StreamKind::Feed => Arc::new(FeedListener {
                dispatch: self.dispatch.clone(),
            }),
            StreamKind::ProfileOrders => Arc::new(ProfileOrdersListener {
                dispatch: self.dispatch.clone(),
            }),
        };

        let url = self.config.stream_url(kind);
        tracing::debug!(stream = %kind, url = %url, "Creating stream connection");
        StreamingConnection::new(
            kind,
            url,
            listener,
            Arc::clone(&self.connector),
            self.credentials.clone(),
            self.stream_config.clone(),
        )
    }
}

impl<D> Drop for SocketMiddleware<D> {
    fn drop(&mut self) {
        let registry = self.registry.get_mut();
        for connection in [registry.feed.take(), registry.profile_orders.take()]
            .into_iter()
            .flatten()
        {
            connection.close();
        }
    }
}

struct FeedListener<D> {
    dispatch: D,
}

impl<D: Dispatch> ConnectionListener for FeedListener<D> {
    fn on_open(&self) {
        self.dispatch.dispatch(FeedAction::WsConnectionChange(true).into());
    }

    fn on_message(&self, data: Value) {
        match FeedFrame::from_value(&data) {
            Ok(Frame::Success(snapshot)) => {
                tracing::trace!(orders = snapshot.orders.len(), total = snapshot.total, "Feed snapshot");
                self.dispatch.dispatch(FeedAction::WsMessage(snapshot).into());
            }
            Ok(Frame::Failure { message }) => {
                tracing::debug!(message = ?message, "Ignoring unsuccessful feed frame");
            }
            Err(FrameError::MissingSuccess) => {
                tracing::debug!("Ignoring feed frame without success flag");
            }
            Err(e) => tracing::warn!("Dropping feed frame: {}", e),
        }
    }

    fn on_error(&self, _error: &StreamError) {
        self.dispatch
            .dispatch(FeedAction::WsError(FEED_CONNECTION_ERROR.to_string()).into());
    }

    fn on_close(&self, _event: &CloseEvent) {
        self.dispatch.dispatch(FeedAction::WsConnectionChange(false).into());
    }

    fn on_reconnect_exhausted(&self) {
        self.dispatch.dispatch(FeedAction::WsReconnectExhausted.into());
    }
}

struct ProfileOrdersListener<D> {
    dispatch: D,
}

impl<D: Dispatch> ProfileOrdersListener<D> {
    fn ws_error(&self, message: Option<String>) {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| PROFILE_ORDERS_CONNECTION_ERROR.to_string());
        self.dispatch
            .dispatch(ProfileOrdersAction::WsError(message).into());
    }
}

impl<D: Dispatch> ConnectionListener for ProfileOrdersListener<D> {
    fn on_open(&self) {
        self.dispatch
            .dispatch(ProfileOrdersAction::WsConnectionChange(true).into());
    }

    fn on_message(&self, data: Value) {
        match ProfileOrdersFrame::from_value(&data) {
            Ok(Frame::Success(body)) => {
                let orders = sorted_newest_first(&body.orders);
                self.dispatch
                    .dispatch(ProfileOrdersAction::WsMessage(orders).into());
            }
            Ok(Frame::Failure { message }) => {
                tracing::warn!(message = ?message, "Profile orders stream reported failure");
                self.ws_error(message);
            }
            Err(FrameError::MissingSuccess) => {
                let message = data.get("message").and_then(Value::as_str).map(str::to_string);
                self.ws_error(message);
            }
            Err(e) => tracing::warn!("Dropping profile orders frame: {}", e),
        }
    }

    fn on_error(&self, _error: &StreamError) {
        self.ws_error(None);
    }

    fn on_close(&self, _event: &CloseEvent) {
        self.dispatch
            .dispatch(ProfileOrdersAction::WsConnectionChange(false).into());
    }

    fn on_reconnect_exhausted(&self) {
        self.dispatch
            .dispatch(ProfileOrdersAction::WsReconnectExhausted.into());
    }
}
