//! Live feed root: state store behind the socket middleware

use serde_json::Value;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::http::OrdersApi;
use crate::middleware::SocketMiddleware;
use crate::store::{self, Action, Dispatch, SocketAction, Store};
use crate::stream::{Connector, StreamConfig, StreamKind, WsConnector};

struct Inner {
    store: Store,
    middleware: SocketMiddleware<Store>,
}

/// Application root.
///
/// Dispatching runs the action through [`SocketMiddleware`] and then the
/// reducers. Construct once and share by cloning the handle.
#[derive(Clone)]
pub struct LiveFeed {
    inner: Arc<Inner>,
}

impl LiveFeed {
    pub fn new(
        config: ClientConfig,
        credentials: CredentialStore,
        connector: Arc<dyn Connector>,
        stream_config: StreamConfig,
    ) -> Self {
        let store = Store::new();
        let middleware = SocketMiddleware::new(store.clone(), config, credentials, connector)
            .with_stream_config(stream_config);
        Self {
            inner: Arc::new(Inner { store, middleware }),
        }
    }

    /// Root talking to the real backend over WebSockets
    pub fn connect_ws(config: ClientConfig, credentials: CredentialStore) -> Self {
        Self::new(
            config,
            credentials,
            Arc::new(WsConnector::new()),
            StreamConfig::default(),
        )
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn middleware(&self) -> &SocketMiddleware<Store> {
        &self.inner.middleware
    }

    // ========== Control actions ==========

    pub fn connect(&self, kind: StreamKind) {
        self.dispatch(SocketAction::Connect(kind).into());
    }

    pub fn disconnect(&self, kind: StreamKind) {
        self.dispatch(SocketAction::Disconnect(kind).into());
    }

    pub fn send(&self, payload: Value) {
        self.dispatch(SocketAction::Send(payload).into());
    }

    // ========== Pull fallback ==========

    pub async fn fetch_feeds(&self, api: &dyn OrdersApi) {
        store::fetch_feeds(self, api).await;
    }

    pub async fn fetch_profile_orders(&self, api: &dyn OrdersApi) {
        store::fetch_profile_orders(self, api).await;
    }

    pub async fn fetch_order_by_number(&self, api: &dyn OrdersApi, number: u64) {
        store::fetch_order_by_number(self, api, number).await;
    }
}

impl Dispatch for LiveFeed {
    fn dispatch(&self, action: Action) {
        let store = &self.inner.store;
        self.inner
            .middleware
            .handle(action, |action| store.reduce(&action));
    }
}
