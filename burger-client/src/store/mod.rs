//! Application state
//!
//! Two independent slices (global feed, signed-in user's orders), each
//! changed only through [`Action`]s, plus memoized newest-first
//! projections of their order lists.

pub mod feed;
pub mod profile_orders;

pub use feed::{FeedAction, FeedState, fetch_feeds, fetch_order_by_number};
pub use profile_orders::{ProfileOrdersAction, ProfileOrdersState, fetch_profile_orders};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use shared::{Order, sorted_newest_first};
use std::sync::Arc;

use crate::stream::StreamKind;

/// Push-stream control actions, consumed by [`crate::SocketMiddleware`]
#[derive(Debug, Clone, PartialEq)]
pub enum SocketAction {
    Connect(StreamKind),
    Disconnect(StreamKind),
    /// Send a payload on whichever stream is connected (feed first)
    Send(Value),
}

/// Everything that can be dispatched
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Socket(SocketAction),
    Feed(FeedAction),
    ProfileOrders(ProfileOrdersAction),
}

impl From<SocketAction> for Action {
    fn from(action: SocketAction) -> Self {
        Action::Socket(action)
    }
}

impl From<FeedAction> for Action {
    fn from(action: FeedAction) -> Self {
        Action::Feed(action)
    }
}

impl From<ProfileOrdersAction> for Action {
    fn from(action: ProfileOrdersAction) -> Self {
        Action::ProfileOrders(action)
    }
}

/// Anything actions can be dispatched into
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(&self, action: Action);
}

impl<D: Dispatch + ?Sized> Dispatch for Arc<D> {
    fn dispatch(&self, action: Action) {
        (**self).dispatch(action)
    }
}

/// Memoized newest-first sort of an order list.
///
/// Recomputes only when handed a different `Arc` than last time; the
/// input list itself is never reordered.
#[derive(Debug, Default)]
pub struct SortedOrders {
    memo: Mutex<Option<(Arc<Vec<Order>>, Arc<Vec<Order>>)>>,
}

impl SortedOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&self, raw: &Arc<Vec<Order>>) -> Arc<Vec<Order>> {
        let mut memo = self.memo.lock();
        if let Some((input, output)) = memo.as_ref() {
            if Arc::ptr_eq(input, raw) {
                return Arc::clone(output);
            }
        }

        let sorted = Arc::new(sorted_newest_first(raw));
        *memo = Some((Arc::clone(raw), Arc::clone(&sorted)));
        sorted
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    feed: RwLock<FeedState>,
    profile_orders: RwLock<ProfileOrdersState>,
    sorted_feed: SortedOrders,
    sorted_profile_orders: SortedOrders,
}

/// State store handle. Cloning is cheap; all clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an action to the slice it targets; socket actions are ignored
    pub fn reduce(&self, action: &Action) {
        match action {
            Action::Feed(action) => self.inner.feed.write().apply(action),
            Action::ProfileOrders(action) => self.inner.profile_orders.write().apply(action),
            Action::Socket(_) => {}
        }
    }

    // ========== Selectors ==========

    pub fn feed(&self) -> FeedState {
        self.inner.feed.read().clone()
    }

    pub fn profile_orders(&self) -> ProfileOrdersState {
        self.inner.profile_orders.read().clone()
    }

    /// Feed orders, newest first
    pub fn sorted_feed_orders(&self) -> Arc<Vec<Order>> {
        let raw = Arc::clone(&self.inner.feed.read().orders);
        self.inner.sorted_feed.select(&raw)
    }

    /// Profile orders, newest first
    pub fn sorted_profile_orders(&self) -> Arc<Vec<Order>> {
        let raw = Arc::clone(&self.inner.profile_orders.read().orders);
        self.inner.sorted_profile_orders.select(&raw)
    }

    pub fn feed_connected(&self) -> bool {
        self.inner.feed.read().ws_connected
    }

    pub fn profile_orders_connected(&self) -> bool {
        self.inner.profile_orders.read().ws_connected
    }
}

impl Dispatch for Store {
    fn dispatch(&self, action: Action) {
        self.reduce(&action);
    }
}
