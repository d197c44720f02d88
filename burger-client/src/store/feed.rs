//! Feed state slice
//!
//! Global order feed: the latest snapshot (orders plus counters), the
//! order opened by display number, and both pull and push status flags.

use shared::{FeedSnapshot, Order};
use std::sync::Arc;

use super::Dispatch;
use crate::http::OrdersApi;

/// Message stored when an order lookup returns nothing
pub const ORDER_NOT_FOUND: &str = "Order not found";

/// Feed slice actions
#[derive(Debug, Clone, PartialEq)]
pub enum FeedAction {
    // ========== Pull path ==========
    FetchPending,
    FetchFulfilled(FeedSnapshot),
    FetchRejected(String),
    OrderByNumberPending,
    OrderByNumberFulfilled(Order),
    OrderByNumberRejected(String),
    ClearSelectedOrder,
    ClearError,

    // ========== Push path ==========
    WsMessage(FeedSnapshot),
    WsConnectionChange(bool),
    WsError(String),
    WsReconnectExhausted,
}

/// Feed slice state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    /// Raw order list in server order; replaced wholesale, never mutated
    pub orders: Arc<Vec<Order>>,
    pub total: u64,
    pub total_today: u64,
    pub selected_order: Option<Order>,
    pub feeds_loading: bool,
    pub order_loading: bool,
    /// Last pull-path failure
    pub error: Option<String>,
    pub ws_connected: bool,
    /// Last push-path failure
    pub ws_error: Option<String>,
    /// Automatic reconnects gave up; cleared by the next successful open
    pub reconnect_exhausted: bool,
}

impl FeedState {
    /// Apply one action. Pure: the result depends only on the state and
    /// the action.
    pub fn apply(&mut self, action: &FeedAction) {
        match action {
            FeedAction::FetchPending => {
                self.feeds_loading = true;
                self.error = None;
            }
            FeedAction::FetchFulfilled(snapshot) => {
                self.feeds_loading = false;
                self.replace_snapshot(snapshot);
            }
            FeedAction::FetchRejected(reason) => {
                self.feeds_loading = false;
                self.error = Some(reason.clone());
            }
            FeedAction::OrderByNumberPending => {
                self.order_loading = true;
                self.error = None;
            }
            FeedAction::OrderByNumberFulfilled(order) => {
                self.order_loading = false;
                self.selected_order = Some(order.clone());
            }
            FeedAction::OrderByNumberRejected(reason) => {
                self.order_loading = false;
                self.error = Some(reason.clone());
            }
            FeedAction::ClearSelectedOrder => self.selected_order = None,
            FeedAction::ClearError => self.error = None,
            FeedAction::WsMessage(snapshot) => {
                self.replace_snapshot(snapshot);
                self.ws_error = None;
            }
            FeedAction::WsConnectionChange(connected) => {
                self.ws_connected = *connected;
                if *connected {
                    self.reconnect_exhausted = false;
                }
            }
            FeedAction::WsError(message) => self.ws_error = Some(message.clone()),
            FeedAction::WsReconnectExhausted => self.reconnect_exhausted = true,
        }
    }

    fn replace_snapshot(&mut self, snapshot: &FeedSnapshot) {
        self.orders = Arc::new(snapshot.orders.clone());
        self.total = snapshot.total;
        self.total_today = snapshot.total_today;
    }
}

/// Pull the feed snapshot, dispatching the request lifecycle
pub async fn fetch_feeds<D, A>(dispatch: &D, api: &A)
where
    D: Dispatch + ?Sized,
    A: OrdersApi + ?Sized,
{
    dispatch.dispatch(FeedAction::FetchPending.into());
    match api.feeds().await {
        Ok(snapshot) => {
            tracing::debug!(orders = snapshot.orders.len(), "Feed fetched");
            dispatch.dispatch(FeedAction::FetchFulfilled(snapshot).into());
        }
        Err(e) => {
            tracing::warn!("Feed fetch failed: {}", e);
            dispatch.dispatch(FeedAction::FetchRejected(e.user_message()).into());
        }
    }
}

/// Look up one order by display number and store it as the selected order
pub async fn fetch_order_by_number<D, A>(dispatch: &D, api: &A, number: u64)
where
    D: Dispatch + ?Sized,
    A: OrdersApi + ?Sized,
{
    dispatch.dispatch(FeedAction::OrderByNumberPending.into());
    match api.orders_by_number(number).await {
        Ok(orders) => match orders.into_iter().next() {
            Some(order) => dispatch.dispatch(FeedAction::OrderByNumberFulfilled(order).into()),
            None => {
                tracing::debug!(number, "Order lookup returned no orders");
                dispatch.dispatch(FeedAction::OrderByNumberRejected(ORDER_NOT_FOUND.to_string()).into());
            }
        },
        Err(e) => {
            tracing::warn!(number, "Order lookup failed: {}", e);
            dispatch.dispatch(FeedAction::OrderByNumberRejected(e.user_message()).into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::OrderStatus;

    fn order(id: &str, number: u64) -> Order {
        Order {
            id: id.to_string(),
            name: "Test Order".to_string(),
            ingredients: vec![],
            status: OrderStatus::Done,
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
            number,
        }
    }

    fn snapshot(orders: Vec<Order>, total: u64, total_today: u64) -> FeedSnapshot {
        FeedSnapshot {
            orders,
            total,
            total_today,
        }
    }

    #[test]
    fn test_initial_state() {
        let state = FeedState::default();
        assert!(state.orders.is_empty());
        assert_eq!(state.total, 0);
        assert_eq!(state.total_today, 0);
        assert!(state.selected_order.is_none());
        assert!(!state.feeds_loading && !state.order_loading);
        assert!(state.error.is_none() && state.ws_error.is_none());
        assert!(!state.ws_connected && !state.reconnect_exhausted);
    }

    #[test]
    fn test_fetch_lifecycle() {
        let mut state = FeedState {
            error: Some("stale".to_string()),
            ..Default::default()
        };

        state.apply(&FeedAction::FetchPending);
        assert!(state.feeds_loading);
        assert!(state.error.is_none());

        state.apply(&FeedAction::FetchFulfilled(snapshot(vec![order("1", 12345)], 100, 10)));
        assert!(!state.feeds_loading);
        assert_eq!(state.orders.len(), 1);
        assert_eq!(state.total, 100);
        assert_eq!(state.total_today, 10);

        state.apply(&FeedAction::FetchPending);
        state.apply(&FeedAction::FetchRejected("Network error".to_string()));
        assert!(!state.feeds_loading);
        assert_eq!(state.error.as_deref(), Some("Network error"));
        // a failed refresh keeps the last good snapshot
        assert_eq!(state.orders.len(), 1);
    }

    #[test]
    fn test_order_by_number_lifecycle() {
        let mut state = FeedState::default();

        state.apply(&FeedAction::OrderByNumberPending);
        assert!(state.order_loading);

        state.apply(&FeedAction::OrderByNumberFulfilled(order("1", 12345)));
        assert!(!state.order_loading);
        assert_eq!(state.selected_order.as_ref().map(|o| o.number), Some(12345));

        state.apply(&FeedAction::ClearSelectedOrder);
        assert!(state.selected_order.is_none());

        state.apply(&FeedAction::OrderByNumberRejected(ORDER_NOT_FOUND.to_string()));
        assert_eq!(state.error.as_deref(), Some(ORDER_NOT_FOUND));
        state.apply(&FeedAction::ClearError);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_ws_message_replaces_snapshot() {
        let mut state = FeedState::default();
        state.apply(&FeedAction::WsError("Order feed connection error".to_string()));

        state.apply(&FeedAction::WsMessage(snapshot(
            vec![order("a", 1), order("b", 2)],
            2,
            2,
        )));
        assert_eq!(state.orders.len(), 2);
        assert!(state.ws_error.is_none());

        state.apply(&FeedAction::WsMessage(snapshot(vec![order("c", 3)], 3, 1)));
        let ids: Vec<&str> = state.orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
        assert_eq!(state.total, 3);
        assert_eq!(state.total_today, 1);
    }

    #[test]
    fn test_empty_snapshot_clears_orders() {
        let mut state = FeedState::default();
        state.apply(&FeedAction::WsMessage(snapshot(vec![order("a", 1)], 1, 1)));
        state.apply(&FeedAction::WsMessage(snapshot(vec![], 0, 0)));
        assert!(state.orders.is_empty());
        assert_eq!(state.total, 0);
    }

    #[test]
    fn test_connection_flags() {
        let mut state = FeedState::default();

        state.apply(&FeedAction::WsConnectionChange(true));
        assert!(state.ws_connected);

        state.apply(&FeedAction::WsConnectionChange(false));
        state.apply(&FeedAction::WsReconnectExhausted);
        assert!(!state.ws_connected);
        assert!(state.reconnect_exhausted);
        // exhaustion is not a push error
        assert!(state.ws_error.is_none());

        state.apply(&FeedAction::WsConnectionChange(true));
        assert!(!state.reconnect_exhausted);
    }
}
