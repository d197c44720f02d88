//! Profile orders state slice

use shared::Order;
use std::sync::Arc;

use super::Dispatch;
use crate::http::OrdersApi;

/// Profile orders slice actions
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOrdersAction {
    FetchPending,
    FetchFulfilled(Vec<Order>),
    FetchRejected(String),
    /// Forget the user's orders (logout)
    Clear,
    ClearError,

    WsMessage(Vec<Order>),
    WsConnectionChange(bool),
    WsError(String),
    WsReconnectExhausted,
}

/// The signed-in user's order history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileOrdersState {
    pub orders: Arc<Vec<Order>>,
    pub loading: bool,
    pub error: Option<String>,
    pub ws_connected: bool,
    pub ws_error: Option<String>,
    pub reconnect_exhausted: bool,
}

impl ProfileOrdersState {
    pub fn apply(&mut self, action: &ProfileOrdersAction) {
        match action {
            ProfileOrdersAction::FetchPending => {
                self.loading = true;
                self.error = None;
            }
            ProfileOrdersAction::FetchFulfilled(orders) => {
                self.loading = false;
                self.orders = Arc::new(orders.clone());
            }
            ProfileOrdersAction::FetchRejected(reason) => {
                self.loading = false;
                self.error = Some(reason.clone());
            }
            ProfileOrdersAction::Clear => self.orders = Arc::default(),
            ProfileOrdersAction::ClearError => self.error = None,
            ProfileOrdersAction::WsMessage(orders) => {
                self.orders = Arc::new(orders.clone());
                self.ws_error = None;
            }
            ProfileOrdersAction::WsConnectionChange(connected) => {
                self.ws_connected = *connected;
                if *connected {
                    self.reconnect_exhausted = false;
                }
            }
            ProfileOrdersAction::WsError(message) => self.ws_error = Some(message.clone()),
            ProfileOrdersAction::WsReconnectExhausted => self.reconnect_exhausted = true,
        }
    }
}

/// Pull the signed-in user's orders
pub async fn fetch_profile_orders<D, A>(dispatch: &D, api: &A)
where
    D: Dispatch + ?Sized,
    A: OrdersApi + ?Sized,
{
    dispatch.dispatch(ProfileOrdersAction::FetchPending.into());
    match api.profile_orders().await {
        Ok(orders) => dispatch.dispatch(ProfileOrdersAction::FetchFulfilled(orders).into()),
        Err(e) => {
            tracing::warn!("Profile orders fetch failed: {}", e);
            dispatch.dispatch(ProfileOrdersAction::FetchRejected(e.user_message()).into());
        }
    }
}
