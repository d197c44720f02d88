//! Burger Client - live order feed core
//!
//! Push streams for the global order feed and the signed-in user's order
//! history, the state they feed, and the pull API used while a stream is
//! down.

pub mod app;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fallback;
pub mod http;
pub mod middleware;
pub mod store;
pub mod stream;

pub use app::LiveFeed;
pub use config::ClientConfig;
pub use credentials::{CredentialStore, DurableState, DurableStorage};
pub use error::{ClientError, ClientResult, StorageError, StreamError};
pub use fallback::FallbackTrigger;
pub use http::{HttpClient, OrdersApi};
pub use middleware::SocketMiddleware;
pub use store::{Action, Dispatch, FeedAction, ProfileOrdersAction, SocketAction, Store};
pub use stream::{
    CloseEvent, ConnectionListener, Connector, MemoryConnector, MemorySocket, ReadyState,
    StreamConfig, StreamKind, StreamingConnection, WsConnector,
};

// Re-export shared types for convenience
pub use shared::{FeedSnapshot, Order, OrderStatus};
