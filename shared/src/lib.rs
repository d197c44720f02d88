//! Shared types for the burger storefront
//!
//! Order models, push-stream frames and pull API bodies used by the
//! client core and by test servers.

pub mod message;
pub mod models;
pub mod response;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{FeedFrame, FeedSnapshot, Frame, FrameError, ProfileOrders, ProfileOrdersFrame};
pub use models::{Order, OrderStatus, sorted_newest_first};
