//! Data models
//!
//! Shared between the push frames and the pull API responses.

pub mod order;

// Re-exports
pub use order::*;
