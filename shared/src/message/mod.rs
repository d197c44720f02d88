//! Push-stream frame types
//!
//! Both order streams push JSON objects carrying a `success` flag. On
//! success the feed frame holds a full snapshot (orders plus counters)
//! and the profile frame holds the user's order list; on failure the
//! server may include a human readable `message`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::Order;

/// Errors raised while interpreting a frame that was valid JSON
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame has no boolean `success` field")]
    MissingSuccess,

    #[error("frame body does not match the expected shape: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

/// Feed snapshot: replaces the previous one in full
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub orders: Vec<Order>,
    pub total: u64,
    #[serde(rename = "totalToday")]
    pub total_today: u64,
}

/// Profile order set: replaces the previous one in full
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileOrders {
    pub orders: Vec<Order>,
}

/// A decoded push frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<T> {
    Success(T),
    Failure { message: Option<String> },
}

/// Frame decoded from the global feed stream
pub type FeedFrame = Frame<FeedSnapshot>;

/// Frame decoded from the per-user orders stream
pub type ProfileOrdersFrame = Frame<ProfileOrders>;

impl<T: for<'de> Deserialize<'de>> Frame<T> {
    /// Decode a frame from an already parsed JSON value
    pub fn from_value(value: &Value) -> Result<Self, FrameError> {
        let success = value
            .get("success")
            .and_then(Value::as_bool)
            .ok_or(FrameError::MissingSuccess)?;

        if success {
            Ok(Frame::Success(T::deserialize(value)?))
        } else {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(Frame::Failure { message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feed_frame_success() {
        let value = json!({
            "success": true,
            "orders": [{"_id": "a", "createdAt": "2024-01-01T00:00:00Z", "number": 1}],
            "total": 100,
            "totalToday": 10
        });

        match FeedFrame::from_value(&value).unwrap() {
            Frame::Success(snapshot) => {
                assert_eq!(snapshot.orders.len(), 1);
                assert_eq!(snapshot.total, 100);
                assert_eq!(snapshot.total_today, 10);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_feed_frame_keeps_undated_order() {
        let value = json!({
            "success": true,
            "orders": [
                {"_id": "a", "number": 1},
                {"_id": "b", "createdAt": "2024-01-01T00:00:00Z", "number": 2}
            ],
            "total": 2,
            "totalToday": 2
        });

        match FeedFrame::from_value(&value).unwrap() {
            Frame::Success(snapshot) => assert_eq!(snapshot.orders.len(), 2),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_profile_frame_failure_message() {
        let value = json!({"success": false, "message": "Invalid or missing token"});
        let frame = ProfileOrdersFrame::from_value(&value).unwrap();
        assert_eq!(
            frame,
            Frame::Failure {
                message: Some("Invalid or missing token".to_string())
            }
        );
    }

    #[test]
    fn test_missing_success_flag() {
        let value = json!({"orders": []});
        assert!(matches!(
            FeedFrame::from_value(&value),
            Err(FrameError::MissingSuccess)
        ));
    }

    #[test]
    fn test_success_with_missing_counters() {
        let value = json!({"success": true, "orders": []});
        assert!(matches!(
            FeedFrame::from_value(&value),
            Err(FrameError::InvalidBody(_))
        ));
    }
}
