//! Order Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Order status as reported by the kitchen
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Created,
    Pending,
    Done,
    /// Any status string this client does not know about
    #[serde(other)]
    Unknown,
}

/// Order entity as pushed by the feed and returned by the order endpoints
///
/// Orders are immutable once received: a newer message carrying the same
/// `_id` replaces the whole record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Ingredient ids, one entry per item (duplicates allowed)
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub status: OrderStatus,
    /// Missing values deserialize as empty and sort after every dated order
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
    #[serde(default)]
    pub number: u64,
}

impl Order {
    /// Parsed creation time, `None` when the server sent something that is not RFC 3339
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Number of occurrences of an ingredient in this order
    pub fn ingredient_count(&self, ingredient_id: &str) -> usize {
        self.ingredients
            .iter()
            .filter(|id| id.as_str() == ingredient_id)
            .count()
    }

    /// Newest-first comparison by creation time.
    ///
    /// Parseable timestamps compare by instant and come before unparseable
    /// ones; unparseable timestamps compare by their raw text.
    pub fn cmp_newest_first(&self, other: &Self) -> Ordering {
        other
            .created_at_utc()
            .cmp(&self.created_at_utc())
            .then_with(|| other.created_at.cmp(&self.created_at))
    }
}

/// Returns a copy of `orders` sorted newest first. The input is left untouched.
pub fn sorted_newest_first(orders: &[Order]) -> Vec<Order> {
    let mut sorted = orders.to_vec();
    sorted.sort_by(Order::cmp_newest_first);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, created_at: &str) -> Order {
        Order {
            id: id.to_string(),
            name: format!("Order {id}"),
            ingredients: vec![],
            status: OrderStatus::Done,
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
            number: 1,
        }
    }

    #[test]
    fn test_deserialize_wire_order() {
        let json = r#"{
            "_id": "643d69a5c3f7b9001cfa093c",
            "name": "Space burger",
            "ingredients": ["bun", "sauce", "sauce", "bun"],
            "status": "done",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:01.000Z",
            "number": 12345
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, "643d69a5c3f7b9001cfa093c");
        assert_eq!(order.status, OrderStatus::Done);
        assert_eq!(order.number, 12345);
        assert_eq!(order.ingredient_count("sauce"), 2);
        assert!(order.created_at_utc().is_some());
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let json = r#"{"_id":"a","status":"cancelled","createdAt":"t1"}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Unknown);
    }

    #[test]
    fn test_missing_created_at_keeps_order() {
        let json = r#"[
            {"_id": "undated", "number": 1},
            {"_id": "dated", "createdAt": "2024-01-01T00:00:00Z", "number": 2}
        ]"#;

        let orders: Vec<Order> = serde_json::from_str(json).unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders[0].created_at.is_empty());

        let sorted = sorted_newest_first(&orders);
        assert_eq!(sorted[0].id, "dated");
        assert_eq!(sorted[1].id, "undated");
    }

    #[test]
    fn test_sorted_newest_first() {
        let orders = vec![
            order("2", "2024-01-01T00:00:01Z"),
            order("1", "2024-01-01T00:00:02Z"),
            order("3", "2023-12-31T23:59:59Z"),
        ];

        let sorted = sorted_newest_first(&orders);
        let ids: Vec<_> = sorted.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        // input untouched
        assert_eq!(orders[0].id, "2");
    }

    #[test]
    fn test_offsets_compare_by_instant() {
        // 01:00+02:00 is 23:00Z the previous day
        let orders = vec![
            order("early", "2024-01-01T01:00:00+02:00"),
            order("late", "2024-01-01T00:00:00Z"),
        ];
        let sorted = sorted_newest_first(&orders);
        assert_eq!(sorted[0].id, "late");
    }

    #[test]
    fn test_unparseable_timestamps_sort_last() {
        let orders = vec![
            order("a", "t1"),
            order("b", "t2"),
            order("c", "2024-01-01T00:00:00Z"),
        ];
        let sorted = sorted_newest_first(&orders);
        let ids: Vec<_> = sorted.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_equal_timestamps_keep_order() {
        let orders = vec![
            order("x", "2024-01-01T00:00:00Z"),
            order("y", "2024-01-01T00:00:00Z"),
        ];
        let sorted = sorted_newest_first(&orders);
        assert_eq!(sorted[0].id, "x");
        assert_eq!(sorted[1].id, "y");
    }
}
