use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::{Address, OrderStatus};

// ============================================================================
// Query DTOs - rows produced directly by projection queries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQueryDto {
    pub order_id: i64,
    pub name: String,
    pub order_date: NaiveDateTime,
    pub order_status: OrderStatus,
    pub address: Address,
    pub order_items: Vec<OrderItemQueryDto>,
}

impl OrderQueryDto {
    /// Header row without items; the item list is filled by a follow-up query
    pub fn header(order_id: i64, name: String, order_date: NaiveDateTime, order_status: OrderStatus, address: Address) -> Self {
        Self {
            order_id,
            name,
            order_date,
            order_status,
            address,
            order_items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemQueryDto {
    #[serde(skip)]
    pub order_id: i64,
    pub item_name: String,
    pub order_price: i32,
    pub count: i32,
}

/// One row of the single flat join: order columns repeated per item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFlatDto {
    pub order_id: i64,
    pub name: String,
    pub order_date: NaiveDateTime,
    pub order_status: OrderStatus,
    pub address: Address,
    pub item_name: String,
    pub order_price: i32,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSimpleQueryDto {
    pub order_id: i64,
    pub name: String,
    pub order_date: NaiveDateTime,
    pub order_status: OrderStatus,
    pub address: Address,
}

// ============================================================================
// Flat Row Regrouping
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OrderGroupKey {
    order_id: i64,
    name: String,
    order_date: NaiveDateTime,
    order_status: OrderStatus,
    address: Address,
}

impl From<&OrderFlatDto> for OrderGroupKey {
    fn from(row: &OrderFlatDto) -> Self {
        Self {
            order_id: row.order_id,
            name: row.name.clone(),
            order_date: row.order_date,
            order_status: row.order_status,
            address: row.address.clone(),
        }
    }
}

/// Regroup flat join rows into one OrderQueryDto per parent key.
///
/// Groups come out in the order their first row was seen, and each group's
/// items keep the row order.
pub fn group_flat_rows(rows: &[OrderFlatDto]) -> Vec<OrderQueryDto> {
    let mut positions: HashMap<OrderGroupKey, usize> = HashMap::new();
    let mut groups: Vec<OrderQueryDto> = Vec::new();

    for row in rows {
        let key = OrderGroupKey::from(row);
        let position = *positions.entry(key).or_insert_with(|| {
            groups.push(OrderQueryDto::header(
                row.order_id,
                row.name.clone(),
                row.order_date,
                row.order_status,
                row.address.clone(),
            ));
            groups.len() - 1
        });

        groups[position].order_items.push(OrderItemQueryDto {
            order_id: row.order_id,
            item_name: row.item_name.clone(),
            order_price: row.order_price,
            count: row.count,
        });
    }

    groups
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 30, 0).unwrap()
    }

    fn flat(order_id: i64, name: &str, item_name: &str, order_price: i32, count: i32) -> OrderFlatDto {
        OrderFlatDto {
            order_id,
            name: name.to_string(),
            order_date: date(),
            order_status: OrderStatus::Ordered,
            address: Address::new("Seoul", "1", "1111"),
            item_name: item_name.to_string(),
            order_price,
            count,
        }
    }

    fn item_tuples(group: &OrderQueryDto) -> Vec<(String, i32, i32)> {
        group
            .order_items
            .iter()
            .map(|i| (i.item_name.clone(), i.order_price, i.count))
            .collect()
    }

    #[test]
    fn test_two_orders_yield_two_groups() {
        let rows = vec![flat(1, "userA", "book", 10000, 2), flat(2, "userB", "pen", 1000, 5)];

        let groups = group_flat_rows(&rows);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].order_id, 1);
        assert_eq!(item_tuples(&groups[0]), vec![("book".to_string(), 10000, 2)]);
        assert_eq!(groups[1].order_id, 2);
        assert_eq!(item_tuples(&groups[1]), vec![("pen".to_string(), 1000, 5)]);
    }

    #[test]
    fn test_duplicated_parent_rows_collapse() {
        let rows = vec![
            flat(1, "userA", "JPA1 BOOK", 10000, 1),
            flat(1, "userA", "JPA2 BOOK", 20000, 2),
            flat(2, "userB", "SPRING1 BOOK", 20000, 3),
            flat(2, "userB", "SPRING2 BOOK", 40000, 4),
        ];

        let groups = group_flat_rows(&rows);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].order_items.len(), 2);
        assert_eq!(groups[1].order_items.len(), 2);
        assert_eq!(groups[1].order_items[1].item_name, "SPRING2 BOOK");
    }

    #[test]
    fn test_first_seen_order_is_preserved() {
        let rows = vec![
            flat(9, "userZ", "a", 1, 1),
            flat(3, "userC", "b", 1, 1),
            flat(9, "userZ", "c", 1, 1),
        ];

        let ids: Vec<i64> = group_flat_rows(&rows).iter().map(|g| g.order_id).collect();
        assert_eq!(ids, vec![9, 3]);
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let rows = vec![
            flat(1, "userA", "book", 10000, 2),
            flat(2, "userB", "pen", 1000, 5),
            flat(1, "userA", "mug", 5000, 1),
        ];

        assert_eq!(group_flat_rows(&rows), group_flat_rows(&rows));
    }

    #[test]
    fn test_empty_rows_give_no_groups() {
        assert!(group_flat_rows(&[]).is_empty());
    }

    #[test]
    fn test_item_order_id_is_not_serialized() {
        let item = OrderItemQueryDto {
            order_id: 1,
            item_name: "book".to_string(),
            order_price: 10000,
            count: 2,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("orderId").is_none());
        assert_eq!(json["itemName"], "book");
        assert_eq!(json["orderPrice"], 10000);
    }
}
