use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::{Delivery, Item, Member, OrderItem, OrderStatus};

/// How much of an order to initialize when resolving it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// Member and delivery only; the item collection stays uninitialized
    ToOne,
    /// Member, delivery, order items and their items
    Full,
}

/// An order with its associations resolved through a session.
///
/// This is the entity-shaped view the V1 endpoints expose as-is. An
/// uninitialized item collection serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderGraph {
    pub id: i64,
    pub member: Member,
    pub delivery: Delivery,
    pub order_items: Option<Vec<OrderLine>>,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub total_price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: i64,
    pub item: Item,
    pub order_price: i32,
    pub count: i32,
    pub total_price: i64,
}

impl OrderLine {
    pub fn new(order_item: &OrderItem, item: Item) -> Self {
        Self {
            id: order_item.id,
            item,
            order_price: order_item.order_price,
            count: order_item.count,
            total_price: order_item.total_price(),
        }
    }
}

impl OrderGraph {
    pub fn lines(&self) -> &[OrderLine] {
        self.order_items.as_deref().unwrap_or_default()
    }
}
