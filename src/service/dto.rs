use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::{Address, OrderStatus};
use crate::session::{OrderGraph, OrderLine};

// ============================================================================
// Order DTOs - built from resolved entity graphs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub order_id: i64,
    pub name: String,
    pub order_date: NaiveDateTime,
    pub order_status: OrderStatus,
    pub address: Address,
    pub order_items: Vec<OrderItemDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub item_name: String,
    pub order_price: i32,
    pub count: i32,
}

impl From<&OrderLine> for OrderItemDto {
    fn from(line: &OrderLine) -> Self {
        Self {
            item_name: line.item.name.clone(),
            order_price: line.order_price,
            count: line.count,
        }
    }
}

impl From<&OrderGraph> for OrderDto {
    fn from(graph: &OrderGraph) -> Self {
        Self {
            order_id: graph.id,
            name: graph.member.name.clone(),
            order_date: graph.order_date,
            order_status: graph.status,
            address: graph.delivery.address.clone(),
            order_items: graph.lines().iter().map(OrderItemDto::from).collect(),
        }
    }
}
