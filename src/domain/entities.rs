use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::value_objects::{Address, DeliveryStatus, OrderStatus};

// ============================================================================
// Shop Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: i64,
    pub address: Address,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub price: i32,
    pub stock_quantity: i32,
}

impl Item {
    pub fn add_stock(&mut self, quantity: i32) {
        self.stock_quantity += quantity;
    }

    pub fn remove_stock(&mut self, quantity: i32) -> Result<(), DomainError> {
        let rest = self.stock_quantity - quantity;
        if rest < 0 {
            return Err(DomainError::NotEnoughStock {
                item_id: self.id,
                requested: quantity,
                available: self.stock_quantity,
            });
        }
        self.stock_quantity = rest;
        Ok(())
    }
}

/// Order row. Member, delivery and items are reached through ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub member_id: i64,
    pub delivery_id: i64,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub item_id: i64,
    pub order_price: i32,
    pub count: i32,
}

impl OrderItem {
    pub fn new(id: i64, order_id: i64, item_id: i64, order_price: i32, count: i32) -> Result<Self, DomainError> {
        if count <= 0 {
            return Err(DomainError::InvalidQuantity(count));
        }

        Ok(Self {
            id,
            order_id,
            item_id,
            order_price,
            count,
        })
    }

    pub fn total_price(&self) -> i64 {
        i64::from(self.order_price) * i64::from(self.count)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
