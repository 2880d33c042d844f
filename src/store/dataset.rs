use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::domain::{
    Address, Delivery, DeliveryStatus, DomainError, Item, Member, Order, OrderItem, OrderStatus,
};

// ============================================================================
// Dataset - the shop tables as plain rows
// ============================================================================
//
// Rows are keyed by id in BTreeMaps so iteration is already in id order.
// The builder is the only writer in the system and applies the shop's
// ordering rules (stock removal, cancellation) while rows are created.
//
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub members: BTreeMap<i64, Member>,
    pub deliveries: BTreeMap<i64, Delivery>,
    pub items: BTreeMap<i64, Item>,
    pub orders: BTreeMap<i64, Order>,
    pub order_items: BTreeMap<i64, OrderItem>,
}

impl Dataset {
    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    /// Two members with one order of two books each
    pub fn sample(order_date: NaiveDateTime) -> Result<Self, DomainError> {
        let mut builder = Self::builder();

        let user_a = builder.add_member("userA", Address::new("Seoul", "1", "1111"));
        let jpa1 = builder.add_item("JPA1 BOOK", 10000, 100);
        let jpa2 = builder.add_item("JPA2 BOOK", 20000, 100);
        builder.place_order(user_a, &[(jpa1, 1), (jpa2, 2)], order_date)?;

        let user_b = builder.add_member("userB", Address::new("Jinju", "2", "2222"));
        let spring1 = builder.add_item("SPRING1 BOOK", 20000, 200);
        let spring2 = builder.add_item("SPRING2 BOOK", 40000, 300);
        builder.place_order(user_b, &[(spring1, 3), (spring2, 4)], order_date)?;

        Ok(builder.build())
    }

    pub fn order_items_of(&self, order_id: i64) -> impl Iterator<Item = &OrderItem> + '_ {
        self.order_items
            .values()
            .filter(move |order_item| order_item.order_id == order_id)
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Default)]
pub struct DatasetBuilder {
    data: Dataset,
}

fn next_id<T>(table: &BTreeMap<i64, T>) -> i64 {
    table.keys().next_back().map_or(1, |last| last + 1)
}

impl DatasetBuilder {
    pub fn add_member(&mut self, name: impl Into<String>, address: Address) -> i64 {
        let id = next_id(&self.data.members);
        self.data.members.insert(
            id,
            Member {
                id,
                name: name.into(),
                address,
            },
        );
        id
    }

    pub fn add_item(&mut self, name: impl Into<String>, price: i32, stock_quantity: i32) -> i64 {
        let id = next_id(&self.data.items);
        self.data.items.insert(
            id,
            Item {
                id,
                name: name.into(),
                price,
                stock_quantity,
            },
        );
        id
    }

    /// Place an order for `(item id, count)` lines at the items' current
    /// prices, shipped to the member's address. Nothing is written unless
    /// every line is valid and in stock.
    pub fn place_order(
        &mut self,
        member_id: i64,
        lines: &[(i64, i32)],
        order_date: NaiveDateTime,
    ) -> Result<i64, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::EmptyItems);
        }

        let member = self
            .data
            .members
            .get(&member_id)
            .ok_or(DomainError::UnknownMember(member_id))?;
        let address = member.address.clone();

        let order_id = next_id(&self.data.orders);
        let mut next_order_item_id = next_id(&self.data.order_items);
        let mut stock = self.data.items.clone();
        let mut order_items = Vec::with_capacity(lines.len());

        for &(item_id, count) in lines {
            let item = stock.get_mut(&item_id).ok_or(DomainError::UnknownItem(item_id))?;
            let order_item = OrderItem::new(next_order_item_id, order_id, item_id, item.price, count)?;
            item.remove_stock(count)?;
            order_items.push(order_item);
            next_order_item_id += 1;
        }

        let delivery_id = next_id(&self.data.deliveries);
        self.data.deliveries.insert(
            delivery_id,
            Delivery {
                id: delivery_id,
                address,
                status: DeliveryStatus::Ready,
            },
        );
        self.data.orders.insert(
            order_id,
            Order {
                id: order_id,
                member_id,
                delivery_id,
                order_date,
                status: OrderStatus::Ordered,
            },
        );
        for order_item in order_items {
            self.data.order_items.insert(order_item.id, order_item);
        }
        self.data.items = stock;

        Ok(order_id)
    }

    /// Cancel an order and put its stock back; refused once delivered
    pub fn cancel_order(&mut self, order_id: i64) -> Result<(), DomainError> {
        let order = self
            .data
            .orders
            .get(&order_id)
            .ok_or(DomainError::UnknownOrder(order_id))?;

        let delivered = self
            .data
            .deliveries
            .get(&order.delivery_id)
            .is_some_and(|delivery| delivery.status == DeliveryStatus::Comp);
        if delivered {
            return Err(DomainError::AlreadyDelivered(order_id));
        }

        let returned: Vec<(i64, i32)> = self
            .data
            .order_items_of(order_id)
            .map(|order_item| (order_item.item_id, order_item.count))
            .collect();
        for (item_id, count) in returned {
            if let Some(item) = self.data.items.get_mut(&item_id) {
                item.add_stock(count);
            }
        }

        if let Some(order) = self.data.orders.get_mut(&order_id) {
            order.status = OrderStatus::Canceled;
        }
        Ok(())
    }

    pub fn complete_delivery(&mut self, order_id: i64) -> Result<(), DomainError> {
        let delivery_id = self
            .data
            .orders
            .get(&order_id)
            .map(|order| order.delivery_id)
            .ok_or(DomainError::UnknownOrder(order_id))?;

        if let Some(delivery) = self.data.deliveries.get_mut(&delivery_id) {
            delivery.status = DeliveryStatus::Comp;
        }
        Ok(())
    }

    pub fn build(self) -> Dataset {
        self.data
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
