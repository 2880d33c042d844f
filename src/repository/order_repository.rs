use std::collections::HashSet;

use crate::domain::{Order, OrderSearch};
use crate::session::Session;
use crate::store::{Page, QueryError};

// ============================================================================
// Order Repository - entity queries
// ============================================================================
//
// Loads Order entities into the session. What else ends up in the identity
// map depends on the method:
// - find_all_by_search: nothing, associations load lazily afterwards
// - find_all_with_member_delivery: member and delivery (to-one fetch join)
// - find_all_with_item: member, delivery, order items and items
//   (collection fetch join, parent rows deduplicated here)
//
// ============================================================================

pub struct OrderRepository<'s> {
    session: &'s mut Session,
}

impl<'s> OrderRepository<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self { session }
    }

    pub async fn find_all_by_search(&mut self, search: &OrderSearch) -> Result<Vec<Order>, QueryError> {
        let store = self.session.execute("orders.search")?;
        let orders = store.find_orders(search).await?;

        for order in &orders {
            self.session.register_order(order);
        }

        tracing::debug!(orders = orders.len(), "Loaded orders by search");
        Ok(orders)
    }

    pub async fn find_all_with_member_delivery(&mut self, page: Option<Page>) -> Result<Vec<Order>, QueryError> {
        let store = self.session.execute("orders.with_member_delivery")?;
        let rows = store.find_orders_with_member_delivery(page).await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            self.session.register_order(&row.order);
            self.session.register_member(row.member);
            self.session.register_delivery(row.delivery);
            orders.push(row.order);
        }

        tracing::debug!(orders = orders.len(), page = ?page, "Loaded orders with member and delivery");
        Ok(orders)
    }

    /// One row comes back per order item; orders are returned once each in
    /// first-seen order
    pub async fn find_all_with_item(&mut self) -> Result<Vec<Order>, QueryError> {
        let store = self.session.execute("orders.with_items")?;
        let rows = store.find_orders_with_items().await?;
        let row_count = rows.len();

        let mut seen = HashSet::new();
        let mut orders = Vec::new();
        for row in rows {
            self.session.register_order(&row.order);
            self.session.register_member(row.member);
            self.session.register_delivery(row.delivery);
            self.session.register_item(row.item);
            self.session.register_order_item(row.order_item);

            if seen.insert(row.order.id) {
                orders.push(row.order);
            }
        }

        tracing::debug!(rows = row_count, orders = orders.len(), "Deduplicated collection fetch join");
        Ok(orders)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
