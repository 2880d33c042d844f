use std::collections::HashMap;

use super::query_dto::{OrderFlatDto, OrderItemQueryDto, OrderQueryDto};
use crate::session::Session;
use crate::store::QueryError;

// ============================================================================
// Order Query Repository - projections straight into DTOs
// ============================================================================
//
// No entities are loaded; rows come back already shaped for the API.
// - find_order_query_dtos: headers, then one item query per order (1 + N)
// - find_all_by_dto_optimization: headers, then one IN-list query (1 + 1)
// - find_all_by_dto_flat: one joined query, one row per item (1)
//
// ============================================================================

pub struct OrderQueryRepository<'s> {
    session: &'s mut Session,
}

impl<'s> OrderQueryRepository<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self { session }
    }

    pub async fn find_order_query_dtos(&mut self) -> Result<Vec<OrderQueryDto>, QueryError> {
        let mut orders = self.find_orders().await?;

        for order in &mut orders {
            order.order_items = self.find_order_items(order.order_id).await?;
        }

        Ok(orders)
    }

    pub async fn find_all_by_dto_optimization(&mut self) -> Result<Vec<OrderQueryDto>, QueryError> {
        let mut orders = self.find_orders().await?;
        if orders.is_empty() {
            return Ok(orders);
        }

        let order_ids: Vec<i64> = orders.iter().map(|order| order.order_id).collect();
        let mut items_by_order = self.find_order_item_map(&order_ids).await?;

        for order in &mut orders {
            order.order_items = items_by_order.remove(&order.order_id).unwrap_or_default();
        }

        Ok(orders)
    }

    pub async fn find_all_by_dto_flat(&mut self) -> Result<Vec<OrderFlatDto>, QueryError> {
        let store = self.session.execute("order_query.flat")?;
        store.find_order_flats().await
    }

    async fn find_orders(&mut self) -> Result<Vec<OrderQueryDto>, QueryError> {
        let store = self.session.execute("order_query.orders")?;
        store.find_order_query_dtos().await
    }

    async fn find_order_items(&mut self, order_id: i64) -> Result<Vec<OrderItemQueryDto>, QueryError> {
        let store = self.session.execute("order_query.items_by_order")?;
        store.find_order_item_query_dtos(&[order_id]).await
    }

    async fn find_order_item_map(&mut self, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderItemQueryDto>>, QueryError> {
        let store = self.session.execute("order_query.items_in")?;
        let items = store.find_order_item_query_dtos(order_ids).await?;

        let mut items_by_order: HashMap<i64, Vec<OrderItemQueryDto>> = HashMap::new();
        for item in items {
            items_by_order.entry(item.order_id).or_default().push(item);
        }
        Ok(items_by_order)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Dataset, InMemoryStore, OrderStore};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn store() -> Arc<dyn OrderStore> {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
        Arc::new(InMemoryStore::new(Dataset::sample(date).unwrap()))
    }

    #[tokio::test]
    async fn test_one_plus_n() {
        let mut session = Session::new(store());

        let orders = OrderQueryRepository::new(&mut session).find_order_query_dtos().await.unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_items.len(), 2);
        assert_eq!(orders[1].order_items[0].item_name, "SPRING1 BOOK");
        assert_eq!(session.query_count(), 3);
    }

    #[tokio::test]
    async fn test_one_plus_one() {
        let mut session = Session::new(store());

        let orders = OrderQueryRepository::new(&mut session)
            .find_all_by_dto_optimization()
            .await
            .unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_items[1].item_name, "JPA2 BOOK");
        assert_eq!(session.query_log(), &["order_query.orders", "order_query.items_in"]);
    }

    #[tokio::test]
    async fn test_optimization_skips_item_query_without_orders() {
        let mut session = Session::new(Arc::new(InMemoryStore::new(Dataset::default())));

        let orders = OrderQueryRepository::new(&mut session)
            .find_all_by_dto_optimization()
            .await
            .unwrap();

        assert!(orders.is_empty());
        assert_eq!(session.query_count(), 1);
    }

    #[tokio::test]
    async fn test_flat_is_one_query_with_duplicated_parents() {
        let mut session = Session::new(store());

        let flats = OrderQueryRepository::new(&mut session).find_all_by_dto_flat().await.unwrap();

        assert_eq!(flats.len(), 4);
        assert_eq!(session.query_count(), 1);
    }
}
