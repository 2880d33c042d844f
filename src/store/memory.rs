use async_trait::async_trait;

use super::{Dataset, OrderItemJoinRow, OrderStore, OrderWithMemberDelivery, Page, QueryError};
use crate::domain::{Delivery, Item, Member, Order, OrderItem, OrderSearch, SEARCH_RESULT_LIMIT};
use crate::repository::query_dto::{OrderFlatDto, OrderItemQueryDto, OrderQueryDto, OrderSimpleQueryDto};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Answers every query from a read-only Dataset with the same join and
// ordering semantics as the SQL in PgStore. Used when no database is
// configured and throughout the test suite.
//
// ============================================================================

pub struct InMemoryStore {
    data: Dataset,
}

impl InMemoryStore {
    pub fn new(data: Dataset) -> Self {
        Self { data }
    }

    /// orders o join o.member m join o.delivery d
    fn orders_joined(&self) -> impl Iterator<Item = (&Order, &Member, &Delivery)> + '_ {
        self.data.orders.values().filter_map(move |order| {
            let member = self.data.members.get(&order.member_id)?;
            let delivery = self.data.deliveries.get(&order.delivery_id)?;
            Some((order, member, delivery))
        })
    }

    /// order_item oi join oi.item i, for one order
    fn lines_of(&self, order_id: i64) -> impl Iterator<Item = (&OrderItem, &Item)> + '_ {
        self.data.order_items_of(order_id).filter_map(move |order_item| {
            let item = self.data.items.get(&order_item.item_id)?;
            Some((order_item, item))
        })
    }

    fn header(order: &Order, member: &Member, delivery: &Delivery) -> OrderQueryDto {
        OrderQueryDto::header(
            order.id,
            member.name.clone(),
            order.order_date,
            order.status,
            delivery.address.clone(),
        )
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn ping(&self) -> Result<(), QueryError> {
        Ok(())
    }

    async fn find_orders(&self, search: &OrderSearch) -> Result<Vec<Order>, QueryError> {
        Ok(self
            .data
            .orders
            .values()
            .filter(|order| {
                self.data
                    .members
                    .get(&order.member_id)
                    .is_some_and(|member| search.matches(order, member))
            })
            .take(SEARCH_RESULT_LIMIT)
            .cloned()
            .collect())
    }

    async fn find_member(&self, id: i64) -> Result<Option<Member>, QueryError> {
        Ok(self.data.members.get(&id).cloned())
    }

    async fn find_delivery(&self, id: i64) -> Result<Option<Delivery>, QueryError> {
        Ok(self.data.deliveries.get(&id).cloned())
    }

    async fn find_items(&self, ids: &[i64]) -> Result<Vec<Item>, QueryError> {
        Ok(self
            .data
            .items
            .values()
            .filter(|item| ids.contains(&item.id))
            .cloned()
            .collect())
    }

    async fn find_order_items(&self, order_ids: &[i64]) -> Result<Vec<OrderItem>, QueryError> {
        Ok(self
            .data
            .order_items
            .values()
            .filter(|order_item| order_ids.contains(&order_item.order_id))
            .cloned()
            .collect())
    }

    async fn find_orders_with_member_delivery(
        &self,
        page: Option<Page>,
    ) -> Result<Vec<OrderWithMemberDelivery>, QueryError> {
        let (offset, limit) = match page {
            Some(page) => (page.offset as usize, page.limit as usize),
            None => (0, usize::MAX),
        };

        Ok(self
            .orders_joined()
            .skip(offset)
            .take(limit)
            .map(|(order, member, delivery)| OrderWithMemberDelivery {
                order: order.clone(),
                member: member.clone(),
                delivery: delivery.clone(),
            })
            .collect())
    }

    async fn find_orders_with_items(&self) -> Result<Vec<OrderItemJoinRow>, QueryError> {
        let mut rows = Vec::new();
        for (order, member, delivery) in self.orders_joined() {
            for (order_item, item) in self.lines_of(order.id) {
                rows.push(OrderItemJoinRow {
                    order: order.clone(),
                    member: member.clone(),
                    delivery: delivery.clone(),
                    order_item: order_item.clone(),
                    item: item.clone(),
                });
            }
        }
        Ok(rows)
    }

    async fn find_order_query_dtos(&self) -> Result<Vec<OrderQueryDto>, QueryError> {
        Ok(self
            .orders_joined()
            .map(|(order, member, delivery)| Self::header(order, member, delivery))
            .collect())
    }

    async fn find_order_item_query_dtos(&self, order_ids: &[i64]) -> Result<Vec<OrderItemQueryDto>, QueryError> {
        Ok(self
            .data
            .order_items
            .values()
            .filter(|order_item| order_ids.contains(&order_item.order_id))
            .filter_map(|order_item| {
                let item = self.data.items.get(&order_item.item_id)?;
                Some(OrderItemQueryDto {
                    order_id: order_item.order_id,
                    item_name: item.name.clone(),
                    order_price: order_item.order_price,
                    count: order_item.count,
                })
            })
            .collect())
    }

    async fn find_order_flats(&self) -> Result<Vec<OrderFlatDto>, QueryError> {
        let mut rows = Vec::new();
        for (order, member, delivery) in self.orders_joined() {
            for (order_item, item) in self.lines_of(order.id) {
                rows.push(OrderFlatDto {
                    order_id: order.id,
                    name: member.name.clone(),
                    order_date: order.order_date,
                    order_status: order.status,
                    address: delivery.address.clone(),
                    item_name: item.name.clone(),
                    order_price: order_item.order_price,
                    count: order_item.count,
                });
            }
        }
        Ok(rows)
    }

    async fn find_order_simple_query_dtos(&self) -> Result<Vec<OrderSimpleQueryDto>, QueryError> {
        Ok(self
            .orders_joined()
            .map(|(order, member, delivery)| OrderSimpleQueryDto {
                order_id: order.id,
                name: member.name.clone(),
                order_date: order.order_date,
                order_status: order.status,
                address: delivery.address.clone(),
            })
            .collect())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, OrderStatus};
    use chrono::{NaiveDate, NaiveDateTime};

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn sample_store() -> InMemoryStore {
        InMemoryStore::new(Dataset::sample(date()).unwrap())
    }

    #[tokio::test]
    async fn test_find_orders_filters_by_member_and_status() {
        let store = sample_store();

        let all = store.find_orders(&OrderSearch::default()).await.unwrap();
        assert_eq!(all.iter().map(|o| o.id).collect::<Vec<_>>(), vec![1, 2]);

        let user_b = store
            .find_orders(&OrderSearch {
                member_name: Some("userB".to_string()),
                order_status: None,
            })
            .await
            .unwrap();
        assert_eq!(user_b.len(), 1);
        assert_eq!(user_b[0].member_id, 2);

        let canceled = store
            .find_orders(&OrderSearch {
                member_name: None,
                order_status: Some(OrderStatus::Canceled),
            })
            .await
            .unwrap();
        assert!(canceled.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_capped() {
        let mut builder = Dataset::builder();
        let member = builder.add_member("userA", Address::new("Seoul", "1", "1111"));
        let book = builder.add_item("JPA1 BOOK", 10000, 10_000);
        for _ in 0..SEARCH_RESULT_LIMIT + 5 {
            builder.place_order(member, &[(book, 1)], date()).unwrap();
        }
        let store = InMemoryStore::new(builder.build());

        let orders = store.find_orders(&OrderSearch::default()).await.unwrap();

        assert_eq!(orders.len(), SEARCH_RESULT_LIMIT);
        assert_eq!(orders.len(), 1000);
        assert_eq!(orders.last().map(|o| o.id), Some(1000));
    }

    #[tokio::test]
    async fn test_member_name_wildcards_match_literally() {
        let store = sample_store();

        for wildcard in ["_", "%", "user_"] {
            let found = store
                .find_orders(&OrderSearch {
                    member_name: Some(wildcard.to_string()),
                    order_status: None,
                })
                .await
                .unwrap();
            assert!(found.is_empty(), "{} matched", wildcard);
        }
    }

    #[tokio::test]
    async fn test_collection_join_duplicates_parent_rows() {
        let store = sample_store();

        let rows = store.find_orders_with_items().await.unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows.iter().filter(|r| r.order.id == 1).count(), 2);
        assert_eq!(rows[0].item.name, "JPA1 BOOK");
        assert_eq!(rows[3].item.name, "SPRING2 BOOK");
    }

    #[tokio::test]
    async fn test_to_one_join_respects_page() {
        let store = sample_store();

        let page = store
            .find_orders_with_member_delivery(Some(Page::new(1, 1)))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].order.id, 2);
        assert_eq!(page[0].member.name, "userB");

        let past_end = store
            .find_orders_with_member_delivery(Some(Page::new(5, 10)))
            .await
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_item_projection_uses_in_list() {
        let store = sample_store();

        let items = store.find_order_item_query_dtos(&[2]).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.order_id == 2));

        let both = store.find_order_item_query_dtos(&[1, 2]).await.unwrap();
        assert_eq!(both.len(), 4);
    }

    #[tokio::test]
    async fn test_flat_rows_carry_delivery_address() {
        let store = sample_store();

        let flats = store.find_order_flats().await.unwrap();
        assert_eq!(flats.len(), 4);
        assert_eq!(flats[2].address, Address::new("Jinju", "2", "2222"));
        assert_eq!(flats[2].count, 3);
    }

    #[tokio::test]
    async fn test_orders_without_items_drop_out_of_inner_joins() {
        let mut builder = Dataset::builder();
        let member = builder.add_member("userA", Address::new("Seoul", "1", "1111"));
        let book = builder.add_item("JPA1 BOOK", 10000, 10);
        builder.place_order(member, &[(book, 1)], date()).unwrap();
        let mut data = builder.build();
        data.order_items.clear();
        let store = InMemoryStore::new(data);

        assert!(store.find_order_flats().await.unwrap().is_empty());
        assert!(store.find_orders_with_items().await.unwrap().is_empty());
        assert_eq!(store.find_order_query_dtos().await.unwrap().len(), 1);
    }
}
