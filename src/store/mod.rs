// ============================================================================
// Store - primitive queries over the shop tables
// ============================================================================
//
// The OrderStore trait is the seam between the query layer and the database.
// Every method is exactly one round trip; the Session counts them.
//
// Ordering is explicit everywhere: orders by order id, order items by
// order item id. Join queries are inner joins.
//
// Implementations:
// - PgStore: PostgreSQL through a sqlx connection pool
// - InMemoryStore: an in-process Dataset
//
// ============================================================================

mod errors;
pub mod dataset;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Delivery, Item, Member, Order, OrderItem, OrderSearch};
use crate::repository::query_dto::{OrderFlatDto, OrderItemQueryDto, OrderQueryDto, OrderSimpleQueryDto};

pub use dataset::{Dataset, DatasetBuilder};
pub use errors::QueryError;
pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Offset/limit window over orders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }
}

/// Order joined with its to-one associations
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWithMemberDelivery {
    pub order: Order,
    pub member: Member,
    pub delivery: Delivery,
}

/// One row of the collection fetch join: the order part repeats per item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemJoinRow {
    pub order: Order,
    pub member: Member,
    pub delivery: Delivery,
    pub order_item: OrderItem,
    pub item: Item,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Cheap liveness probe for the health endpoint
    async fn ping(&self) -> Result<(), QueryError>;

    /// Plain orders matching the search, capped at SEARCH_RESULT_LIMIT
    async fn find_orders(&self, search: &OrderSearch) -> Result<Vec<Order>, QueryError>;

    async fn find_member(&self, id: i64) -> Result<Option<Member>, QueryError>;

    async fn find_delivery(&self, id: i64) -> Result<Option<Delivery>, QueryError>;

    /// Items by id, one IN-list query
    async fn find_items(&self, ids: &[i64]) -> Result<Vec<Item>, QueryError>;

    /// Order items of the given orders, one IN-list query
    async fn find_order_items(&self, order_ids: &[i64]) -> Result<Vec<OrderItem>, QueryError>;

    /// Orders with member and delivery joined in, optionally paged
    async fn find_orders_with_member_delivery(
        &self,
        page: Option<Page>,
    ) -> Result<Vec<OrderWithMemberDelivery>, QueryError>;

    /// Orders joined with member, delivery, order items and items
    async fn find_orders_with_items(&self) -> Result<Vec<OrderItemJoinRow>, QueryError>;

    /// Order headers projected straight into OrderQueryDto, items empty
    async fn find_order_query_dtos(&self) -> Result<Vec<OrderQueryDto>, QueryError>;

    /// Item projections for the given orders
    async fn find_order_item_query_dtos(&self, order_ids: &[i64]) -> Result<Vec<OrderItemQueryDto>, QueryError>;

    /// Single flat join, one row per order item
    async fn find_order_flats(&self) -> Result<Vec<OrderFlatDto>, QueryError>;

    async fn find_order_simple_query_dtos(&self) -> Result<Vec<OrderSimpleQueryDto>, QueryError>;
}
