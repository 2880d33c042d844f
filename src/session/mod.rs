// ============================================================================
// Session - request-scoped persistence context
// ============================================================================
//
// A Session sits between the repositories and an OrderStore for the
// lifetime of one request:
// - Identity map: each member, delivery, item and order-item collection is
//   loaded at most once per session
// - Lazy loading: associations are fetched on first access
// - Batch fetching: with a batch size > 1, a miss on a collection or item
//   loads it together with other uninitialized ones in one IN-list query
// - Query log: every round trip is recorded by name
//
// Once closed, anything already in the identity map stays readable and
// everything else fails with a lazy-initialization fault.
//
// ============================================================================

mod graph;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Delivery, Item, Member, Order, OrderItem};
use crate::store::{OrderStore, QueryError};

pub use graph::{Fetch, OrderGraph, OrderLine};

pub struct Session {
    id: Uuid,
    store: Arc<dyn OrderStore>,
    batch_fetch_size: usize,
    open: bool,
    query_log: Vec<&'static str>,

    // Orders seen by this session, in the order they were loaded
    known_orders: Vec<i64>,
    known_order_ids: HashSet<i64>,

    members: HashMap<i64, Member>,
    deliveries: HashMap<i64, Delivery>,
    items: HashMap<i64, Item>,
    collections: HashMap<i64, Vec<OrderItem>>,
    loaded_order_items: HashSet<i64>,
}

impl Session {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        let id = Uuid::now_v7();
        tracing::debug!(session_id = %id, "Session opened");

        Self {
            id,
            store,
            batch_fetch_size: 1,
            open: true,
            query_log: Vec::new(),
            known_orders: Vec::new(),
            known_order_ids: HashSet::new(),
            members: HashMap::new(),
            deliveries: HashMap::new(),
            items: HashMap::new(),
            collections: HashMap::new(),
            loaded_order_items: HashSet::new(),
        }
    }

    /// Load up to `size` uninitialized collections (or items) per query.
    /// A size of 1 is plain lazy loading.
    pub fn with_batch_fetch_size(mut self, size: usize) -> Self {
        self.batch_fetch_size = size.max(1);
        self
    }

    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            tracing::debug!(
                session_id = %self.id,
                queries = self.query_log.len(),
                "Session closed"
            );
        }
    }

    pub fn query_count(&self) -> usize {
        self.query_log.len()
    }

    pub fn query_log(&self) -> &[&'static str] {
        &self.query_log
    }

    /// Record a round trip and hand out the store to run it on
    pub(crate) fn execute(&mut self, query: &'static str) -> Result<Arc<dyn OrderStore>, QueryError> {
        if !self.open {
            return Err(QueryError::SessionClosed { query });
        }

        self.query_log.push(query);
        tracing::trace!(session_id = %self.id, query = query, "Executing query");
        Ok(self.store.clone())
    }

    fn ensure_open(&self, entity: &'static str, id: i64) -> Result<(), QueryError> {
        if self.open {
            Ok(())
        } else {
            Err(QueryError::LazyInitialization { entity, id })
        }
    }

    // ========================================================================
    // Identity map registration (used by fetch-join queries)
    // ========================================================================

    pub(crate) fn register_order(&mut self, order: &Order) {
        if self.known_order_ids.insert(order.id) {
            self.known_orders.push(order.id);
        }
    }

    pub(crate) fn register_member(&mut self, member: Member) {
        self.members.entry(member.id).or_insert(member);
    }

    pub(crate) fn register_delivery(&mut self, delivery: Delivery) {
        self.deliveries.entry(delivery.id).or_insert(delivery);
    }

    pub(crate) fn register_item(&mut self, item: Item) {
        self.items.entry(item.id).or_insert(item);
    }

    /// Add one element of a fetch-joined collection, marking it initialized
    pub(crate) fn register_order_item(&mut self, order_item: OrderItem) {
        let collection = self.collections.entry(order_item.order_id).or_default();
        if self.loaded_order_items.insert(order_item.id) {
            collection.push(order_item);
        }
    }

    // ========================================================================
    // Lazy association access
    // ========================================================================

    pub async fn member(&mut self, id: i64) -> Result<Member, QueryError> {
        if let Some(member) = self.members.get(&id) {
            return Ok(member.clone());
        }
        self.ensure_open("Member", id)?;

        let store = self.execute("member.by_id")?;
        let member = store
            .find_member(id)
            .await?
            .ok_or(QueryError::NotFound { entity: "Member", id })?;

        self.members.insert(id, member.clone());
        Ok(member)
    }

    pub async fn delivery(&mut self, id: i64) -> Result<Delivery, QueryError> {
        if let Some(delivery) = self.deliveries.get(&id) {
            return Ok(delivery.clone());
        }
        self.ensure_open("Delivery", id)?;

        let store = self.execute("delivery.by_id")?;
        let delivery = store
            .find_delivery(id)
            .await?
            .ok_or(QueryError::NotFound { entity: "Delivery", id })?;

        self.deliveries.insert(id, delivery.clone());
        Ok(delivery)
    }

    pub async fn order_items(&mut self, order_id: i64) -> Result<Vec<OrderItem>, QueryError> {
        if let Some(collection) = self.collections.get(&order_id) {
            return Ok(collection.clone());
        }
        self.ensure_open("OrderItem collection", order_id)?;

        let order_ids = self.uninitialized_collections(order_id);
        let query = if order_ids.len() > 1 { "order_items.batch" } else { "order_items.by_order" };
        let store = self.execute(query)?;
        let loaded = store.find_order_items(&order_ids).await?;

        for id in &order_ids {
            self.collections.entry(*id).or_default();
        }
        for order_item in loaded {
            self.register_order_item(order_item);
        }

        Ok(self.collections.get(&order_id).cloned().unwrap_or_default())
    }

    pub async fn item(&mut self, id: i64) -> Result<Item, QueryError> {
        if let Some(item) = self.items.get(&id) {
            return Ok(item.clone());
        }
        self.ensure_open("Item", id)?;

        let item_ids = self.uninitialized_items(id);
        let query = if item_ids.len() > 1 { "item.batch" } else { "item.by_id" };
        let store = self.execute(query)?;
        for item in store.find_items(&item_ids).await? {
            self.register_item(item);
        }

        self.items
            .get(&id)
            .cloned()
            .ok_or(QueryError::NotFound { entity: "Item", id })
    }

    /// Requested order first, then other known orders whose collection is
    /// still uninitialized, up to the batch size
    fn uninitialized_collections(&self, order_id: i64) -> Vec<i64> {
        let mut ids = vec![order_id];
        ids.extend(
            self.known_orders
                .iter()
                .copied()
                .filter(|id| *id != order_id && !self.collections.contains_key(id))
                .take(self.batch_fetch_size - 1),
        );
        ids
    }

    /// Requested item first, then items referenced by loaded collections
    /// that are not in the identity map yet, up to the batch size
    fn uninitialized_items(&self, item_id: i64) -> Vec<i64> {
        let mut ids = vec![item_id];
        if self.batch_fetch_size == 1 {
            return ids;
        }

        let referenced = self
            .known_orders
            .iter()
            .filter_map(|order_id| self.collections.get(order_id))
            .flatten()
            .map(|order_item| order_item.item_id);

        for candidate in referenced {
            if ids.len() >= self.batch_fetch_size {
                break;
            }
            if !ids.contains(&candidate) && !self.items.contains_key(&candidate) {
                ids.push(candidate);
            }
        }
        ids
    }

    // ========================================================================
    // Graph resolution
    // ========================================================================

    /// Initialize an order's associations and return them as one graph
    pub async fn resolve(&mut self, order: &Order, fetch: Fetch) -> Result<OrderGraph, QueryError> {
        self.register_order(order);

        let member = self.member(order.member_id).await?;
        let delivery = self.delivery(order.delivery_id).await?;

        let order_items = match fetch {
            Fetch::ToOne => None,
            Fetch::Full => {
                let mut lines = Vec::new();
                for order_item in self.order_items(order.id).await? {
                    let item = self.item(order_item.item_id).await?;
                    lines.push(OrderLine::new(&order_item, item));
                }
                Some(lines)
            }
        };
        let total_price = order_items
            .as_ref()
            .map(|lines| lines.iter().map(|line| line.total_price).sum());

        Ok(OrderGraph {
            id: order.id,
            member,
            delivery,
            order_items,
            order_date: order.order_date,
            status: order.status,
            total_price,
        })
    }

    pub async fn resolve_all(&mut self, orders: &[Order], fetch: Fetch) -> Result<Vec<OrderGraph>, QueryError> {
        let mut graphs = Vec::with_capacity(orders.len());
        for order in orders {
            graphs.push(self.resolve(order, fetch).await?);
        }
        Ok(graphs)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
