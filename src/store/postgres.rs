use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use std::time::Duration;

use super::{Dataset, OrderItemJoinRow, OrderStore, OrderWithMemberDelivery, Page, QueryError};
use crate::domain::{
    Address, Delivery, DeliveryStatus, Item, Member, Order, OrderItem, OrderSearch, OrderStatus,
    SEARCH_RESULT_LIMIT,
};
use crate::repository::query_dto::{OrderFlatDto, OrderItemQueryDto, OrderQueryDto, OrderSimpleQueryDto};

// ============================================================================
// PostgreSQL Store
// ============================================================================
//
// Hand-written SQL for every query in OrderStore. Column aliases are shared
// between queries so one decoder per entity can read any result set that
// contains it.
//
// ============================================================================

const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS member (
        member_id BIGINT PRIMARY KEY,
        name TEXT NOT NULL,
        city TEXT NOT NULL,
        street TEXT NOT NULL,
        zipcode TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS delivery (
        delivery_id BIGINT PRIMARY KEY,
        city TEXT NOT NULL,
        street TEXT NOT NULL,
        zipcode TEXT NOT NULL,
        status TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS item (
        item_id BIGINT PRIMARY KEY,
        name TEXT NOT NULL,
        price INTEGER NOT NULL,
        stock_quantity INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        order_id BIGINT PRIMARY KEY,
        member_id BIGINT NOT NULL REFERENCES member (member_id),
        delivery_id BIGINT NOT NULL UNIQUE REFERENCES delivery (delivery_id),
        order_date TIMESTAMP NOT NULL,
        status TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS order_item (
        order_item_id BIGINT PRIMARY KEY,
        order_id BIGINT NOT NULL REFERENCES orders (order_id),
        item_id BIGINT NOT NULL REFERENCES item (item_id),
        order_price INTEGER NOT NULL,
        count INTEGER NOT NULL CHECK (count > 0)
    )",
];

const ORDER_COLUMNS: &str = "o.order_id, o.member_id, o.delivery_id, o.order_date, o.status AS order_status";
const MEMBER_COLUMNS: &str =
    "m.name AS member_name, m.city AS member_city, m.street AS member_street, m.zipcode AS member_zipcode";
const DELIVERY_COLUMNS: &str = "d.city AS delivery_city, d.street AS delivery_street, \
     d.zipcode AS delivery_zipcode, d.status AS delivery_status";
const ORDER_ITEM_COLUMNS: &str = "oi.order_item_id, oi.item_id, oi.order_price, oi.count";
const ITEM_COLUMNS: &str = "i.name AS item_name, i.price AS item_price, i.stock_quantity";

const ORDER_JOINS: &str = "FROM orders o \
     JOIN member m ON m.member_id = o.member_id \
     JOIN delivery d ON d.delivery_id = o.delivery_id";
const ITEM_JOINS: &str = "JOIN order_item oi ON oi.order_id = o.order_id \
     JOIN item i ON i.item_id = oi.item_id";

const CONNECT_ATTEMPTS: u32 = 5;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with exponential backoff while the database comes up
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, QueryError> {
        let mut attempt = 0;
        let mut delay = Duration::from_millis(200);

        loop {
            attempt += 1;

            match PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(database_url)
                .await
            {
                Ok(pool) => {
                    tracing::info!(attempt = attempt, "Connected to PostgreSQL");
                    return Ok(Self::new(pool));
                }
                Err(error) if attempt < CONNECT_ATTEMPTS => {
                    tracing::warn!(
                        attempt = attempt,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "Database not reachable, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(5));
                }
                Err(error) => {
                    tracing::error!(attempt = attempt, error = %error, "Giving up on database connection");
                    return Err(error.into());
                }
            }
        }
    }

    pub async fn install_schema(&self) -> Result<(), QueryError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!(tables = SCHEMA.len(), "Schema installed");
        Ok(())
    }

    /// Insert the dataset in one transaction unless orders already exist.
    /// Returns whether anything was written.
    pub async fn seed(&self, data: &Dataset) -> Result<bool, QueryError> {
        let existing: i64 = sqlx::query("SELECT COUNT(*) AS total FROM orders")
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;
        if existing > 0 {
            tracing::info!(existing_orders = existing, "Database already populated, skipping seed");
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;

        for member in data.members.values() {
            sqlx::query("INSERT INTO member (member_id, name, city, street, zipcode) VALUES ($1, $2, $3, $4, $5)")
                .bind(member.id)
                .bind(&member.name)
                .bind(&member.address.city)
                .bind(&member.address.street)
                .bind(&member.address.zipcode)
                .execute(&mut *tx)
                .await?;
        }

        for delivery in data.deliveries.values() {
            sqlx::query("INSERT INTO delivery (delivery_id, city, street, zipcode, status) VALUES ($1, $2, $3, $4, $5)")
                .bind(delivery.id)
                .bind(&delivery.address.city)
                .bind(&delivery.address.street)
                .bind(&delivery.address.zipcode)
                .bind(delivery.status.as_str())
                .execute(&mut *tx)
                .await?;
        }

        for item in data.items.values() {
            sqlx::query("INSERT INTO item (item_id, name, price, stock_quantity) VALUES ($1, $2, $3, $4)")
                .bind(item.id)
                .bind(&item.name)
                .bind(item.price)
                .bind(item.stock_quantity)
                .execute(&mut *tx)
                .await?;
        }

        for order in data.orders.values() {
            sqlx::query("INSERT INTO orders (order_id, member_id, delivery_id, order_date, status) VALUES ($1, $2, $3, $4, $5)")
                .bind(order.id)
                .bind(order.member_id)
                .bind(order.delivery_id)
                .bind(order.order_date)
                .bind(order.status.as_str())
                .execute(&mut *tx)
                .await?;
        }

        for order_item in data.order_items.values() {
            sqlx::query("INSERT INTO order_item (order_item_id, order_id, item_id, order_price, count) VALUES ($1, $2, $3, $4, $5)")
                .bind(order_item.id)
                .bind(order_item.order_id)
                .bind(order_item.item_id)
                .bind(order_item.order_price)
                .bind(order_item.count)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            members = data.members.len(),
            orders = data.orders.len(),
            order_items = data.order_items.len(),
            "Seeded sample data"
        );
        Ok(true)
    }
}

// ============================================================================
// Query Building
// ============================================================================

/// Dynamic search: status equality and member name substring, both optional
fn search_query(search: &OrderSearch) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {ORDER_COLUMNS} FROM orders o JOIN member m ON m.member_id = o.member_id"
    ));
    let mut has_condition = false;

    if let Some(status) = search.order_status {
        builder.push(" WHERE o.status = ").push_bind(status.as_str());
        has_condition = true;
    }

    if let Some(name) = search.member_name_filter() {
        builder
            .push(if has_condition { " AND " } else { " WHERE " })
            .push("m.name LIKE ")
            .push_bind(contains_pattern(name))
            .push(" ESCAPE '\\'");
    }

    builder
        .push(" ORDER BY o.order_id LIMIT ")
        .push_bind(SEARCH_RESULT_LIMIT as i64);
    builder
}

/// LIKE pattern matching `name` literally anywhere in the column
fn contains_pattern(name: &str) -> String {
    let mut pattern = String::with_capacity(name.len() + 2);
    pattern.push('%');
    for c in name.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn to_one_join_sql(paged: bool) -> String {
    let mut sql = format!(
        "SELECT {ORDER_COLUMNS}, {MEMBER_COLUMNS}, {DELIVERY_COLUMNS} {ORDER_JOINS} ORDER BY o.order_id"
    );
    if paged {
        sql.push_str(" LIMIT $1 OFFSET $2");
    }
    sql
}

// ============================================================================
// Row Decoding
// ============================================================================

fn decode_order_status(row: &PgRow) -> Result<OrderStatus, QueryError> {
    let text: String = row.try_get("order_status")?;
    text.parse().map_err(|reason: String| QueryError::decode("order_status", reason))
}

fn decode_order(row: &PgRow) -> Result<Order, QueryError> {
    Ok(Order {
        id: row.try_get("order_id")?,
        member_id: row.try_get("member_id")?,
        delivery_id: row.try_get("delivery_id")?,
        order_date: row.try_get("order_date")?,
        status: decode_order_status(row)?,
    })
}

fn decode_address(row: &PgRow, prefix: &str) -> Result<Address, QueryError> {
    Ok(Address {
        city: row.try_get(format!("{prefix}_city").as_str())?,
        street: row.try_get(format!("{prefix}_street").as_str())?,
        zipcode: row.try_get(format!("{prefix}_zipcode").as_str())?,
    })
}

fn decode_member(row: &PgRow) -> Result<Member, QueryError> {
    Ok(Member {
        id: row.try_get("member_id")?,
        name: row.try_get("member_name")?,
        address: decode_address(row, "member")?,
    })
}

fn decode_delivery(row: &PgRow) -> Result<Delivery, QueryError> {
    let status: String = row.try_get("delivery_status")?;
    Ok(Delivery {
        id: row.try_get("delivery_id")?,
        address: decode_address(row, "delivery")?,
        status: status
            .parse::<DeliveryStatus>()
            .map_err(|reason| QueryError::decode("delivery_status", reason))?,
    })
}

fn decode_item(row: &PgRow) -> Result<Item, QueryError> {
    Ok(Item {
        id: row.try_get("item_id")?,
        name: row.try_get("item_name")?,
        price: row.try_get("item_price")?,
        stock_quantity: row.try_get("stock_quantity")?,
    })
}

fn decode_order_item(row: &PgRow) -> Result<OrderItem, QueryError> {
    Ok(OrderItem {
        id: row.try_get("order_item_id")?,
        order_id: row.try_get("order_id")?,
        item_id: row.try_get("item_id")?,
        order_price: row.try_get("order_price")?,
        count: row.try_get("count")?,
    })
}

fn decode_header(row: &PgRow) -> Result<OrderSimpleQueryDto, QueryError> {
    Ok(OrderSimpleQueryDto {
        order_id: row.try_get("order_id")?,
        name: row.try_get("member_name")?,
        order_date: row.try_get("order_date")?,
        order_status: decode_order_status(row)?,
        address: decode_address(row, "delivery")?,
    })
}

fn decode_all<T>(rows: &[PgRow], decode: fn(&PgRow) -> Result<T, QueryError>) -> Result<Vec<T>, QueryError> {
    rows.iter().map(decode).collect()
}

// ============================================================================
// OrderStore Implementation
// ============================================================================

#[async_trait]
impl OrderStore for PgStore {
    async fn ping(&self) -> Result<(), QueryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_orders(&self, search: &OrderSearch) -> Result<Vec<Order>, QueryError> {
        let mut builder = search_query(search);
        let rows = builder.build().fetch_all(&self.pool).await?;
        decode_all(&rows, decode_order)
    }

    async fn find_member(&self, id: i64) -> Result<Option<Member>, QueryError> {
        let sql = format!("SELECT m.member_id, {MEMBER_COLUMNS} FROM member m WHERE m.member_id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_member).transpose()
    }

    async fn find_delivery(&self, id: i64) -> Result<Option<Delivery>, QueryError> {
        let sql = format!("SELECT d.delivery_id, {DELIVERY_COLUMNS} FROM delivery d WHERE d.delivery_id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_delivery).transpose()
    }

    async fn find_items(&self, ids: &[i64]) -> Result<Vec<Item>, QueryError> {
        let sql = format!("SELECT i.item_id, {ITEM_COLUMNS} FROM item i WHERE i.item_id = ANY($1) ORDER BY i.item_id");
        let rows = sqlx::query(&sql).bind(ids.to_vec()).fetch_all(&self.pool).await?;
        decode_all(&rows, decode_item)
    }

    async fn find_order_items(&self, order_ids: &[i64]) -> Result<Vec<OrderItem>, QueryError> {
        let sql = format!(
            "SELECT oi.order_id, {ORDER_ITEM_COLUMNS} FROM order_item oi \
             WHERE oi.order_id = ANY($1) ORDER BY oi.order_item_id"
        );
        let rows = sqlx::query(&sql).bind(order_ids.to_vec()).fetch_all(&self.pool).await?;
        decode_all(&rows, decode_order_item)
    }

    async fn find_orders_with_member_delivery(
        &self,
        page: Option<Page>,
    ) -> Result<Vec<OrderWithMemberDelivery>, QueryError> {
        let sql = to_one_join_sql(page.is_some());
        let mut query = sqlx::query(&sql);
        if let Some(page) = page {
            query = query.bind(i64::from(page.limit)).bind(i64::from(page.offset));
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(OrderWithMemberDelivery {
                    order: decode_order(row)?,
                    member: decode_member(row)?,
                    delivery: decode_delivery(row)?,
                })
            })
            .collect()
    }

    async fn find_orders_with_items(&self) -> Result<Vec<OrderItemJoinRow>, QueryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS}, {MEMBER_COLUMNS}, {DELIVERY_COLUMNS}, {ORDER_ITEM_COLUMNS}, {ITEM_COLUMNS} \
             {ORDER_JOINS} {ITEM_JOINS} ORDER BY o.order_id, oi.order_item_id"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(OrderItemJoinRow {
                    order: decode_order(row)?,
                    member: decode_member(row)?,
                    delivery: decode_delivery(row)?,
                    order_item: decode_order_item(row)?,
                    item: decode_item(row)?,
                })
            })
            .collect()
    }

    async fn find_order_query_dtos(&self) -> Result<Vec<OrderQueryDto>, QueryError> {
        let headers = self.find_order_simple_query_dtos().await?;
        Ok(headers
            .into_iter()
            .map(|h| OrderQueryDto::header(h.order_id, h.name, h.order_date, h.order_status, h.address))
            .collect())
    }

    async fn find_order_item_query_dtos(&self, order_ids: &[i64]) -> Result<Vec<OrderItemQueryDto>, QueryError> {
        let sql = "SELECT oi.order_id, i.name AS item_name, oi.order_price, oi.count \
                   FROM order_item oi JOIN item i ON i.item_id = oi.item_id \
                   WHERE oi.order_id = ANY($1) ORDER BY oi.order_item_id";
        let rows = sqlx::query(sql).bind(order_ids.to_vec()).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(OrderItemQueryDto {
                    order_id: row.try_get("order_id")?,
                    item_name: row.try_get("item_name")?,
                    order_price: row.try_get("order_price")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    async fn find_order_flats(&self) -> Result<Vec<OrderFlatDto>, QueryError> {
        let sql = format!(
            "SELECT o.order_id, m.name AS member_name, o.order_date, o.status AS order_status, \
             {DELIVERY_COLUMNS}, i.name AS item_name, oi.order_price, oi.count \
             {ORDER_JOINS} {ITEM_JOINS} ORDER BY o.order_id, oi.order_item_id"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                let header = decode_header(row)?;
                Ok(OrderFlatDto {
                    order_id: header.order_id,
                    name: header.name,
                    order_date: header.order_date,
                    order_status: header.order_status,
                    address: header.address,
                    item_name: row.try_get("item_name")?,
                    order_price: row.try_get("order_price")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    async fn find_order_simple_query_dtos(&self) -> Result<Vec<OrderSimpleQueryDto>, QueryError> {
        let sql = format!(
            "SELECT o.order_id, m.name AS member_name, o.order_date, o.status AS order_status, \
             {DELIVERY_COLUMNS} {ORDER_JOINS} ORDER BY o.order_id"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        decode_all(&rows, decode_header)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
//
// Running the queries needs a live PostgreSQL; these tests pin the SQL that
// gets built.
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_without_filters_has_no_where_clause() {
        let builder = search_query(&OrderSearch::default());
        let sql = builder.sql();

        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("ORDER BY o.order_id LIMIT $1"));
    }

    #[test]
    fn test_search_with_both_filters() {
        let search = OrderSearch {
            member_name: Some("userA".to_string()),
            order_status: Some(OrderStatus::Ordered),
        };
        let builder = search_query(&search);
        let sql = builder.sql();

        assert!(sql.contains("WHERE o.status = $1"));
        assert!(sql.contains("AND m.name LIKE $2"));
        assert!(sql.contains("LIMIT $3"));
    }

    #[test]
    fn test_member_name_wildcards_match_literally() {
        assert_eq!(contains_pattern("userA"), "%userA%");
        assert_eq!(contains_pattern("_"), "%\\_%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");

        let search = OrderSearch {
            member_name: Some("_".to_string()),
            order_status: None,
        };
        assert!(search_query(&search).sql().contains("m.name LIKE $1 ESCAPE '\\'"));
    }

    #[test]
    fn test_search_with_name_only_starts_where_clause() {
        let search = OrderSearch {
            member_name: Some("user".to_string()),
            order_status: None,
        };
        let builder = search_query(&search);

        assert!(builder.sql().contains("WHERE m.name LIKE $1"));
    }

    #[test]
    fn test_paged_to_one_join_binds_limit_and_offset() {
        assert!(to_one_join_sql(true).ends_with("ORDER BY o.order_id LIMIT $1 OFFSET $2"));
        assert!(!to_one_join_sql(false).contains("LIMIT"));
    }

    #[test]
    fn test_schema_guards_positive_quantity() {
        assert!(SCHEMA[4].contains("CHECK (count > 0)"));
    }
}
