use actix_web::{web, HttpResponse};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::time::Instant;

use super::{ApiError, AppState};
use crate::domain::{Address, OrderSearch, OrderStatus};
use crate::repository::{OrderRepository, OrderSimpleQueryRepository};
use crate::session::{Fetch, OrderGraph};
use crate::store::QueryError;

// ============================================================================
// Simple orders - to-one associations only (member, delivery)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleOrderDto {
    pub order_id: i64,
    pub name: String,
    pub order_date: NaiveDateTime,
    pub order_status: OrderStatus,
    pub address: Address,
}

impl From<&OrderGraph> for SimpleOrderDto {
    fn from(graph: &OrderGraph) -> Self {
        Self {
            order_id: graph.id,
            name: graph.member.name.clone(),
            order_date: graph.order_date,
            order_status: graph.status,
            address: graph.delivery.address.clone(),
        }
    }
}

/// Entity graphs with member and delivery forced; items stay null
pub async fn simple_orders_v1(
    state: web::Data<AppState>,
    search: web::Query<OrderSearch>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.open_session();

    let result = async {
        let orders = OrderRepository::new(&mut session).find_all_by_search(&search).await?;
        session.resolve_all(&orders, Fetch::ToOne).await
    }
    .await;

    session.close();
    state.respond("simple_orders_v1", started, session.query_log(), result)
}

pub async fn simple_orders_v2(
    state: web::Data<AppState>,
    search: web::Query<OrderSearch>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.open_session();

    let result = async {
        let orders = OrderRepository::new(&mut session).find_all_by_search(&search).await?;
        let graphs = session.resolve_all(&orders, Fetch::ToOne).await?;
        Ok::<_, QueryError>(graphs.iter().map(SimpleOrderDto::from).collect::<Vec<_>>())
    }
    .await;

    session.close();
    state.respond("simple_orders_v2", started, session.query_log(), result)
}

pub async fn simple_orders_v3(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.open_session();

    let result = async {
        let orders = OrderRepository::new(&mut session)
            .find_all_with_member_delivery(None)
            .await?;
        let graphs = session.resolve_all(&orders, Fetch::ToOne).await?;
        Ok::<_, QueryError>(graphs.iter().map(SimpleOrderDto::from).collect::<Vec<_>>())
    }
    .await;

    session.close();
    state.respond("simple_orders_v3", started, session.query_log(), result)
}

pub async fn simple_orders_v4(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.open_session();

    let result = OrderSimpleQueryRepository::new(&mut session).find_order_dtos().await;

    session.close();
    state.respond("simple_orders_v4", started, session.query_log(), result)
}
