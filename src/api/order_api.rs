use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::time::Instant;

use super::{ApiError, AppState};
use crate::domain::OrderSearch;
use crate::repository::{group_flat_rows, OrderQueryRepository, OrderRepository};
use crate::service::OrderDto;
use crate::session::Fetch;
use crate::store::{Page, QueryError};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    offset: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    100
}

/// Entity graphs straight out, every association lazily loaded
pub async fn orders_v1(
    state: web::Data<AppState>,
    search: web::Query<OrderSearch>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.open_session();

    let result = async {
        let orders = OrderRepository::new(&mut session).find_all_by_search(&search).await?;
        session.resolve_all(&orders, Fetch::Full).await
    }
    .await;

    session.close();
    state.respond("orders_v1", started, session.query_log(), result)
}

pub async fn orders_v2(
    state: web::Data<AppState>,
    search: web::Query<OrderSearch>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.open_session();

    let result = async {
        let orders = OrderRepository::new(&mut session).find_all_by_search(&search).await?;
        let graphs = session.resolve_all(&orders, Fetch::Full).await?;
        Ok::<_, QueryError>(graphs.iter().map(OrderDto::from).collect::<Vec<_>>())
    }
    .await;

    session.close();
    state.respond("orders_v2", started, session.query_log(), result)
}

/// Collection fetch join; the whole graph arrives in one query
pub async fn orders_v3(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.open_session();

    let result = async {
        let orders = OrderRepository::new(&mut session).find_all_with_item().await?;
        let graphs = session.resolve_all(&orders, Fetch::Full).await?;
        Ok::<_, QueryError>(graphs.iter().map(OrderDto::from).collect::<Vec<_>>())
    }
    .await;

    session.close();
    state.respond("orders_v3", started, session.query_log(), result)
}

/// Pageable to-one fetch join, collections batch fetched
pub async fn orders_v3_page(
    state: web::Data<AppState>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.batch_session();
    let page = Page::new(params.offset, params.limit);

    let result = async {
        let orders = OrderRepository::new(&mut session)
            .find_all_with_member_delivery(Some(page))
            .await?;
        let graphs = session.resolve_all(&orders, Fetch::Full).await?;
        Ok::<_, QueryError>(graphs.iter().map(OrderDto::from).collect::<Vec<_>>())
    }
    .await;

    session.close();
    state.respond("orders_v3_1", started, session.query_log(), result)
}

pub async fn orders_v4(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.open_session();

    let result = OrderQueryRepository::new(&mut session).find_order_query_dtos().await;

    session.close();
    state.respond("orders_v4", started, session.query_log(), result)
}

pub async fn orders_v5(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.open_session();

    let result = OrderQueryRepository::new(&mut session)
        .find_all_by_dto_optimization()
        .await;

    session.close();
    state.respond("orders_v5", started, session.query_log(), result)
}

/// One flat query, regrouped per order in memory
pub async fn orders_v6(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let mut session = state.open_session();

    let result = OrderQueryRepository::new(&mut session)
        .find_all_by_dto_flat()
        .await
        .map(|rows| group_flat_rows(&rows));

    session.close();
    state.respond("orders_v6", started, session.query_log(), result)
}

/// V3 through the query service, which owns and closes its session
pub async fn orders_osiv_v3(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();

    let response = state.query_service().orders_v3().await;
    state.respond("orders_osiv_v3", started, &response.query_log, response.result)
}

#[cfg(test)]
mod tests {
    use crate::api::configure;
    use crate::api::test_support::{failing_state, queries_of, sample_state};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::collections::BTreeMap;

    type ItemTriple = (String, i64, i64);

    /// order id -> (item name, order price, count), whatever the response shape
    fn order_items_by_id(body: &Value) -> BTreeMap<i64, Vec<ItemTriple>> {
        let mut out = BTreeMap::new();
        for order in body.as_array().unwrap() {
            let id = order.get("orderId").or_else(|| order.get("id")).unwrap().as_i64().unwrap();
            let items = order["orderItems"]
                .as_array()
                .unwrap()
                .iter()
                .map(|line| {
                    let name = line
                        .get("itemName")
                        .or_else(|| line.get("item").and_then(|item| item.get("name")))
                        .unwrap()
                        .as_str()
                        .unwrap()
                        .to_string();
                    (name, line["orderPrice"].as_i64().unwrap(), line["count"].as_i64().unwrap())
                })
                .collect();
            out.insert(id, items);
        }
        out
    }

    #[actix_web::test]
    async fn test_every_variant_returns_the_same_orders() {
        let state = sample_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let mut results = Vec::new();
        for uri in [
            "/api/v1/orders",
            "/api/v2/orders",
            "/api/v3/orders",
            "/api/v3.1/orders",
            "/api/v4/orders",
            "/api/v5/orders",
            "/api/v6/orders",
            "/api/osiv/v3/orders",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            results.push((uri, order_items_by_id(&body)));
        }

        let (_, expected) = &results[0];
        assert_eq!(
            expected[&2],
            vec![
                ("SPRING1 BOOK".to_string(), 20000, 3),
                ("SPRING2 BOOK".to_string(), 40000, 4),
            ]
        );
        for (uri, items) in &results {
            assert_eq!(items, expected, "{} differs", uri);
        }
    }

    #[actix_web::test]
    async fn test_query_counts_per_variant() {
        let state = sample_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        for (uri, endpoint, expected) in [
            ("/api/v1/orders", "orders_v1", 11.0),
            ("/api/v2/orders", "orders_v2", 11.0),
            ("/api/v3/orders", "orders_v3", 1.0),
            ("/api/v3.1/orders", "orders_v3_1", 3.0),
            ("/api/v4/orders", "orders_v4", 3.0),
            ("/api/v5/orders", "orders_v5", 2.0),
            ("/api/v6/orders", "orders_v6", 1.0),
            ("/api/osiv/v3/orders", "orders_osiv_v3", 1.0),
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(queries_of(&state, endpoint), expected, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn test_failed_service_call_reports_issued_queries() {
        let state = failing_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/osiv/v3/orders").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(queries_of(&state, "orders_osiv_v3"), 1.0);
        assert_eq!(
            state
                .metrics
                .api_request_failures
                .with_label_values(&["orders_osiv_v3", "decode"])
                .get(),
            1
        );
    }

    #[actix_web::test]
    async fn test_v2_dto_shape() {
        let state = sample_state();
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v2/orders").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body[0]["name"], "userA");
        assert_eq!(body[0]["orderStatus"], "ORDERED");
        assert_eq!(body[0]["address"]["city"], "Seoul");
        assert_eq!(body[0]["orderItems"][0]["itemName"], "JPA1 BOOK");
        assert!(body[0].get("member").is_none());
    }

    #[actix_web::test]
    async fn test_v1_exposes_the_entity_graph() {
        let state = sample_state();
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/orders").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body[1]["member"]["name"], "userB");
        assert_eq!(body[1]["delivery"]["status"], "READY");
        assert_eq!(body[1]["totalPrice"], 3 * 20000 + 4 * 40000);
    }

    #[actix_web::test]
    async fn test_search_filters_by_member_name_and_status() {
        let state = sample_state();
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v2/orders?memberName=userB").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "userB");

        let req = test::TestRequest::get().uri("/api/v2/orders?orderStatus=CANCELED").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_v3_1_paging() {
        let state = sample_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v3.1/orders?offset=1&limit=1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let orders = body.as_array().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0]["name"], "userB");
        assert_eq!(orders[0]["orderItems"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::get().uri("/api/v3.1/orders?offset=5").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_negative_offset_is_a_bad_request() {
        let state = sample_state();
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v3.1/orders?offset=-1").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_v6_keeps_item_order_within_each_group() {
        let state = sample_state();
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v6/orders").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let orders = body.as_array().unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0]["orderItems"][1]["itemName"], "JPA2 BOOK");
        assert!(orders[0]["orderItems"][0].get("orderId").is_none());
    }
}
