mod error;
mod order_api;
mod simple_order_api;

use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::Metrics;
use crate::service::OrderQueryService;
use crate::session::Session;
use crate::store::{OrderStore, QueryError};

pub use error::ApiError;

// ============================================================================
// HTTP API - order listing endpoints
// ============================================================================
//
// Every handler opens its own session, runs one fetch strategy, closes the
// session and reports through `respond`, which records the request metrics
// (including the session's query count) before writing the JSON body.
//
// ============================================================================

pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub metrics: Arc<Metrics>,
    pub batch_fetch_size: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn OrderStore>, metrics: Arc<Metrics>, batch_fetch_size: usize) -> Self {
        Self {
            store,
            metrics,
            batch_fetch_size,
        }
    }

    /// Plain lazy loading: one query per uninitialized association
    pub fn open_session(&self) -> Session {
        Session::new(self.store.clone())
    }

    pub fn batch_session(&self) -> Session {
        Session::new(self.store.clone()).with_batch_fetch_size(self.batch_fetch_size)
    }

    pub fn query_service(&self) -> OrderQueryService {
        OrderQueryService::new(self.store.clone())
    }

    pub fn respond<T: Serialize>(
        &self,
        endpoint: &'static str,
        started: Instant,
        query_log: &[&'static str],
        result: Result<T, QueryError>,
    ) -> Result<HttpResponse, ApiError> {
        let elapsed = started.elapsed();
        let failure = result.as_ref().err().map(QueryError::kind);
        self.metrics
            .record_request(endpoint, elapsed.as_secs_f64(), query_log, failure);

        match result {
            Ok(body) => {
                tracing::info!(
                    endpoint = endpoint,
                    queries = query_log.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Request served"
                );
                Ok(HttpResponse::Ok().json(body))
            }
            Err(e) if e.is_session_fault() => {
                tracing::warn!(
                    endpoint = endpoint,
                    error = %e,
                    "Association accessed outside its session"
                );
                Err(e.into())
            }
            Err(e) => {
                tracing::error!(
                    endpoint = endpoint,
                    queries = query_log.len(),
                    error = %e,
                    "Request failed"
                );
                Err(e.into())
            }
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/v1/orders", web::get().to(order_api::orders_v1))
        .route("/api/v2/orders", web::get().to(order_api::orders_v2))
        .route("/api/v3/orders", web::get().to(order_api::orders_v3))
        .route("/api/v3.1/orders", web::get().to(order_api::orders_v3_page))
        .route("/api/v4/orders", web::get().to(order_api::orders_v4))
        .route("/api/v5/orders", web::get().to(order_api::orders_v5))
        .route("/api/v6/orders", web::get().to(order_api::orders_v6))
        // Served at /api/OSVI/v3/orders before; renamed to the lower-case osiv path
        .route("/api/osiv/v3/orders", web::get().to(order_api::orders_osiv_v3))
        .route("/api/v1/simple-orders", web::get().to(simple_order_api::simple_orders_v1))
        .route("/api/v2/simple-orders", web::get().to(simple_order_api::simple_orders_v2))
        .route("/api/v3/simple-orders", web::get().to(simple_order_api::simple_orders_v3))
        .route("/api/v4/simple-orders", web::get().to(simple_order_api::simple_orders_v4));
}
