use actix_web::dev::Server;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;

use crate::store::OrderStore;

/// Build the metrics/health HTTP server; the caller drives it
pub fn metrics_server(
    registry: Arc<Registry>,
    store: Arc<dyn OrderStore>,
    host: &str,
    port: u16,
) -> std::io::Result<Server> {
    tracing::info!("📊 Starting metrics server on http://{}:{}/metrics", host, port);

    let registry = web::Data::new(registry);
    let store = web::Data::new(store);

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(registry.clone())
            .app_data(store.clone())
            .configure(routes)
    })
    .bind((host, port))?
    .run())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics_handler))
        .route("/health", web::get().to(health_handler));
}

async fn metrics_handler(registry: web::Data<Arc<Registry>>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler(store: web::Data<Arc<dyn OrderStore>>) -> impl Responder {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "service": "shop-orders-api"
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "service": "shop-orders-api",
                "error": e.to_string()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use crate::store::{Dataset, InMemoryStore};
    use actix_web::test;

    #[actix_web::test]
    async fn test_metrics_endpoint_exposes_query_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("orders_v6", 0.01, &["order_query.flat"], None);
        let store: Arc<dyn OrderStore> = Arc::new(InMemoryStore::new(Dataset::default()));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Arc::new(metrics.registry().clone())))
                .app_data(web::Data::new(store))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("db_queries_total{query=\"order_query.flat\"} 1"));
    }

    #[actix_web::test]
    async fn test_health_endpoint() {
        let store: Arc<dyn OrderStore> = Arc::new(InMemoryStore::new(Dataset::default()));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Arc::new(Registry::new())))
                .app_data(web::Data::new(store))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
    }
}
