// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::{metrics_server, routes};

// ============================================================================
// Metrics Module - Prometheus metrics for the query endpoints
// ============================================================================
//
// Provides:
// - Request throughput, failures and latency per endpoint
// - Round trips per named query
// - Round trips per request, the number each fetch strategy is judged by
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub api_requests: IntCounterVec,
    pub api_request_failures: IntCounterVec,
    pub api_request_duration: HistogramVec,

    pub db_queries: IntCounterVec,
    pub queries_per_request: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let api_requests = IntCounterVec::new(
            Opts::new("api_requests_total", "Total API requests served"),
            &["endpoint"],
        )?;
        registry.register(Box::new(api_requests.clone()))?;

        let api_request_failures = IntCounterVec::new(
            Opts::new("api_request_failures_total", "Total API requests that failed"),
            &["endpoint", "reason"],
        )?;
        registry.register(Box::new(api_request_failures.clone()))?;

        let api_request_duration = HistogramVec::new(
            HistogramOpts::new("api_request_duration_seconds", "API request duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["endpoint"],
        )?;
        registry.register(Box::new(api_request_duration.clone()))?;

        let db_queries = IntCounterVec::new(
            Opts::new("db_queries_total", "Total database round trips by query"),
            &["query"],
        )?;
        registry.register(Box::new(db_queries.clone()))?;

        let queries_per_request = HistogramVec::new(
            HistogramOpts::new("db_queries_per_request", "Database round trips per API request")
                .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 20.0, 50.0, 100.0]),
            &["endpoint"],
        )?;
        registry.register(Box::new(queries_per_request.clone()))?;

        Ok(Self {
            registry,
            api_requests,
            api_request_failures,
            api_request_duration,
            db_queries,
            queries_per_request,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one served request and the queries its session issued
    pub fn record_request(
        &self,
        endpoint: &str,
        duration_secs: f64,
        query_log: &[&'static str],
        failure: Option<&str>,
    ) {
        self.api_requests.with_label_values(&[endpoint]).inc();
        if let Some(reason) = failure {
            self.api_request_failures.with_label_values(&[endpoint, reason]).inc();
        }
        self.api_request_duration.with_label_values(&[endpoint]).observe(duration_secs);

        for query in query_log {
            self.db_queries.with_label_values(&[*query]).inc();
        }
        self.queries_per_request
            .with_label_values(&[endpoint])
            .observe(query_log.len() as f64);
    }
}
