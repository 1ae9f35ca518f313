//! # Prometheus Metrics
//!
//! Operational metrics for the ledger server, scraped at the `/metrics`
//! endpoint on the dedicated metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the server.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it
/// can be shared across request handlers.
#[derive(Clone)]
pub struct ServerMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total wallets created through this server.
    pub wallets_created_total: IntCounter,
    /// Total successful mint operations.
    pub mints_total: IntCounter,
    /// Total successful transfer operations.
    pub transfers_total: IntCounter,
    /// Total operations rejected with a client error (400/403/404).
    pub rejected_operations_total: IntCounter,
    /// Current number of wallets in the store.
    pub wallet_count: IntGauge,
}

impl ServerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("educoin".into()), None)
            .expect("failed to create prometheus registry");

        let wallets_created_total = IntCounter::new(
            "wallets_created_total",
            "Total wallets created through this server",
        )
        .expect("metric creation");
        registry
            .register(Box::new(wallets_created_total.clone()))
            .expect("metric registration");

        let mints_total =
            IntCounter::new("mints_total", "Total successful mint operations")
                .expect("metric creation");
        registry
            .register(Box::new(mints_total.clone()))
            .expect("metric registration");

        let transfers_total =
            IntCounter::new("transfers_total", "Total successful transfer operations")
                .expect("metric creation");
        registry
            .register(Box::new(transfers_total.clone()))
            .expect("metric registration");

        let rejected_operations_total = IntCounter::new(
            "rejected_operations_total",
            "Total operations rejected with a client error",
        )
        .expect("metric creation");
        registry
            .register(Box::new(rejected_operations_total.clone()))
            .expect("metric registration");

        let wallet_count =
            IntGauge::new("wallet_count", "Current number of wallets in the store")
                .expect("metric creation");
        registry
            .register(Box::new(wallet_count.clone()))
            .expect("metric registration");

        Self {
            registry,
            wallets_created_total,
            mints_total,
            transfers_total,
            rejected_operations_total,
            wallet_count,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<ServerMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
