//! Prometheus metrics and HTTP health endpoints.
//!
//! Serves `/metrics` (Prometheus text format), `/healthz` (always OK while
//! the process runs) and `/readyz` (OK once every watch has completed its
//! initial list).

use crate::error::ControllerError;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Metrics collector and readiness tracker shared by the watchers
pub struct Metrics {
    registry: Registry,
    reconciliations_total: IntCounterVec,
    status_patches_total: IntCounterVec,
    watch_restarts_total: IntCounterVec,
    expected_watches: usize,
    synced_watches: Mutex<BTreeSet<&'static str>>,
}

impl Metrics {
    /// Registers the controller's metrics; `/readyz` reports ready once
    /// `expected_watches` distinct watches are synced
    pub fn new(expected_watches: usize) -> Result<Self, ControllerError> {
        let registry = Registry::new();

        let reconciliations_total = IntCounterVec::new(
            Opts::new("network_status_reconciliations_total", "Reconciliations by kind and result"),
            &["kind", "result"],
        )?;
        let status_patches_total = IntCounterVec::new(
            Opts::new("network_status_status_patches_total", "Status subresource patches by kind"),
            &["kind"],
        )?;
        let watch_restarts_total = IntCounterVec::new(
            Opts::new("network_status_watch_restarts_total", "Watch restarts after stream errors by kind"),
            &["kind"],
        )?;

        registry.register(Box::new(reconciliations_total.clone()))?;
        registry.register(Box::new(status_patches_total.clone()))?;
        registry.register(Box::new(watch_restarts_total.clone()))?;

        Ok(Self {
            registry,
            reconciliations_total,
            status_patches_total,
            watch_restarts_total,
            expected_watches,
            synced_watches: Mutex::new(BTreeSet::new()),
        })
    }

    /// Counts one reconciliation
    pub fn reconciled(&self, kind: &str, ok: bool) {
        let result = if ok { "success" } else { "error" };
        self.reconciliations_total.with_label_values(&[kind, result]).inc();
    }

    /// Counts one status patch
    pub fn status_patched(&self, kind: &str) {
        self.status_patches_total.with_label_values(&[kind]).inc();
    }

    /// Counts one watch restart
    pub fn watch_restarted(&self, kind: &str) {
        self.watch_restarts_total.with_label_values(&[kind]).inc();
    }

    /// Marks the watch for `kind` as having completed its initial list
    pub fn watch_synced(&self, kind: &'static str) {
        if let Ok(mut synced) = self.synced_watches.lock() {
            synced.insert(kind);
        }
    }

    /// Whether every expected watch is synced
    pub fn is_ready(&self) -> bool {
        self.synced_watches
            .lock()
            .map(|synced| synced.len() >= self.expected_watches)
            .unwrap_or(false)
    }

    /// Current metrics in Prometheus text format
    pub fn render(&self) -> Result<String, ControllerError> {
        let families = self.registry.gather();
        Ok(TextEncoder::new().encode_to_string(&families)?)
    }
}

/// Router for the metrics and health endpoints
pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(metrics)
}

/// Serves the endpoints until the listener fails
pub async fn serve(addr: SocketAddr, metrics: Arc<Metrics>) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Serving metrics and health checks on {}", addr);
    axum::serve(listener, router(metrics)).await?;
    Ok(())
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(metrics): State<Arc<Metrics>>) -> (StatusCode, &'static str) {
    if metrics.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "watches not synced")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_counters() {
        let metrics = Metrics::new(1).unwrap();
        metrics.reconciled("ServiceCIDR", true);
        metrics.reconciled("ServiceCIDR", false);
        metrics.status_patched("PodNetwork");
        metrics.watch_restarted("IPAddress");

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"network_status_reconciliations_total{kind="ServiceCIDR",result="success"} 1"#));
        assert!(text.contains(r#"network_status_reconciliations_total{kind="ServiceCIDR",result="error"} 1"#));
        assert!(text.contains(r#"network_status_status_patches_total{kind="PodNetwork"} 1"#));
        assert!(text.contains(r#"network_status_watch_restarts_total{kind="IPAddress"} 1"#));
    }

    #[test]
    fn ready_once_every_watch_synced() {
        let metrics = Metrics::new(2).unwrap();
        assert!(!metrics.is_ready());
        metrics.watch_synced("ServiceCIDR");
        metrics.watch_synced("ServiceCIDR");
        assert!(!metrics.is_ready());
        metrics.watch_synced("PodNetwork");
        assert!(metrics.is_ready());
    }
}
