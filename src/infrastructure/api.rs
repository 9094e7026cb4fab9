//! API Server (Cold Path)
//!
//! Read-only JSON telemetry over HTTP:
//! - `/api/metrics`: pipeline counters and queue depth
//! - `/api/stats`: cross-sectional statistics from a fresh snapshot
//!
//! Handlers take their own store snapshots through a dedicated stats
//! engine; they never touch the feed threads.

use axum::{extract::State, routing::get, Json, Router};
use parking_lot::Mutex;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::core::UniverseStore;
use crate::hot_path::{cross_section_stats, simd, StatsEngine};
use crate::infrastructure::metrics::{MetricsCollector, MetricsSnapshot};
use crate::{log_api, Result};
use tracing::Level;

/// Pipeline counters
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDto {
    pub updates_processed: u64,
    pub ticks_published: u64,
    pub ticks_dropped: u64,
    pub full_queue_spins: u64,
    pub queue_depth: u64,
    pub queue_capacity: u64,
    pub max_queue_depth: u64,
    pub snapshots_taken: u64,
    pub snapshot_retries: u64,
    pub signal_cycles: u64,
    pub update_rate: f64,
    pub uptime_seconds: u64,
}

impl From<MetricsSnapshot> for MetricsDto {
    fn from(snap: MetricsSnapshot) -> Self {
        Self {
            updates_processed: snap.updates_processed,
            ticks_published: snap.ticks_published,
            ticks_dropped: snap.ticks_dropped,
            full_queue_spins: snap.full_queue_spins,
            queue_depth: snap.queue_depth,
            queue_capacity: snap.queue_capacity,
            max_queue_depth: snap.max_queue_depth,
            snapshots_taken: snap.snapshots_taken,
            snapshot_retries: snap.snapshot_retries,
            signal_cycles: snap.signal_cycles,
            update_rate: snap.update_rate,
            uptime_seconds: snap.uptime_seconds,
        }
    }
}

/// Cross-sectional statistics, all from one snapshot
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDto {
    pub num_assets: usize,
    pub mean_price: f32,
    pub std_dev_price: f32,
    pub total_notional: f32,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricsCollector>,
    /// Snapshot buffers are per-engine, so requests take turns
    pub stats: Arc<Mutex<StatsEngine>>,
}

impl AppState {
    pub fn new(store: Arc<UniverseStore>, metrics: Arc<MetricsCollector>) -> Self {
        let engine = StatsEngine::new(store).with_metrics(Arc::clone(&metrics));
        Self {
            metrics,
            stats: Arc::new(Mutex::new(engine)),
        }
    }
}

/// Route table, separated from binding for tests
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/metrics", get(get_metrics))
        .route("/api/stats", get(get_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server
pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log_api!(Level::INFO, "API Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Handler for /api/metrics
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsDto> {
    Json(state.metrics.snapshot().into())
}

/// Handler for /api/stats
async fn get_stats(State(state): State<AppState>) -> Json<StatsDto> {
    Json(compute_stats(&state))
}

fn compute_stats(state: &AppState) -> StatsDto {
    let mut engine = state.stats.lock();
    let snap = engine.snapshot();
    let stats = cross_section_stats(snap.prices);
    StatsDto {
        num_assets: snap.len(),
        mean_price: stats.mean,
        std_dev_price: stats.std_dev,
        total_notional: simd::dot(snap.prices, snap.volumes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::store_with_prices;

    #[tokio::test]
    async fn test_stats_endpoint_reads_store() {
        let store = store_with_prices(&[10.0, 20.0, 30.0, 40.0], 2.0);
        let state = AppState::new(store, Arc::new(MetricsCollector::new()));

        let Json(dto) = get_stats(State(state.clone())).await;
        assert_eq!(dto.num_assets, 4);
        assert_eq!(dto.mean_price, 25.0);
        assert_eq!(dto.total_notional, 200.0);

        let Json(metrics) = get_metrics(State(state)).await;
        assert_eq!(metrics.snapshots_taken, 1);
    }

    #[test]
    fn test_dto_uses_camel_case() {
        let dto = StatsDto {
            num_assets: 1,
            mean_price: 1.0,
            std_dev_price: 0.0,
            total_notional: 1.0,
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json.get("stdDevPrice").is_some());
        assert!(json.get("numAssets").is_some());
    }
}
