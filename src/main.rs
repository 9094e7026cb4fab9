//! Cross-sectional market-data engine
//!
//! # Architecture
//! - **core**: store, seqlock, SPSC ring buffer, sector index
//! - **ingestion**: producer/consumer feed threads
//! - **hot_path**: width-8 kernels, stats engine, signals
//! - **infrastructure**: cold path (logging, metrics, config, api)
//!
//! Runs the synthetic feed and the live signal loop for the configured
//! duration, optionally serving telemetry over HTTP meanwhile.

use cross_section_engine::engine::AppEngine;
use cross_section_engine::infrastructure::logging::init_logging;
use cross_section_engine::infrastructure::{start_server, AppState, Config};
use cross_section_engine::{log_api, log_main, Result, XsError};
use std::sync::Arc;
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    // Guards flush file logs on exit
    let _log_guards = init_logging()?;

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log_main!(Level::WARN, "Invalid config ({}), using defaults", e);
            Config::default()
        }
    };

    let engine = Arc::new(AppEngine::new(config)?);

    let api_config = engine.config().api.clone();
    if api_config.enabled {
        let state = AppState::new(engine.store(), engine.metrics());
        tokio::spawn(async move {
            if let Err(e) = start_server(state, api_config.port).await {
                log_api!(Level::ERROR, "API Server failed: {}", e);
            }
        });
    }

    // The live loop spins and sleeps on OS threads; keep it off the runtime.
    let runner = Arc::clone(&engine);
    let summary = tokio::task::spawn_blocking(move || runner.run())
        .await
        .map_err(|e| XsError::Thread(format!("live loop: {}", e)))??;

    log_main!(
        Level::INFO,
        cycles = summary.cycles,
        updates = summary.updates_processed,
        "Shutdown complete"
    );
    Ok(())
}
