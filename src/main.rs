//! L2 Cost Simulator
//!
//! Streams L2 snapshots for each configured symbol, keeps the books current
//! and serves pre-trade cost quotes over HTTP.

use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use l2_cost_simulator::feed::spawn_status_logger;
use l2_cost_simulator::{server, AppState, Config, CostModelConfig, FeedManager, Publisher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting L2 Cost Simulator");

    let config = Config::load()?;
    info!(symbols = ?config.symbols, exchange = %config.exchange, "Configuration loaded");

    let cost_model = CostModelConfig::load(&config.cost_model_path)?;
    info!(
        path = %config.cost_model_path,
        fee_tiers = cost_model.fees.tiers.len(),
        "Cost model loaded"
    );

    let publisher = match &config.ipc_socket_path {
        Some(path) => Some(Arc::new(Publisher::new(path).await?)),
        None => None,
    };

    let state = Arc::new(AppState::new(config, &cost_model, publisher)?);

    let http_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = server::serve(http_state).await {
            warn!(error = %e, "HTTP server error");
        }
    });

    let status_logger = spawn_status_logger(state.clone());

    let feeds: Vec<_> = state
        .books
        .symbols()
        .into_iter()
        .map(|symbol| {
            let mut manager = FeedManager::new(state.clone(), &symbol);
            tokio::spawn(async move {
                if let Err(e) = manager.run().await {
                    error!(symbol = %symbol, error = %e, "Feed manager stopped");
                }
            })
        })
        .collect();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = futures_util::future::join_all(feeds) => {
            warn!("All feed managers exited");
        }
    }

    status_logger.abort();
    Ok(())
}
