//! Application state shared by the feed tasks and the HTTP server

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::{Config, CostModelConfig};
use crate::costs::{CostQuote, OrderRequest};
use crate::error::{Result, SimulatorError};
use crate::metrics::Metrics;
use crate::orderbook::BookRegistry;
use crate::parser::RawSnapshot;
use crate::publisher::Publisher;

/// Application state shared across components
pub struct AppState {
    pub books: Arc<BookRegistry>,
    pub publisher: Option<Arc<Publisher>>,
    pub metrics: Arc<Metrics>,
    pub config: Arc<Config>,
    pub cost_model: Arc<CostModelConfig>,
}

impl AppState {
    /// Build books for every configured symbol
    pub fn new(
        config: Config,
        model: &CostModelConfig,
        publisher: Option<Arc<Publisher>>,
    ) -> Result<Self> {
        let books = BookRegistry::new(&config.symbols, config.history_capacity, model);

        Ok(Self {
            books: Arc::new(books),
            publisher,
            metrics: Arc::new(Metrics::new()?),
            config: Arc::new(config),
            cost_model: Arc::new(model.clone()),
        })
    }

    /// Parse, validate and apply one raw feed message to `symbol`'s book.
    ///
    /// Malformed messages are counted and returned as errors; the book is untouched.
    pub async fn ingest(&self, symbol: &str, raw: &str) -> Result<()> {
        let handle = self.books.get(symbol)?;
        let start = Instant::now();

        let result = match RawSnapshot::parse(raw).and_then(RawSnapshot::validate) {
            Ok(snapshot) => {
                handle.apply(snapshot).await;
                Ok(())
            }
            Err(e) => Err(e),
        };

        self.metrics
            .snapshot_processing
            .with_label_values(&[handle.symbol()])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                self.metrics
                    .snapshots_applied
                    .with_label_values(&[handle.symbol()])
                    .inc();

                if let Some(publisher) = &self.publisher {
                    let summary = handle.summary(self.config.volatility_window).await;
                    publisher.publish(&summary).await?;
                }
                Ok(())
            }
            Err(e) => {
                self.metrics
                    .snapshots_rejected
                    .with_label_values(&[handle.symbol()])
                    .inc();
                warn!(symbol = %handle.symbol(), error = %e, "Snapshot rejected");
                Err(e)
            }
        }
    }

    /// Compute a cost quote for `symbol`
    pub async fn quote(&self, symbol: &str, request: &OrderRequest) -> Result<CostQuote> {
        let handle = self.books.get(symbol)?;
        let start = Instant::now();

        let result = handle.compute_cost(request).await;

        let elapsed = start.elapsed();
        self.metrics
            .quote_processing
            .with_label_values(&[handle.symbol()])
            .observe(elapsed.as_secs_f64());

        let outcome = match &result {
            Ok(_) => "ok",
            Err(SimulatorError::InsufficientData(_)) => "unavailable",
            Err(_) => "invalid",
        };
        self.metrics
            .quotes
            .with_label_values(&[handle.symbol(), outcome])
            .inc();

        match &result {
            Ok(_) => debug!(
                symbol = %handle.symbol(),
                elapsed_us = elapsed.as_micros() as u64,
                "Quote completed"
            ),
            Err(e) => warn!(symbol = %handle.symbol(), error = %e, "Quote unavailable"),
        }

        result
    }

    /// Volatility to use when a request does not supply one
    pub async fn default_volatility(&self, symbol: &str) -> Result<f64> {
        let handle = self.books.get(symbol)?;
        Ok(handle.volatility(self.config.volatility_window).await)
    }

    /// Fee tier to use when a request does not name one
    pub fn default_fee_tier(&self) -> String {
        self.cost_model
            .fees
            .lowest()
            .map(|t| t.tier.clone())
            .unwrap_or_else(|| "VIP 0".to_string())
    }
}
