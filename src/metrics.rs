//! Prometheus metrics for ingestion and quoting

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::{Result, SimulatorError};

/// Latency buckets in seconds, 10µs .. 100ms
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.1,
];

/// Owned metrics registry
pub struct Metrics {
    registry: Registry,
    pub snapshots_applied: IntCounterVec,
    pub snapshots_rejected: IntCounterVec,
    pub snapshot_processing: HistogramVec,
    pub quotes: IntCounterVec,
    pub quote_processing: HistogramVec,
    pub feed_reconnects: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let snapshots_applied = IntCounterVec::new(
            Opts::new("snapshots_applied_total", "Snapshots applied to a book"),
            &["symbol"],
        )?;
        let snapshots_rejected = IntCounterVec::new(
            Opts::new("snapshots_rejected_total", "Snapshots rejected as malformed"),
            &["symbol"],
        )?;
        let snapshot_processing = HistogramVec::new(
            HistogramOpts::new(
                "snapshot_processing_seconds",
                "Time to validate and apply one snapshot",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["symbol"],
        )?;
        let quotes = IntCounterVec::new(
            Opts::new("quotes_total", "Cost quotes by outcome"),
            &["symbol", "outcome"],
        )?;
        let quote_processing = HistogramVec::new(
            HistogramOpts::new("quote_processing_seconds", "Time to compute one cost quote")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["symbol"],
        )?;
        let feed_reconnects = IntCounterVec::new(
            Opts::new("feed_reconnects_total", "Feed reconnection attempts"),
            &["symbol"],
        )?;

        registry.register(Box::new(snapshots_applied.clone()))?;
        registry.register(Box::new(snapshots_rejected.clone()))?;
        registry.register(Box::new(snapshot_processing.clone()))?;
        registry.register(Box::new(quotes.clone()))?;
        registry.register(Box::new(quote_processing.clone()))?;
        registry.register(Box::new(feed_reconnects.clone()))?;

        Ok(Self {
            registry,
            snapshots_applied,
            snapshots_rejected,
            snapshot_processing,
            quotes,
            quote_processing,
            feed_reconnects,
        })
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| SimulatorError::MetricsError(e.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
