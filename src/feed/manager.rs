//! Feed connection manager
//!
//! Handles reconnection with backoff and dispatches snapshots to the book.
//! The feed carries no sequence numbers: every snapshot is authoritative on
//! arrival, so a reconnect simply resumes applying whatever comes next.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout};
use tracing::{error, info, warn};

use super::FeedClient;
use crate::error::{Result, SimulatorError};
use crate::AppState;

/// Cooldown period after which reconnect attempts are reset (5 minutes)
const RECONNECT_COOLDOWN_SECS: u64 = 300;

/// Manages the feed connection for one symbol
pub struct FeedManager {
    state: Arc<AppState>,
    symbol: String,
    client: FeedClient,
    reconnect_attempts: u32,
    last_successful_connection: Option<Instant>,
}

impl FeedManager {
    /// Create a new manager for `symbol`
    pub fn new(state: Arc<AppState>, symbol: &str) -> Self {
        let client = FeedClient::new(&state.config.feed_url(symbol));

        Self {
            state,
            symbol: symbol.to_string(),
            client,
            reconnect_attempts: 0,
            last_successful_connection: None,
        }
    }

    /// Run indefinitely with automatic reconnection
    pub async fn run(&mut self) -> Result<()> {
        info!(symbol = %self.symbol, url = %self.client.url(), "Starting feed manager");

        loop {
            if let Some(last_success) = self.last_successful_connection {
                if last_success.elapsed() > Duration::from_secs(RECONNECT_COOLDOWN_SECS)
                    && self.reconnect_attempts > 0
                {
                    info!(
                        symbol = %self.symbol,
                        previous_attempts = self.reconnect_attempts,
                        "Resetting reconnect counter after cooldown period"
                    );
                    self.reconnect_attempts = 0;
                }
            }

            match self.connect_and_process().await {
                Ok(()) => {
                    info!(symbol = %self.symbol, "Feed closed normally, reconnecting...");
                    sleep(Duration::from_secs(1)).await;
                }
                Err(e) => {
                    error!(symbol = %self.symbol, error = %e, "Feed error");
                    self.client.close().await;
                    self.reconnect_attempts += 1;
                    self.state
                        .metrics
                        .feed_reconnects
                        .with_label_values(&[self.symbol.as_str()])
                        .inc();

                    let delay = backoff_delay(
                        self.state.config.reconnect_delay_ms,
                        self.state.config.max_backoff_ms,
                        self.reconnect_attempts,
                    );

                    warn!(
                        symbol = %self.symbol,
                        attempt = self.reconnect_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Reconnecting after error..."
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Connect and process messages until the connection fails
    async fn connect_and_process(&mut self) -> Result<()> {
        self.client.connect().await?;

        self.last_successful_connection = Some(Instant::now());
        self.reconnect_attempts = 0;

        let mut last_message = Instant::now();
        let keepalive_timeout = Duration::from_secs(30);
        let recv_timeout = Duration::from_secs(self.state.config.recv_timeout_secs);

        loop {
            match timeout(recv_timeout, self.client.recv()).await {
                Ok(Ok(Some(text))) => {
                    last_message = Instant::now();
                    // Bad snapshots are logged and counted by ingest; keep reading
                    let _ = self.state.ingest(&self.symbol, &text).await;
                }
                Ok(Ok(None)) => {
                    if last_message.elapsed() > keepalive_timeout {
                        if let Err(e) = self.client.ping().await {
                            warn!(error = %e, "Failed to send keepalive ping");
                        }
                    }
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(
                        symbol = %self.symbol,
                        last_message_secs = last_message.elapsed().as_secs(),
                        "No message received within timeout, sending keepalive"
                    );
                    if let Err(e) = self.client.ping().await {
                        warn!(error = %e, "Failed to send keepalive ping, reconnecting");
                        return Err(SimulatorError::ConnectionTimeout);
                    }
                }
            }
        }
    }
}

/// Exponential backoff capped at `max_ms`; attempt 1 waits exactly `base_ms`
pub fn backoff_delay(base_ms: u64, max_ms: u64, attempt: u32) -> Duration {
    let delay = base_ms.saturating_mul(2u64.pow(attempt.saturating_sub(1).min(6)));
    Duration::from_millis(delay.min(max_ms))
}

/// Periodically log every book's status
pub fn spawn_status_logger(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(state.config.status_interval_secs.max(1));
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            for summary in state.books.summaries(state.config.volatility_window).await {
                if let Some(mid) = summary.mid_price {
                    info!(
                        symbol = %summary.symbol,
                        mid_price = %mid,
                        spread = ?summary.spread,
                        bid_levels = summary.bid_levels,
                        ask_levels = summary.ask_levels,
                        volatility = summary.volatility,
                        update_count = summary.update_count,
                        "Order book status"
                    );
                }
            }
        }
    })
}
