//! Configuration module for the cost simulator

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::costs::{FeeSchedule, MakerTakerModel, MarketImpactModel, SlippageModelConfig};
use crate::error::{Result, SimulatorError};
use crate::orderbook::DEFAULT_HISTORY_CAPACITY;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Instruments to track (e.g., ["BTC-USDT-SWAP"])
    pub symbols: Vec<String>,

    /// L2 feed base endpoint; a symbol's stream is `{feed_endpoint}/{exchange}/{symbol}`
    pub feed_endpoint: String,

    /// Exchange path segment of the feed URL
    pub exchange: String,

    /// Bind address for the HTTP server
    pub http_addr: String,

    /// IPC socket for publishing book summaries (disabled when unset)
    pub ipc_socket_path: Option<String>,

    /// Reconnection settings
    pub reconnect_delay_ms: u64,
    pub max_backoff_ms: u64,

    /// Receive timeout before a connection is considered stale
    pub recv_timeout_secs: u64,

    /// Book status log interval in seconds
    pub status_interval_secs: u64,

    /// Mid-price samples kept per book
    pub history_capacity: usize,

    /// Default window for realized volatility
    pub volatility_window: usize,

    /// Cost model parameter file
    pub cost_model_path: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let symbols: Vec<String> = env::var("SYMBOLS")
            .unwrap_or_else(|_| "BTC-USDT-SWAP".to_string())
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Self {
            symbols,
            feed_endpoint: env::var("FEED_ENDPOINT").unwrap_or_else(|_| {
                "wss://ws.gomarket-cpp.goquant.io/ws/l2-orderbook".to_string()
            }),
            exchange: env::var("EXCHANGE").unwrap_or_else(|_| "okx".to_string()),
            http_addr: env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:9090".to_string()),
            ipc_socket_path: env::var("IPC_SOCKET_PATH").ok().filter(|p| !p.is_empty()),
            reconnect_delay_ms: env::var("RECONNECT_DELAY_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            max_backoff_ms: env::var("MAX_BACKOFF_MS")
                .unwrap_or_else(|_| "60000".to_string())
                .parse()
                .unwrap_or(60_000),
            recv_timeout_secs: env::var("RECV_TIMEOUT_SECS")
                .unwrap_or_else(|_| "45".to_string())
                .parse()
                .unwrap_or(45),
            status_interval_secs: env::var("STATUS_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            history_capacity: env::var("HISTORY_CAPACITY")
                .unwrap_or_else(|_| DEFAULT_HISTORY_CAPACITY.to_string())
                .parse()
                .unwrap_or(DEFAULT_HISTORY_CAPACITY),
            volatility_window: env::var("VOLATILITY_WINDOW")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap_or(20),
            cost_model_path: env::var("COST_MODEL_PATH")
                .unwrap_or_else(|_| "cost_model.toml".to_string()),
        };

        if config.symbols.is_empty() {
            anyhow::bail!("SYMBOLS must name at least one instrument");
        }

        Ok(config)
    }

    /// Feed URL for one symbol
    pub fn feed_url(&self, symbol: &str) -> String {
        format!(
            "{}/{}/{}",
            self.feed_endpoint.trim_end_matches('/'),
            self.exchange,
            symbol
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: vec!["BTC-USDT-SWAP".to_string()],
            feed_endpoint: "wss://ws.gomarket-cpp.goquant.io/ws/l2-orderbook".to_string(),
            exchange: "okx".to_string(),
            http_addr: "0.0.0.0:9090".to_string(),
            ipc_socket_path: None,
            reconnect_delay_ms: 5000,
            max_backoff_ms: 60_000,
            recv_timeout_secs: 45,
            status_interval_secs: 30,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            volatility_window: 20,
            cost_model_path: "cost_model.toml".to_string(),
        }
    }
}

/// Calibratable cost model parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModelConfig {
    pub impact: MarketImpactModel,
    pub fees: FeeSchedule,
    pub maker_taker: MakerTakerModel,
    pub slippage: SlippageModelConfig,
}

impl CostModelConfig {
    /// Load from an optional file at `path` (format from its extension), then
    /// `COST_MODEL_*` environment overrides using `__` for nesting,
    /// e.g. `COST_MODEL_IMPACT__PERMANENT_COEFFICIENT=0.2`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("COST_MODEL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let model: Self = settings.try_deserialize()?;
        model.validate()?;
        Ok(model)
    }

    /// Load only from a file, ignoring the environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;

        let model: Self = settings.try_deserialize()?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SimulatorError::ConfigError(msg));

        if self.impact.permanent_coefficient < 0.0 || self.impact.temporary_coefficient < 0.0 {
            return invalid("impact coefficients must be non-negative".to_string());
        }
        if self.fees.tiers.is_empty() {
            return invalid("fee schedule needs at least one tier".to_string());
        }
        if let Some(tier) = self
            .fees
            .tiers
            .iter()
            .find(|t| t.maker_rate < 0.0 || t.taker_rate < 0.0)
        {
            return invalid(format!("fee tier {} has a negative rate", tier.tier));
        }
        if !(0.0..=1.0).contains(&self.maker_taker.min_taker_ratio) {
            return invalid(format!(
                "min_taker_ratio must be within [0, 1], got {}",
                self.maker_taker.min_taker_ratio
            ));
        }
        if self.slippage.min_observations < 2
            || self.slippage.min_observations > self.slippage.max_observations
        {
            return invalid(format!(
                "slippage min_observations ({}) must be >= 2 and <= max_observations ({})",
                self.slippage.min_observations, self.slippage.max_observations
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_valid() {
        let model = CostModelConfig::default();
        assert!(model.validate().is_ok());
        assert_eq!(model.impact.permanent_coefficient, 0.1);
        assert_eq!(model.impact.temporary_coefficient, 0.05);
        assert_eq!(model.fees.tiers.len(), 5);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            [impact]
            permanent_coefficient = 0.2
            "#,
        );

        let model = CostModelConfig::from_file(file.path()).unwrap();
        assert_eq!(model.impact.permanent_coefficient, 0.2);
        assert_eq!(model.impact.temporary_coefficient, 0.05);
        assert_eq!(model.maker_taker.min_taker_ratio, 0.95);
    }

    #[test]
    fn test_custom_fee_schedule() {
        let file = write_config(
            r#"
            [[fees.tiers]]
            tier = "Regular"
            maker_rate = 0.001
            taker_rate = 0.002

            [[fees.tiers]]
            tier = "Pro"
            maker_rate = 0.0
            taker_rate = 0.0005
            "#,
        );

        let model = CostModelConfig::from_file(file.path()).unwrap();
        assert_eq!(model.fees.tiers.len(), 2);
        assert_eq!(model.fees.calculate_fees(1000.0, "Pro"), 0.5);
        assert_eq!(model.fees.calculate_fees(1000.0, "VIP 0"), 2.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_config(
            r#"
            [maker_taker]
            min_taker_ratio = 1.5
            "#,
        );
        assert!(CostModelConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let model = CostModelConfig::load("/nonexistent/cost_model.toml").unwrap();
        assert_eq!(model.fees, FeeSchedule::default());
    }

    #[test]
    fn test_feed_url() {
        let config = Config {
            feed_endpoint: "wss://example.com/ws/l2-orderbook/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.feed_url("BTC-USDT-SWAP"),
            "wss://example.com/ws/l2-orderbook/okx/BTC-USDT-SWAP"
        );
    }
}
