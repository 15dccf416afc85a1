//! Pre-trade execution cost estimation
//!
//! Each estimator is a deterministic function of one book snapshot plus the
//! order parameters. `CostAggregator` runs them together and owns the only
//! stateful piece, the learned slippage model.

mod aggregator;
mod fees;
mod impact;
mod maker_taker;
mod model;
mod slippage;

pub use aggregator::CostAggregator;
pub use fees::{FeeEstimate, FeeSchedule, FeeTierRates};
pub use impact::{MarketImpact, MarketImpactModel};
pub use maker_taker::{predict_maker_taker_proportion, MakerTakerModel, MakerTakerSplit};
pub use model::{LinearFit, SlippageModel, SlippageModelConfig, SlippageObservation};
pub use slippage::{estimate_slippage, SlippageEstimate};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulatorError};

/// Hypothetical market buy to price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Order size in quote currency
    pub quantity_usd: f64,
    /// Volatility as a fraction (0.05 = 5%)
    pub volatility: f64,
    /// Fee tier label, e.g. "VIP 0"
    pub fee_tier: String,
}

impl OrderRequest {
    pub fn new(quantity_usd: f64, volatility: f64, fee_tier: &str) -> Self {
        Self {
            quantity_usd,
            volatility,
            fee_tier: fee_tier.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.quantity_usd.is_finite() || self.quantity_usd <= 0.0 {
            return Err(SimulatorError::InvalidOrder(format!(
                "quantity_usd must be positive, got {}",
                self.quantity_usd
            )));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(SimulatorError::InvalidOrder(format!(
                "volatility must be non-negative, got {}",
                self.volatility
            )));
        }
        Ok(())
    }
}

/// Full cost breakdown for one order against one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostQuote {
    pub symbol: String,
    pub quantity_usd: f64,
    pub mid_price: Decimal,
    pub spread: Decimal,
    pub volatility: f64,

    /// Requested tier label
    pub fee_tier: String,
    pub taker_fee_rate: f64,
    /// Unknown tier, lowest tier's taker rate applied
    pub fee_tier_fallback: bool,

    pub slippage_usd: f64,
    pub fees_usd: f64,
    pub impact_usd: f64,
    pub net_cost_usd: f64,

    pub slippage_pct: f64,
    pub fees_pct: f64,
    pub impact_pct: f64,
    pub net_cost_pct: f64,

    pub maker_ratio: f64,
    pub taker_ratio: f64,

    /// Slippage walk ran past the last ask
    pub liquidity_exhausted: bool,

    /// Slippage model's prediction for the same inputs
    pub modeled_slippage_usd: f64,
}

/// `value` as a percentage of `quantity`
pub(crate) fn percent_of(value: f64, quantity: f64) -> f64 {
    if quantity > 0.0 {
        value / quantity * 100.0
    } else {
        0.0
    }
}
