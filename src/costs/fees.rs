//! Tiered exchange fee schedule

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Maker/taker rates for one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeTierRates {
    pub tier: String,
    pub maker_rate: f64,
    pub taker_rate: f64,
}

impl FeeTierRates {
    pub fn new(tier: &str, maker_rate: f64, taker_rate: f64) -> Self {
        Self {
            tier: tier.to_string(),
            maker_rate,
            taker_rate,
        }
    }
}

/// Fee charged for a market order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub fees_usd: f64,
    pub taker_rate: f64,
    /// Tier label that supplied the rate
    pub applied_tier: String,
    /// The requested tier was unknown and the lowest tier was used instead
    pub fallback: bool,
}

/// Ordered fee schedule, lowest tier first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub tiers: Vec<FeeTierRates>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            tiers: vec![
                FeeTierRates::new("VIP 0", 0.0008, 0.0010),
                FeeTierRates::new("VIP 1", 0.0006, 0.0008),
                FeeTierRates::new("VIP 2", 0.0004, 0.0007),
                FeeTierRates::new("VIP 3", 0.0002, 0.0006),
                FeeTierRates::new("VIP 4", 0.0000, 0.0000),
            ],
        }
    }
}

/// Taker rate used if the schedule itself is empty
const EMPTY_SCHEDULE_TAKER_RATE: f64 = 0.0010;

impl FeeSchedule {
    pub fn new(tiers: Vec<FeeTierRates>) -> Self {
        Self { tiers }
    }

    pub fn get(&self, tier: &str) -> Option<&FeeTierRates> {
        self.tiers.iter().find(|rates| rates.tier == tier)
    }

    /// Lowest (most expensive) tier
    pub fn lowest(&self) -> Option<&FeeTierRates> {
        self.tiers.first()
    }

    /// Fees for a market order of `quantity_usd` at `tier`.
    ///
    /// Market orders always pay the taker rate. An unknown tier label is not an
    /// error: it falls back to the lowest tier's taker rate and the estimate is
    /// flagged with `fallback = true`.
    pub fn estimate(&self, quantity_usd: f64, tier: &str) -> FeeEstimate {
        if let Some(rates) = self.get(tier) {
            return FeeEstimate {
                fees_usd: quantity_usd * rates.taker_rate,
                taker_rate: rates.taker_rate,
                applied_tier: rates.tier.clone(),
                fallback: false,
            };
        }

        let (applied_tier, taker_rate) = match self.lowest() {
            Some(rates) => (rates.tier.clone(), rates.taker_rate),
            None => (String::new(), EMPTY_SCHEDULE_TAKER_RATE),
        };
        warn!(
            requested_tier = %tier,
            applied_tier = %applied_tier,
            taker_rate,
            "Unknown fee tier, falling back to lowest tier"
        );

        FeeEstimate {
            fees_usd: quantity_usd * taker_rate,
            taker_rate,
            applied_tier,
            fallback: true,
        }
    }

    /// Fees in USD for a market order
    pub fn calculate_fees(&self, quantity_usd: f64, tier: &str) -> f64 {
        self.estimate(quantity_usd, tier).fees_usd
    }
}
