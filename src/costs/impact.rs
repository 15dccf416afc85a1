//! Permanent + temporary market impact
//!
//! Simplified Almgren-Chriss style model:
//!
//! ```text
//! relative_size = quantity_usd / total_depth_units
//! permanent     = k_perm * volatility * relative_size * mid
//! temporary     = k_temp * sqrt(relative_size) * mid * (1 + volatility)
//! impact_usd    = (permanent + temporary) * quantity_usd / mid
//! ```
//!
//! `relative_size` divides a quote-currency amount by a base-unit depth, exactly
//! as the calibrated coefficients expect; it is not dimensionless.

use serde::{Deserialize, Serialize};

use crate::orderbook::{total_size, PriceLevel};

/// Calibratable impact coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketImpactModel {
    pub permanent_coefficient: f64,
    pub temporary_coefficient: f64,
}

impl Default for MarketImpactModel {
    fn default() -> Self {
        Self {
            permanent_coefficient: 0.1,
            temporary_coefficient: 0.05,
        }
    }
}

/// Impact components for one order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketImpact {
    pub relative_order_size: f64,
    /// Per-unit permanent price move
    pub permanent_impact: f64,
    /// Per-unit temporary price move
    pub temporary_impact: f64,
    /// Total impact in quote currency, never negative
    pub impact_usd: f64,
}

impl MarketImpactModel {
    pub fn new(permanent_coefficient: f64, temporary_coefficient: f64) -> Self {
        Self {
            permanent_coefficient,
            temporary_coefficient,
        }
    }

    /// Estimate impact of buying `quantity_usd` against the two-sided depth
    pub fn estimate(
        &self,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
        quantity_usd: f64,
        volatility: f64,
        mid_price: f64,
    ) -> MarketImpact {
        let total_depth = total_size(bids) + total_size(asks);
        let relative_order_size = if total_depth > 0.0 {
            quantity_usd / total_depth
        } else {
            0.0
        };

        let permanent_impact =
            self.permanent_coefficient * volatility * relative_order_size * mid_price;
        let temporary_impact = self.temporary_coefficient
            * relative_order_size.sqrt()
            * mid_price
            * (1.0 + volatility);

        let impact_usd = if mid_price > 0.0 {
            (permanent_impact + temporary_impact) * (quantity_usd / mid_price)
        } else {
            0.0
        };

        MarketImpact {
            relative_order_size,
            permanent_impact,
            temporary_impact,
            impact_usd: if impact_usd.is_finite() {
                impact_usd.max(0.0)
            } else {
                0.0
            },
        }
    }
}
