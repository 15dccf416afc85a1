//! Maker/taker split for a market order
//!
//! Stand-in heuristic, not a fitted classifier: a market order is modeled as at
//! least `min_taker_ratio` taker, rising to fully taker once the order is as
//! large as the ask-side notional depth.

use serde::{Deserialize, Serialize};

use crate::orderbook::{total_size, PriceLevel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakerTakerModel {
    pub min_taker_ratio: f64,
}

impl Default for MakerTakerModel {
    fn default() -> Self {
        Self {
            min_taker_ratio: 0.95,
        }
    }
}

/// Fractions of the order executed passively and aggressively; sums to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MakerTakerSplit {
    pub maker_ratio: f64,
    pub taker_ratio: f64,
}

impl MakerTakerModel {
    pub fn new(min_taker_ratio: f64) -> Self {
        Self { min_taker_ratio }
    }

    /// Predict the split for buying `quantity_usd`
    pub fn predict(&self, bids: &[PriceLevel], asks: &[PriceLevel], quantity_usd: f64) -> MakerTakerSplit {
        let mid_price = match (bids.first(), asks.first()) {
            (Some(bid), Some(ask)) => (bid.price_f64() + ask.price_f64()) / 2.0,
            _ => 0.0,
        };

        // Ask depth valued at mid
        let ask_notional = total_size(asks) * mid_price;
        let relative_order_size = if ask_notional > 0.0 {
            quantity_usd / ask_notional
        } else {
            1.0
        };

        let floor = self.min_taker_ratio.clamp(0.0, 1.0);
        let taker_ratio = if relative_order_size.is_nan() {
            1.0
        } else {
            relative_order_size.clamp(floor, 1.0)
        };

        MakerTakerSplit {
            maker_ratio: 1.0 - taker_ratio,
            taker_ratio,
        }
    }
}

/// Split using the default model
pub fn predict_maker_taker_proportion(
    bids: &[PriceLevel],
    asks: &[PriceLevel],
    quantity_usd: f64,
) -> MakerTakerSplit {
    MakerTakerModel::default().predict(bids, asks, quantity_usd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        (
            vec![PriceLevel::new(dec!(100), dec!(2)), PriceLevel::new(dec!(99), dec!(3))],
            vec![PriceLevel::new(dec!(101), dec!(2)), PriceLevel::new(dec!(102), dec!(3))],
        )
    }

    #[test]
    fn test_small_order_hits_floor() {
        let (bids, asks) = book();
        let split = predict_maker_taker_proportion(&bids, &asks, 100.0);
        assert_eq!(split.taker_ratio, 0.95);
        assert_eq!(split.maker_ratio + split.taker_ratio, 1.0);
    }

    #[test]
    fn test_large_order_fully_taker() {
        let (bids, asks) = book();
        let split = predict_maker_taker_proportion(&bids, &asks, 1_000_000.0);
        assert_eq!(split.taker_ratio, 1.0);
        assert_eq!(split.maker_ratio, 0.0);
    }

    #[test]
    fn test_between_floor_and_one() {
        let (bids, asks) = book();
        // ask notional = 5 * 100.5 = 502.5
        let split = predict_maker_taker_proportion(&bids, &asks, 490.0);
        assert!((split.taker_ratio - 490.0 / 502.5).abs() < 1e-15);
        assert_eq!(split.maker_ratio + split.taker_ratio, 1.0);
    }

    #[test]
    fn test_empty_side_fully_taker() {
        let (bids, _) = book();
        let split = predict_maker_taker_proportion(&bids, &[], 100.0);
        assert_eq!(split.taker_ratio, 1.0);
    }

    #[test]
    fn test_ratios_always_sum_to_one() {
        let (bids, asks) = book();
        for quantity in [0.01, 1.0, 50.0, 477.0, 500.0, 502.5, 10_000.0] {
            let split = predict_maker_taker_proportion(&bids, &asks, quantity);
            assert_eq!(split.maker_ratio + split.taker_ratio, 1.0);
            assert!((0.0..=1.0).contains(&split.maker_ratio));
            assert!((0.0..=1.0).contains(&split.taker_ratio));
        }
    }
}
