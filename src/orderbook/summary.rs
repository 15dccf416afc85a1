//! Order book summary for display and publishing

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PriceLevel;

/// Point-in-time view of a book's derived state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    pub timestamp: Option<String>,
    pub exchange: Option<String>,
    pub symbol: String,

    /// Last computed mid price
    pub mid_price: Option<Decimal>,

    /// Last computed spread (best ask - best bid)
    pub spread: Option<Decimal>,

    pub best_bid: Option<PriceLevel>,
    pub best_ask: Option<PriceLevel>,

    /// Total bid size
    pub bid_depth: Decimal,

    /// Total ask size
    pub ask_depth: Decimal,

    pub bid_levels: usize,
    pub ask_levels: usize,
    pub update_count: u64,

    /// Realized volatility (std / mean of recent mid prices)
    pub volatility: f64,
}

impl BookSummary {
    /// Both sides populated, so mid and spread are current
    pub fn is_healthy(&self) -> bool {
        self.mid_price.is_some() && self.bid_levels > 0 && self.ask_levels > 0
    }

    /// Spread relative to mid, in basis points
    pub fn spread_bps(&self) -> Option<Decimal> {
        match (self.spread, self.mid_price) {
            (Some(spread), Some(mid)) if mid > Decimal::ZERO => spread
                .checked_div(mid)?
                .checked_mul(Decimal::from(10000)),
            _ => None,
        }
    }
}
