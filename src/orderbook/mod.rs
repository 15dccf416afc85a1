//! Order book module
//!
//! Maintains the live L2 snapshot per symbol and the derived mid-price,
//! spread and realized-volatility state the cost estimators read.

mod book;
mod manager;
mod summary;
mod volatility;

pub use book::{BookState, DEFAULT_HISTORY_CAPACITY};
pub(crate) use book::mid_and_spread;
pub use manager::{BookHandle, BookRegistry};
pub use summary::BookSummary;
pub use volatility::VolatilityTracker;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

/// A single rung of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    pub fn price_f64(&self) -> f64 {
        self.price.to_f64().unwrap_or(0.0)
    }

    pub fn size_f64(&self) -> f64 {
        self.size.to_f64().unwrap_or(0.0)
    }

    /// Price times size, saturating at `Decimal::MAX`
    pub fn notional(&self) -> Decimal {
        self.price.saturating_mul(self.size)
    }
}

/// Sum of sizes on one side
pub fn total_size(levels: &[PriceLevel]) -> f64 {
    levels.iter().map(PriceLevel::size_f64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_notional() {
        assert_eq!(PriceLevel::new(dec!(101.5), dec!(2)).notional(), dec!(203.0));
        assert_eq!(
            PriceLevel::new(Decimal::MAX, dec!(2)).notional(),
            Decimal::MAX
        );
    }
}
