//! Walk-the-book slippage for a hypothetical market buy

use serde::{Deserialize, Serialize};

use crate::orderbook::PriceLevel;

/// Result of sweeping the ask ladder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlippageEstimate {
    /// Slippage in quote currency, floored at zero
    pub slippage_usd: f64,
    /// Average execution price of the sweep
    pub realized_price: f64,
    /// Order size in base units (quantity_usd / mid_price)
    pub order_size_base: f64,
    /// The sweep ran past the last ask and the remainder was priced at it
    pub liquidity_exhausted: bool,
}

impl SlippageEstimate {
    fn zero(mid_price: f64) -> Self {
        Self {
            slippage_usd: 0.0,
            realized_price: mid_price,
            order_size_base: 0.0,
            liquidity_exhausted: false,
        }
    }
}

/// Estimate the cost of sweeping `asks` (best first) with a market buy of `quantity_usd`.
///
/// Any size left once the ladder is exhausted is priced at the last ask
/// (worst observed price) instead of failing. With no asks at all the realized
/// price falls back to `mid_price`, giving zero slippage.
pub fn estimate_slippage(asks: &[PriceLevel], quantity_usd: f64, mid_price: f64) -> SlippageEstimate {
    if !is_positive(mid_price) || !is_positive(quantity_usd) {
        return SlippageEstimate::zero(mid_price);
    }

    let order_size_base = quantity_usd / mid_price;

    let mut notional = 0.0;
    let mut filled = 0.0;
    let mut remaining = order_size_base;

    for level in asks {
        if remaining <= 0.0 {
            break;
        }
        let executed = level.size_f64().min(remaining);
        notional += level.price_f64() * executed;
        filled += executed;
        remaining -= executed;
    }

    let mut liquidity_exhausted = false;
    if remaining > 0.0 {
        if let Some(last) = asks.last() {
            notional += last.price_f64() * remaining;
            filled += remaining;
            liquidity_exhausted = true;
        }
    }

    let realized_price = if filled > 0.0 {
        notional / filled
    } else {
        mid_price
    };

    // A buy can't realize below mid in this model; negatives are clamped
    let slippage_usd = ((realized_price - mid_price) * order_size_base).max(0.0);

    SlippageEstimate {
        slippage_usd,
        realized_price,
        order_size_base,
        liquidity_exhausted,
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
