//! Parser module for L2 order book feed messages
//!
//! The feed sends full snapshots shaped like
//! `{"timestamp": "...", "exchange": "okx", "symbol": "BTC-USDT-SWAP",
//!   "bids": [["95000.1", "1.5"], ...], "asks": [["95000.2", "0.7"], ...]}`.
//! Numerics are validated here, once, so the book never sees a half-parsed message.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

use crate::error::{Result, SimulatorError};
use crate::orderbook::{PriceLevel, Side};

/// Largest accepted price or size (1e12). Keeps mid, depth and notional
/// arithmetic well inside `Decimal`'s range.
pub const MAX_LEVEL_VALUE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Snapshot message as it arrives on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSnapshot {
    /// Exchange timestamp (string or number)
    #[serde(default)]
    pub timestamp: Option<Value>,

    #[serde(default)]
    pub exchange: Option<String>,

    #[serde(default)]
    pub symbol: Option<String>,

    /// Bid levels as `[price, size, ...]`; absent means "unchanged"
    #[serde(default)]
    pub bids: Option<Vec<Vec<Value>>>,

    /// Ask levels as `[price, size, ...]`; absent means "unchanged"
    #[serde(default)]
    pub asks: Option<Vec<Vec<Value>>>,
}

/// Validated snapshot ready to be applied to a book
#[derive(Debug, Clone, Default)]
pub struct BookSnapshot {
    pub timestamp: Option<String>,
    pub exchange: Option<String>,
    pub symbol: Option<String>,
    pub bids: Option<Vec<PriceLevel>>,
    pub asks: Option<Vec<PriceLevel>>,
}

impl BookSnapshot {
    /// Snapshot replacing both sides
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self {
            bids: Some(bids),
            asks: Some(asks),
            ..Default::default()
        }
    }
}

impl RawSnapshot {
    /// Parse a raw feed message
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Validate every level, failing the whole snapshot on the first bad value
    pub fn validate(self) -> Result<BookSnapshot> {
        let bids = self
            .bids
            .map(|levels| parse_levels(Side::Bid, &levels))
            .transpose()?;
        let asks = self
            .asks
            .map(|levels| parse_levels(Side::Ask, &levels))
            .transpose()?;

        let timestamp = self.timestamp.and_then(|ts| match ts {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        });

        Ok(BookSnapshot {
            timestamp,
            exchange: self.exchange,
            symbol: self.symbol,
            bids,
            asks,
        })
    }
}

/// Parse and validate one side of the book
fn parse_levels(side: Side, raw: &[Vec<Value>]) -> Result<Vec<PriceLevel>> {
    raw.iter()
        .enumerate()
        .map(|(index, pair)| {
            if pair.len() < 2 {
                return Err(SimulatorError::MalformedSnapshot(format!(
                    "{:?} level {} has {} fields, expected [price, size]",
                    side,
                    index,
                    pair.len()
                )));
            }

            let price = parse_decimal(&pair[0]).ok_or_else(|| {
                SimulatorError::MalformedSnapshot(format!(
                    "{:?} level {}: invalid price {}",
                    side, index, pair[0]
                ))
            })?;
            let size = parse_decimal(&pair[1]).ok_or_else(|| {
                SimulatorError::MalformedSnapshot(format!(
                    "{:?} level {}: invalid size {}",
                    side, index, pair[1]
                ))
            })?;

            if price <= Decimal::ZERO {
                return Err(SimulatorError::MalformedSnapshot(format!(
                    "{:?} level {}: price must be positive, got {}",
                    side, index, price
                )));
            }
            if price > MAX_LEVEL_VALUE || size > MAX_LEVEL_VALUE {
                return Err(SimulatorError::MalformedSnapshot(format!(
                    "{:?} level {}: price {} or size {} exceeds {}",
                    side, index, price, size, MAX_LEVEL_VALUE
                )));
            }
            if size < Decimal::ZERO {
                return Err(SimulatorError::MalformedSnapshot(format!(
                    "{:?} level {}: size must be non-negative, got {}",
                    side, index, size
                )));
            }

            Ok(PriceLevel { price, size })
        })
        .collect()
}

/// Decimal from a JSON string or number, accepting scientific notation
fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
