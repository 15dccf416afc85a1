//! Core order book state
//!
//! The feed sends full snapshots, not deltas: each side present in a message
//! replaces the stored side wholesale. Levels are kept in plain vectors, bids
//! best-first (descending) and asks best-first (ascending).

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{trace, warn};

use super::{BookSummary, PriceLevel, VolatilityTracker};
use crate::error::Result;
use crate::parser::{BookSnapshot, RawSnapshot};

/// Mid-price samples retained for volatility
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Live order book for a single symbol
#[derive(Debug, Clone)]
pub struct BookState {
    symbol: String,
    exchange: Option<String>,
    timestamp: Option<String>,
    /// Bids sorted by price descending (highest first)
    bids: Vec<PriceLevel>,
    /// Asks sorted by price ascending (lowest first)
    asks: Vec<PriceLevel>,
    mid_price: Option<Decimal>,
    spread: Option<Decimal>,
    history: VolatilityTracker,
    update_count: u64,
}

impl BookState {
    /// Create a new empty book
    pub fn new(symbol: &str) -> Self {
        Self::with_history_capacity(symbol, DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a new empty book with a custom mid-price history bound
    pub fn with_history_capacity(symbol: &str, capacity: usize) -> Self {
        Self {
            symbol: symbol.to_string(),
            exchange: None,
            timestamp: None,
            bids: Vec::new(),
            asks: Vec::new(),
            mid_price: None,
            spread: None,
            history: VolatilityTracker::new(capacity),
            update_count: 0,
        }
    }

    /// Validate and apply a raw feed snapshot.
    ///
    /// A malformed level rejects the whole message; the book is left exactly as it was.
    pub fn update(&mut self, raw: RawSnapshot) -> Result<()> {
        let snapshot = raw.validate()?;
        self.apply(snapshot);
        Ok(())
    }

    /// Apply an already validated snapshot.
    ///
    /// Returns true if the mid price was recomputed (both sides non-empty afterwards).
    pub fn apply(&mut self, snapshot: BookSnapshot) -> bool {
        self.timestamp = Some(
            snapshot
                .timestamp
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
        );
        if let Some(exchange) = snapshot.exchange {
            self.exchange = Some(exchange);
        }
        // The book keeps the symbol it was created for
        if let Some(symbol) = snapshot.symbol {
            if !symbol.eq_ignore_ascii_case(&self.symbol) {
                warn!(
                    book = %self.symbol,
                    message_symbol = %symbol,
                    "Snapshot symbol does not match book"
                );
            }
        }

        // sort_by is stable: equal prices keep feed order
        if let Some(mut bids) = snapshot.bids {
            bids.sort_by(|a, b| b.price.cmp(&a.price));
            self.bids = bids;
        }
        if let Some(mut asks) = snapshot.asks {
            asks.sort_by(|a, b| a.price.cmp(&b.price));
            self.asks = asks;
        }

        // With one side empty the previous mid/spread are kept, not cleared.
        // Callers see the last known values; use is_two_sided() to tell.
        let recomputed = match (self.bids.first(), self.asks.first()) {
            (Some(bid), Some(ask)) => match mid_and_spread(bid, ask) {
                Some((mid, spread)) => {
                    self.mid_price = Some(mid);
                    self.spread = Some(spread);
                    self.history.push(mid);
                    true
                }
                None => {
                    warn!(symbol = %self.symbol, "Best levels out of range, mid not updated");
                    false
                }
            },
            _ => false,
        };

        self.update_count += 1;

        trace!(
            symbol = %self.symbol,
            bids = self.bids.len(),
            asks = self.asks.len(),
            mid_price = ?self.mid_price,
            update_count = self.update_count,
            "Snapshot applied"
        );

        recomputed
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn exchange(&self) -> Option<&str> {
        self.exchange.as_deref()
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Current bids, best first
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    /// Current asks, best first
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Last computed mid price (may be stale if a side has since emptied)
    pub fn mid_price(&self) -> Option<Decimal> {
        self.mid_price
    }

    /// Last computed spread (may be stale if a side has since emptied)
    pub fn spread(&self) -> Option<Decimal> {
        self.spread
    }

    /// Both sides currently hold at least one level
    pub fn is_two_sided(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Realized volatility over the last `window` mid prices
    pub fn volatility(&self, window: usize) -> f64 {
        self.history.volatility(window)
    }

    /// Total bid size
    pub fn bid_depth(&self) -> Decimal {
        self.bids
            .iter()
            .fold(Decimal::ZERO, |acc, l| acc.saturating_add(l.size))
    }

    /// Total ask size
    pub fn ask_depth(&self) -> Decimal {
        self.asks
            .iter()
            .fold(Decimal::ZERO, |acc, l| acc.saturating_add(l.size))
    }

    /// Top `depth` levels of each side
    pub fn top_levels(&self, depth: usize) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        (
            self.bids.iter().take(depth).copied().collect(),
            self.asks.iter().take(depth).copied().collect(),
        )
    }

    /// Display summary with volatility over `volatility_window`
    pub fn summary(&self, volatility_window: usize) -> BookSummary {
        BookSummary {
            timestamp: self.timestamp.clone(),
            exchange: self.exchange.clone(),
            symbol: self.symbol.clone(),
            mid_price: self.mid_price,
            spread: self.spread,
            best_bid: self.best_bid().copied(),
            best_ask: self.best_ask().copied(),
            bid_depth: self.bid_depth(),
            ask_depth: self.ask_depth(),
            bid_levels: self.bids.len(),
            ask_levels: self.asks.len(),
            update_count: self.update_count,
            volatility: self.volatility(volatility_window),
        }
    }
}

/// Mid and spread of two best levels, `None` if the sum leaves `Decimal`'s range
pub(crate) fn mid_and_spread(bid: &PriceLevel, ask: &PriceLevel) -> Option<(Decimal, Decimal)> {
    let mid = bid.price.checked_add(ask.price)? / Decimal::TWO;
    let spread = ask.price.checked_sub(bid.price)?;
    Some((mid, spread))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, size: Decimal) -> PriceLevel {
        PriceLevel::new(price, size)
    }

    fn create_test_book() -> BookState {
        let mut book = BookState::new("BTC-USDT");
        book.apply(BookSnapshot::new(
            vec![level(dec!(99), dec!(3)), level(dec!(100), dec!(2))],
            vec![level(dec!(102), dec!(3)), level(dec!(101), dec!(2))],
        ));
        book
    }

    #[test]
    fn test_sides_sorted() {
        let book = create_test_book();
        assert_eq!(book.bids()[0].price, dec!(100));
        assert_eq!(book.bids()[1].price, dec!(99));
        assert_eq!(book.asks()[0].price, dec!(101));
        assert_eq!(book.asks()[1].price, dec!(102));
    }

    #[test]
    fn test_mid_price_and_spread() {
        let book = create_test_book();
        assert_eq!(book.mid_price(), Some(dec!(100.5)));
        assert_eq!(book.spread(), Some(dec!(1)));
        assert_eq!(book.history_len(), 1);
        assert_eq!(book.update_count(), 1);
    }

    #[test]
    fn test_one_sided_update_keeps_stale_mid() {
        let mut book = create_test_book();
        let recomputed = book.apply(BookSnapshot {
            asks: Some(vec![]),
            ..Default::default()
        });

        assert!(!recomputed);
        assert!(!book.is_two_sided());
        assert_eq!(book.mid_price(), Some(dec!(100.5)));
        assert_eq!(book.spread(), Some(dec!(1)));
        assert_eq!(book.history_len(), 1);
        assert_eq!(book.update_count(), 2);
    }

    #[test]
    fn test_absent_side_unchanged() {
        let mut book = create_test_book();
        book.apply(BookSnapshot {
            bids: Some(vec![level(dec!(100.8), dec!(1))]),
            ..Default::default()
        });

        assert_eq!(book.asks().len(), 2);
        assert_eq!(book.bids().len(), 1);
        assert_eq!(book.mid_price(), Some(dec!(100.9)));
        assert_eq!(book.spread(), Some(dec!(0.2)));
    }

    #[test]
    fn test_malformed_update_rejected_atomically() {
        let mut book = create_test_book();
        let raw = RawSnapshot::parse(r#"{"bids": [["98", "1"]], "asks": [["x", "1"]]}"#).unwrap();

        assert!(book.update(raw).is_err());
        assert_eq!(book.bids()[0].price, dec!(100));
        assert_eq!(book.asks()[0].price, dec!(101));
        assert_eq!(book.update_count(), 1);
    }

    #[test]
    fn test_identical_snapshot_is_idempotent() {
        let mut book = create_test_book();
        let mid = book.mid_price();
        let spread = book.spread();

        book.apply(BookSnapshot::new(
            vec![level(dec!(99), dec!(3)), level(dec!(100), dec!(2))],
            vec![level(dec!(102), dec!(3)), level(dec!(101), dec!(2))],
        ));

        assert_eq!(book.mid_price(), mid);
        assert_eq!(book.spread(), spread);
        assert_eq!(book.bids(), create_test_book().bids());
        assert_eq!(book.update_count(), 2);
    }

    #[test]
    fn test_history_bounded() {
        let mut book = BookState::new("BTC-USDT");
        for i in 0..150 {
            let bid = Decimal::from(100 + i);
            book.apply(BookSnapshot::new(
                vec![level(bid, dec!(1))],
                vec![level(bid + dec!(1), dec!(1))],
            ));
        }
        assert_eq!(book.history_len(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(book.update_count(), 150);
    }

    #[test]
    fn test_summary() {
        let book = create_test_book();
        let summary = book.summary(20);
        assert_eq!(summary.best_bid.map(|l| l.price), Some(dec!(100)));
        assert_eq!(summary.best_ask.map(|l| l.price), Some(dec!(101)));
        assert_eq!(summary.bid_depth, dec!(5));
        assert_eq!(summary.ask_depth, dec!(5));
        assert_eq!(summary.volatility, 0.0);
    }

    #[test]
    fn test_near_max_prices_do_not_overflow() {
        let huge_bid = Decimal::MAX - dec!(1);
        let huge_ask = Decimal::MAX;

        let mut book = create_test_book();
        let recomputed = book.apply(BookSnapshot::new(
            vec![level(huge_bid, dec!(1))],
            vec![level(huge_ask, dec!(1))],
        ));

        assert!(!recomputed);
        assert_eq!(book.mid_price(), Some(dec!(100.5)));
        assert_eq!(book.update_count(), 2);
    }

    #[test]
    fn test_near_max_sizes_saturate_depth() {
        let half = Decimal::MAX / dec!(2) + dec!(1);
        let mut book = BookState::new("BTC-USDT");
        book.apply(BookSnapshot::new(
            vec![level(dec!(100), half), level(dec!(99), half)],
            vec![level(dec!(101), dec!(1))],
        ));

        let summary = book.summary(20);
        assert_eq!(summary.bid_depth, Decimal::MAX);
        assert_eq!(summary.ask_depth, dec!(1));
    }

    #[test]
    fn test_out_of_range_update_rejected() {
        let mut book = create_test_book();
        let raw = RawSnapshot::parse(
            r#"{"bids": [["50000000000000000000000000000", "1"]],
                "asks": [["60000000000000000000000000000", "1"]]}"#,
        )
        .unwrap();

        assert!(book.update(raw).is_err());
        assert_eq!(book.best_bid().map(|l| l.price), Some(dec!(100)));
        assert_eq!(book.update_count(), 1);
    }

    #[test]
    fn test_message_symbol_does_not_rename_book() {
        let mut book = BookState::new("BTC-USDT-SWAP");
        book.apply(BookSnapshot {
            symbol: Some("btc-usdt-swap".to_string()),
            ..BookSnapshot::new(vec![level(dec!(100), dec!(1))], vec![level(dec!(101), dec!(1))])
        });
        assert_eq!(book.symbol(), "BTC-USDT-SWAP");
        assert_eq!(book.summary(20).symbol, "BTC-USDT-SWAP");
    }
}
