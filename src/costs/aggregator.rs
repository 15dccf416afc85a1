//! Combines the estimators into a single quote

use rust_decimal::prelude::ToPrimitive;
use tracing::info;

use super::{
    estimate_slippage, percent_of, CostQuote, FeeSchedule, MakerTakerModel, MarketImpactModel,
    OrderRequest, SlippageModel, SlippageObservation,
};
use crate::config::CostModelConfig;
use crate::error::{Result, SimulatorError};
use crate::orderbook::{mid_and_spread, BookState};

/// Runs slippage, fee, impact and maker/taker estimation against one snapshot
#[derive(Debug, Clone, Default)]
pub struct CostAggregator {
    impact: MarketImpactModel,
    fees: FeeSchedule,
    maker_taker: MakerTakerModel,
    slippage_model: SlippageModel,
}

impl CostAggregator {
    pub fn new(config: &CostModelConfig) -> Self {
        Self {
            impact: config.impact.clone(),
            fees: config.fees.clone(),
            maker_taker: config.maker_taker.clone(),
            slippage_model: SlippageModel::new(config.slippage.clone()),
        }
    }

    pub fn fee_schedule(&self) -> &FeeSchedule {
        &self.fees
    }

    pub fn impact_model(&self) -> &MarketImpactModel {
        &self.impact
    }

    pub fn slippage_model(&self) -> &SlippageModel {
        &self.slippage_model
    }

    /// Price a market buy against `book`.
    ///
    /// Every estimator reads the same `book`; callers hand in a snapshot taken
    /// under one read lock. Fails with `InsufficientData` when either side is
    /// empty and `InvalidOrder` for a bad request; there are no partial quotes.
    pub fn compute_cost(&mut self, book: &BookState, request: &OrderRequest) -> Result<CostQuote> {
        request.validate()?;

        let (best_bid, best_ask) = match (book.best_bid(), book.best_ask()) {
            (Some(bid), Some(ask)) => (bid, ask),
            _ => {
                return Err(SimulatorError::InsufficientData(format!(
                    "{} has {} bid and {} ask levels",
                    book.symbol(),
                    book.bids().len(),
                    book.asks().len()
                )))
            }
        };

        let (mid_price, spread) = mid_and_spread(best_bid, best_ask).ok_or_else(|| {
            SimulatorError::InsufficientData(format!(
                "{} best levels out of range for a mid price",
                book.symbol()
            ))
        })?;
        let mid = mid_price.to_f64().unwrap_or(0.0);

        let quantity = request.quantity_usd;
        let volatility = request.volatility;

        let slippage = estimate_slippage(book.asks(), quantity, mid);
        let fees = self.fees.estimate(quantity, &request.fee_tier);
        let impact = self
            .impact
            .estimate(book.bids(), book.asks(), quantity, volatility, mid);
        let split = self.maker_taker.predict(book.bids(), book.asks(), quantity);

        let net_cost_usd = slippage.slippage_usd + fees.fees_usd + impact.impact_usd;

        // Predict before learning from this sample
        let ask_notional: f64 = book
            .asks()
            .iter()
            .map(|l| l.price_f64() * l.size_f64())
            .sum();
        let modeled_slippage_usd = self
            .slippage_model
            .predict(quantity, ask_notional, volatility);
        self.slippage_model.add_observation(SlippageObservation {
            order_size: quantity,
            market_depth: ask_notional,
            volatility,
            slippage: slippage.slippage_usd,
        });

        let quote = CostQuote {
            symbol: book.symbol().to_string(),
            quantity_usd: quantity,
            mid_price,
            spread,
            volatility,
            fee_tier: request.fee_tier.clone(),
            taker_fee_rate: fees.taker_rate,
            fee_tier_fallback: fees.fallback,
            slippage_usd: slippage.slippage_usd,
            fees_usd: fees.fees_usd,
            impact_usd: impact.impact_usd,
            net_cost_usd,
            slippage_pct: percent_of(slippage.slippage_usd, quantity),
            fees_pct: percent_of(fees.fees_usd, quantity),
            impact_pct: percent_of(impact.impact_usd, quantity),
            net_cost_pct: percent_of(net_cost_usd, quantity),
            maker_ratio: split.maker_ratio,
            taker_ratio: split.taker_ratio,
            liquidity_exhausted: slippage.liquidity_exhausted,
            modeled_slippage_usd,
        };

        info!(
            symbol = %quote.symbol,
            quantity_usd = quantity,
            mid_price = %mid_price,
            volatility,
            slippage_usd = quote.slippage_usd,
            fees_usd = quote.fees_usd,
            impact_usd = quote.impact_usd,
            net_cost_usd = quote.net_cost_usd,
            maker_ratio = quote.maker_ratio,
            taker_ratio = quote.taker_ratio,
            "Cost quote computed"
        );

        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::PriceLevel;
    use crate::parser::BookSnapshot;
    use rust_decimal_macros::dec;

    fn scenario_book() -> BookState {
        let mut book = BookState::new("BTC-USDT");
        book.apply(BookSnapshot::new(
            vec![
                PriceLevel::new(dec!(100), dec!(2)),
                PriceLevel::new(dec!(99), dec!(3)),
            ],
            vec![
                PriceLevel::new(dec!(101), dec!(2)),
                PriceLevel::new(dec!(102), dec!(3)),
            ],
        ));
        book
    }

    #[test]
    fn test_scenario_quote() {
        let book = scenario_book();
        let mut aggregator = CostAggregator::default();
        let quote = aggregator
            .compute_cost(&book, &OrderRequest::new(100.0, 0.05, "VIP 0"))
            .unwrap();

        let base = 100.0 / 100.5;
        let impact = MarketImpactModel::default().estimate(book.bids(), book.asks(), 100.0, 0.05, 100.5);

        assert_eq!(quote.mid_price, dec!(100.5));
        assert_eq!(quote.spread, dec!(1));
        assert!((quote.slippage_usd - 0.5 * base).abs() < 1e-12);
        assert!((quote.fees_usd - 0.1).abs() < 1e-15);
        assert_eq!(quote.impact_usd, impact.impact_usd);
        assert_eq!(
            quote.net_cost_usd,
            quote.slippage_usd + quote.fees_usd + quote.impact_usd
        );
        assert_eq!(quote.taker_ratio, 0.95);
        assert!(!quote.fee_tier_fallback);
        assert!(!quote.liquidity_exhausted);
        assert!((quote.fees_pct - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic_components() {
        let book = scenario_book();
        let request = OrderRequest::new(100.0, 0.05, "VIP 0");
        let first = CostAggregator::default().compute_cost(&book, &request).unwrap();
        let second = CostAggregator::default().compute_cost(&book, &request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_side_unavailable() {
        let mut book = BookState::new("BTC-USDT");
        book.apply(BookSnapshot::new(vec![PriceLevel::new(dec!(100), dec!(1))], vec![]));

        let err = CostAggregator::default()
            .compute_cost(&book, &OrderRequest::new(100.0, 0.05, "VIP 0"))
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_stale_mid_not_used_for_quotes() {
        let mut book = scenario_book();
        book.apply(BookSnapshot {
            bids: Some(vec![]),
            ..Default::default()
        });
        assert!(book.mid_price().is_some());

        let result = CostAggregator::default()
            .compute_cost(&book, &OrderRequest::new(100.0, 0.05, "VIP 0"));
        assert!(matches!(result, Err(SimulatorError::InsufficientData(_))));
    }

    #[test]
    fn test_invalid_order_rejected() {
        let book = scenario_book();
        let result = CostAggregator::default()
            .compute_cost(&book, &OrderRequest::new(-1.0, 0.05, "VIP 0"));
        assert!(matches!(result, Err(SimulatorError::InvalidOrder(_))));
    }

    #[test]
    fn test_unknown_tier_flagged() {
        let book = scenario_book();
        let quote = CostAggregator::default()
            .compute_cost(&book, &OrderRequest::new(1000.0, 0.05, "Gold"))
            .unwrap();
        assert!(quote.fee_tier_fallback);
        assert_eq!(quote.taker_fee_rate, 0.001);
        assert_eq!(quote.fees_usd, 1.0);
    }

    #[test]
    fn test_quotes_feed_slippage_model() {
        let book = scenario_book();
        let mut aggregator = CostAggregator::default();
        for quantity in [10.0, 50.0, 100.0, 150.0, 200.0, 300.0] {
            aggregator
                .compute_cost(&book, &OrderRequest::new(quantity, 0.05, "VIP 1"))
                .unwrap();
        }
        assert_eq!(aggregator.slippage_model().len(), 6);
    }

    #[test]
    fn test_uses_configured_coefficients() {
        let book = scenario_book();
        let request = OrderRequest::new(100.0, 0.05, "VIP 0");

        let mut config = CostModelConfig::default();
        config.impact.permanent_coefficient = 0.0;
        config.impact.temporary_coefficient = 0.0;

        let quote = CostAggregator::new(&config).compute_cost(&book, &request).unwrap();
        assert_eq!(quote.impact_usd, 0.0);
    }

    #[test]
    fn test_out_of_range_best_levels_unavailable() {
        let mut book = BookState::new("BTC-USDT");
        book.apply(BookSnapshot::new(
            vec![PriceLevel::new(rust_decimal::Decimal::MAX - dec!(1), dec!(1))],
            vec![PriceLevel::new(rust_decimal::Decimal::MAX, dec!(1))],
        ));

        let err = CostAggregator::default()
            .compute_cost(&book, &OrderRequest::new(100.0, 0.05, "VIP 0"))
            .unwrap_err();
        assert!(err.is_unavailable());
    }
}
