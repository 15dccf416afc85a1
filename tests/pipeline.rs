//! End-to-end tests: raw feed messages in, cost quotes out

use std::sync::Arc;

use l2_cost_simulator::costs::MarketImpactModel;
use l2_cost_simulator::orderbook::PriceLevel;
use l2_cost_simulator::{
    AppState, BookRegistry, BookSnapshot, Config, CostModelConfig, OrderRequest, RawSnapshot,
    SimulatorError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const SCENARIO: &str = r#"{
    "timestamp": "2025-05-04T10:39:13Z",
    "exchange": "OKX",
    "symbol": "BTC-USDT-SWAP",
    "asks": [["101", "2"], ["102", "3"]],
    "bids": [["100", "2"], ["99", "3"]]
}"#;

fn app_state(symbols: &[&str]) -> Arc<AppState> {
    let config = Config {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    Arc::new(AppState::new(config, &CostModelConfig::default(), None).unwrap())
}

fn generation(g: u32) -> BookSnapshot {
    let bid = Decimal::from(1000 + g);
    BookSnapshot::new(
        vec![
            PriceLevel::new(bid, dec!(1)),
            PriceLevel::new(bid - dec!(1), dec!(2)),
        ],
        vec![
            PriceLevel::new(bid + dec!(1), dec!(1)),
            PriceLevel::new(bid + dec!(2), dec!(2)),
        ],
    )
}

#[tokio::test]
async fn scenario_from_raw_message() {
    let state = app_state(&["BTC-USDT-SWAP"]);
    state.ingest("BTC-USDT-SWAP", SCENARIO).await.unwrap();

    let handle = state.books.get("BTC-USDT-SWAP").unwrap();
    let book = handle.snapshot().await;
    assert_eq!(book.mid_price(), Some(dec!(100.5)));
    assert_eq!(book.spread(), Some(dec!(1)));
    assert_eq!(book.exchange(), Some("OKX"));
    assert_eq!(book.timestamp(), Some("2025-05-04T10:39:13Z"));

    let quote = state
        .quote("BTC-USDT-SWAP", &OrderRequest::new(100.0, 0.05, "VIP 0"))
        .await
        .unwrap();

    // Fully filled at 101: (101 - 100.5) * (100 / 100.5)
    let expected_slippage = 0.5 * (100.0 / 100.5);
    let impact = MarketImpactModel::default().estimate(book.bids(), book.asks(), 100.0, 0.05, 100.5);

    assert!((quote.slippage_usd - expected_slippage).abs() < 1e-12);
    assert!((quote.fees_usd - 0.1).abs() < 1e-15);
    assert_eq!(quote.impact_usd, impact.impact_usd);
    assert_eq!(quote.maker_ratio + quote.taker_ratio, 1.0);

    // Same book, fresh state: identical quote
    let other = app_state(&["BTC-USDT-SWAP"]);
    other.ingest("BTC-USDT-SWAP", SCENARIO).await.unwrap();
    let again = other
        .quote("BTC-USDT-SWAP", &OrderRequest::new(100.0, 0.05, "VIP 0"))
        .await
        .unwrap();
    assert_eq!(quote, again);
}

#[tokio::test]
async fn malformed_message_leaves_book_untouched() {
    let state = app_state(&["BTC-USDT-SWAP"]);
    state.ingest("BTC-USDT-SWAP", SCENARIO).await.unwrap();

    let bad = r#"{"bids": [["100", "2"]], "asks": [["101", "abc"]]}"#;
    let err = state.ingest("BTC-USDT-SWAP", bad).await.unwrap_err();
    assert!(matches!(err, SimulatorError::MalformedSnapshot(_)));

    let book = state.books.get("BTC-USDT-SWAP").unwrap().snapshot().await;
    assert_eq!(book.update_count(), 1);
    assert_eq!(book.bids().len(), 2);
    assert_eq!(book.asks()[0].price, dec!(101));
}

#[tokio::test]
async fn symbols_are_isolated() {
    let state = app_state(&["BTC-USDT-SWAP", "ETH-USDT-SWAP"]);
    state.ingest("BTC-USDT-SWAP", SCENARIO).await.unwrap();

    assert!(state
        .quote("BTC-USDT-SWAP", &OrderRequest::new(100.0, 0.05, "VIP 0"))
        .await
        .is_ok());

    let err = state
        .quote("ETH-USDT-SWAP", &OrderRequest::new(100.0, 0.05, "VIP 0"))
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_torn_books() {
    let registry = Arc::new(BookRegistry::new(
        &["BTC-USDT-SWAP".to_string()],
        64,
        &CostModelConfig::default(),
    ));
    let handle = registry.get("BTC-USDT-SWAP").unwrap();
    handle.apply(generation(0)).await;

    let writer = {
        let handle = handle.clone();
        tokio::spawn(async move {
            for g in 1..=500 {
                handle.apply(generation(g)).await;
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    let book = handle.snapshot().await;
                    let bid = book.best_bid().unwrap().price;
                    let ask = book.best_ask().unwrap().price;

                    // Both sides and the derived fields come from one generation
                    assert_eq!(ask - bid, dec!(1));
                    assert_eq!(book.bids()[1].price, bid - dec!(1));
                    assert_eq!(book.asks()[1].price, ask + dec!(1));
                    assert_eq!(book.mid_price(), Some((bid + ask) / dec!(2)));
                    assert_eq!(book.spread(), Some(dec!(1)));

                    let quote = handle
                        .compute_cost(&OrderRequest::new(500.0, 0.02, "VIP 2"))
                        .await
                        .unwrap();
                    assert_eq!(quote.spread, dec!(1));
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    assert_eq!(handle.snapshot().await.update_count(), 501);
}

#[test]
fn raw_update_through_handle() {
    tokio_test::block_on(async {
        let registry = BookRegistry::new(
            &["BTC-USDT-SWAP".to_string()],
            16,
            &CostModelConfig::default(),
        );
        let handle = registry.get("btc-usdt-swap").unwrap();

        let raw = RawSnapshot::parse(SCENARIO).unwrap();
        handle.update(raw).await.unwrap();
        assert_eq!(handle.mid_price().await, Some(dec!(100.5)));

        let rejected = RawSnapshot::parse(r#"{"bids": [["-1", "2"]]}"#).unwrap();
        assert!(handle.update(rejected).await.is_err());
        assert_eq!(handle.current_bids().await.len(), 2);
    });
}

#[tokio::test]
async fn out_of_range_levels_are_rejected_not_fatal() {
    let state = app_state(&["BTC-USDT-SWAP"]);
    state.ingest("BTC-USDT-SWAP", SCENARIO).await.unwrap();

    let huge_prices = r#"{"bids": [["50000000000000000000000000000", "1"]],
                          "asks": [["60000000000000000000000000000", "1"]]}"#;
    let err = state.ingest("BTC-USDT-SWAP", huge_prices).await.unwrap_err();
    assert!(matches!(err, SimulatorError::MalformedSnapshot(_)));

    let huge_sizes = r#"{"bids": [["100", "50000000000000000000000000000"],
                                  ["99", "50000000000000000000000000000"]]}"#;
    assert!(state.ingest("BTC-USDT-SWAP", huge_sizes).await.is_err());

    let handle = state.books.get("BTC-USDT-SWAP").unwrap();
    let summary = handle.summary(20).await;
    assert_eq!(summary.mid_price, Some(dec!(100.5)));
    assert_eq!(summary.bid_depth, dec!(5));
    assert_eq!(summary.update_count, 1);
}
