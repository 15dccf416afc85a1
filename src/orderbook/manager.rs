//! Per-symbol book registry
//!
//! Each symbol owns its own lock and its own cost aggregator; symbols never
//! contend with each other. The feed task is the single writer of a book, quote
//! requests are readers that copy the book out under one read lock and price
//! against the copy.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{BookState, BookSummary, PriceLevel};
use crate::config::CostModelConfig;
use crate::costs::{CostAggregator, CostQuote, OrderRequest};
use crate::error::{Result, SimulatorError};
use crate::parser::{BookSnapshot, RawSnapshot};

/// Shared access to one symbol's book and cost pipeline
#[derive(Debug)]
pub struct BookHandle {
    symbol: String,
    book: RwLock<BookState>,
    aggregator: Mutex<CostAggregator>,
}

impl BookHandle {
    pub fn new(symbol: &str, history_capacity: usize, aggregator: CostAggregator) -> Self {
        Self {
            symbol: symbol.to_string(),
            book: RwLock::new(BookState::with_history_capacity(symbol, history_capacity)),
            aggregator: Mutex::new(aggregator),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Validate then apply a feed message. Validation happens before the write
    /// lock is taken; a rejected message never touches the book.
    pub async fn update(&self, raw: RawSnapshot) -> Result<()> {
        let snapshot = raw.validate()?;
        self.apply(snapshot).await;
        Ok(())
    }

    /// Apply a validated snapshot under the write lock
    pub async fn apply(&self, snapshot: BookSnapshot) -> bool {
        self.book.write().await.apply(snapshot)
    }

    /// Consistent copy of the whole book
    pub async fn snapshot(&self) -> BookState {
        self.book.read().await.clone()
    }

    pub async fn current_bids(&self) -> Vec<PriceLevel> {
        self.book.read().await.bids().to_vec()
    }

    pub async fn current_asks(&self) -> Vec<PriceLevel> {
        self.book.read().await.asks().to_vec()
    }

    pub async fn mid_price(&self) -> Option<Decimal> {
        self.book.read().await.mid_price()
    }

    pub async fn spread(&self) -> Option<Decimal> {
        self.book.read().await.spread()
    }

    pub async fn volatility(&self, window: usize) -> f64 {
        self.book.read().await.volatility(window)
    }

    pub async fn summary(&self, volatility_window: usize) -> BookSummary {
        self.book.read().await.summary(volatility_window)
    }

    pub async fn top_levels(&self, depth: usize) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        self.book.read().await.top_levels(depth)
    }

    /// Price an order against a snapshot of the current book
    pub async fn compute_cost(&self, request: &OrderRequest) -> Result<CostQuote> {
        let snapshot = self.snapshot().await;
        let mut aggregator = self.aggregator.lock().await;
        aggregator.compute_cost(&snapshot, request)
    }
}

/// Books for every tracked symbol, fixed at startup
#[derive(Debug, Default)]
pub struct BookRegistry {
    books: HashMap<String, Arc<BookHandle>>,
}

impl BookRegistry {
    /// Create one book per symbol, each with its own aggregator built from `model`
    pub fn new(symbols: &[String], history_capacity: usize, model: &CostModelConfig) -> Self {
        let books = symbols
            .iter()
            .map(|symbol| {
                let key = normalize(symbol);
                let handle = BookHandle::new(&key, history_capacity, CostAggregator::new(model));
                (key, Arc::new(handle))
            })
            .collect();

        Self { books }
    }

    /// Look up a symbol (case-insensitive)
    pub fn get(&self, symbol: &str) -> Result<Arc<BookHandle>> {
        self.books
            .get(&normalize(symbol))
            .cloned()
            .ok_or_else(|| SimulatorError::UnknownSymbol(symbol.to_string()))
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.books.contains_key(&normalize(symbol))
    }

    /// Tracked symbols, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.books.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn handles(&self) -> impl Iterator<Item = &Arc<BookHandle>> {
        self.books.values()
    }

    /// Summaries of all books, sorted by symbol
    pub async fn summaries(&self, volatility_window: usize) -> Vec<BookSummary> {
        let mut summaries = Vec::with_capacity(self.books.len());
        for symbol in self.symbols() {
            if let Some(handle) = self.books.get(&symbol) {
                summaries.push(handle.summary(volatility_window).await);
            }
        }
        summaries
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
