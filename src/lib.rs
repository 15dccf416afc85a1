//! L2 Cost Simulator - Library
//!
//! Maintains live L2 order books fed from a WebSocket stream and prices
//! hypothetical market orders against them: expected slippage, exchange fees,
//! market impact, maker/taker split and net cost.

pub mod config;
pub mod costs;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod orderbook;
pub mod parser;
pub mod publisher;
pub mod server;
pub mod state;

pub use config::{Config, CostModelConfig};
pub use costs::{CostAggregator, CostQuote, FeeSchedule, OrderRequest};
pub use error::{Result, SimulatorError};
pub use feed::{FeedClient, FeedManager};
pub use metrics::Metrics;
pub use orderbook::{BookHandle, BookRegistry, BookState, BookSummary, PriceLevel, Side};
pub use parser::{BookSnapshot, RawSnapshot};
pub use publisher::Publisher;
pub use state::AppState;
