//! L2 feed adapter: WebSocket connection management and snapshot dispatch

mod client;
mod manager;

pub use client::FeedClient;
pub use manager::{backoff_delay, spawn_status_logger, FeedManager};
