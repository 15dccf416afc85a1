//! Error types for the cost simulator

use thiserror::Error;

/// Cost simulator errors
#[derive(Error, Debug)]
pub enum SimulatorError {
    /// Non-numeric or out-of-range price/size in an inbound snapshot.
    /// The whole snapshot is rejected and the book keeps its prior state.
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// A quote was requested while one or both book sides are empty
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid order request: {0}")]
    InvalidOrder(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Feed connection error: {0}")]
    FeedConnection(String),

    #[error("Feed message error: {0}")]
    FeedMessage(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),
}

impl SimulatorError {
    /// Whether this error means "no quote can be formed right now" rather than a bad request
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SimulatorError::InsufficientData(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SimulatorError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SimulatorError::FeedConnection(err.to_string())
    }
}

impl From<serde_json::Error> for SimulatorError {
    fn from(err: serde_json::Error) -> Self {
        SimulatorError::MalformedSnapshot(err.to_string())
    }
}

impl From<std::io::Error> for SimulatorError {
    fn from(err: std::io::Error) -> Self {
        SimulatorError::IpcError(err.to_string())
    }
}

impl From<config::ConfigError> for SimulatorError {
    fn from(err: config::ConfigError) -> Self {
        SimulatorError::ConfigError(err.to_string())
    }
}

impl From<prometheus::Error> for SimulatorError {
    fn from(err: prometheus::Error) -> Self {
        SimulatorError::MetricsError(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for SimulatorError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        SimulatorError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimulatorError>;
