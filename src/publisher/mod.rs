//! Publisher module for IPC communication
//!
//! Pushes book summaries to a display process over a Unix socket. Frames are a
//! 4-byte big-endian length followed by a MessagePack body.

use bytes::{BufMut, Bytes, BytesMut};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, SimulatorError};
use crate::orderbook::BookSummary;

/// Publisher for sending book summaries via Unix socket
pub struct Publisher {
    socket_path: String,
    stream: Mutex<Option<UnixStream>>,
}

impl Publisher {
    /// Create a new publisher
    pub async fn new(socket_path: &str) -> Result<Self> {
        let publisher = Self {
            socket_path: socket_path.to_string(),
            stream: Mutex::new(None),
        };

        // The display process may not be up yet
        if let Err(e) = publisher.connect().await {
            warn!(error = %e, "Initial IPC connection failed, will retry on publish");
        }

        Ok(publisher)
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    /// Connect to the Unix socket
    async fn connect(&self) -> Result<()> {
        let path = Path::new(&self.socket_path);

        if !path.exists() {
            return Err(SimulatorError::IpcError(format!(
                "Socket path does not exist: {}",
                self.socket_path
            )));
        }

        let stream = UnixStream::connect(path).await.map_err(|e| {
            SimulatorError::IpcError(format!("Failed to connect to {}: {}", self.socket_path, e))
        })?;

        let mut guard = self.stream.lock().await;
        *guard = Some(stream);

        info!(path = %self.socket_path, "Connected to IPC socket");
        Ok(())
    }

    /// Publish a book summary. Write failures drop the connection and are
    /// retried on the next publish; they are never returned to the caller.
    pub async fn publish(&self, summary: &BookSummary) -> Result<()> {
        let frame = encode_frame(summary)?;

        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            drop(guard);
            if let Err(e) = self.connect().await {
                debug!(error = %e, "Failed to reconnect to IPC socket");
                return Ok(());
            }
            guard = self.stream.lock().await;
        }

        if let Some(stream) = guard.as_mut() {
            match stream.write_all(&frame).await {
                Ok(_) => {
                    debug!(
                        symbol = %summary.symbol,
                        update_count = summary.update_count,
                        "Published book summary"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Failed to write to IPC socket");
                    *guard = None;
                }
            }
        }

        Ok(())
    }
}

/// Length-prefixed MessagePack frame
pub fn encode_frame(summary: &BookSummary) -> Result<Bytes> {
    let body = rmp_serde::to_vec_named(summary)?;
    let len = u32::try_from(body.len())
        .map_err(|_| SimulatorError::SerializationError("frame too large".to_string()))?;

    let mut frame = BytesMut::with_capacity(4 + body.len());
    frame.put_u32(len);
    frame.put_slice(&body);
    Ok(frame.freeze())
}

/// Decode a frame produced by `encode_frame`
pub fn decode_frame(frame: &[u8]) -> Result<BookSummary> {
    if frame.len() < 4 {
        return Err(SimulatorError::SerializationError("frame shorter than header".to_string()));
    }
    let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let body = frame
        .get(4..4 + len)
        .ok_or_else(|| SimulatorError::SerializationError("truncated frame".to_string()))?;
    rmp_serde::from_slice(body).map_err(|e| SimulatorError::SerializationError(e.to_string()))
}
