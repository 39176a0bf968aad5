//! Error types for the transport sink.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    /// No consumer is attached, or the sink was closed.
    #[error("Transport unavailable")]
    TransportUnavailable,

    /// The hand-off queue is full; the block was dropped.
    #[error("Transport queue full, block dropped")]
    Backpressure,

    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Errors a render tick recovers from by skipping the send.
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::TransportUnavailable | SinkError::Backpressure)
    }
}

pub type Result<T> = std::result::Result<T, SinkError>;
