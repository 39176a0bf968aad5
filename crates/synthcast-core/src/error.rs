//! Error types for core value construction.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("audio block needs at least one channel")]
    NoChannels,

    #[error("channel {channel} has {len} frames, expected {expected}")]
    RaggedChannel {
        channel: usize,
        len: usize,
        expected: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FourCcError {
    #[error("four-character code '{code}' must be exactly 4 characters, got {len}")]
    InvalidLength { code: String, len: usize },

    #[error("four-character code '{0}' must be ASCII")]
    NonAscii(String),
}
