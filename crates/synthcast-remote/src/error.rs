//! Error types for the remote control client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Protocol(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
