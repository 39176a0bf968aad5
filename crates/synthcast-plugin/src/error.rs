//! Error types for plugin hosting

use synthcast_core::{FourCharCode, StreamFormat};
use thiserror::Error;

/// Platform status code as returned by the plugin API (0 is success).
pub type OsStatus = i32;

pub const NO_ERR: OsStatus = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Search,
    Instantiation,
    FormatNegotiation,
    Initialization,
    Render,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStage::Search => write!(f, "component search"),
            LoadStage::Instantiation => write!(f, "plugin instantiation"),
            LoadStage::FormatNegotiation => write!(f, "stream format negotiation"),
            LoadStage::Initialization => write!(f, "plugin initialization"),
            LoadStage::Render => write!(f, "render"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Audio unit not found with subtype '{subtype}' and manufacturer '{manufacturer}'")]
    NotFound {
        subtype: FourCharCode,
        manufacturer: FourCharCode,
    },

    #[error("Failed to instantiate audio unit: status {0}")]
    InstantiationFailed(OsStatus),

    #[error("Failed to read output stream format: status {0}")]
    FormatUnavailable(OsStatus),

    #[error("Unusable output stream format: {0}")]
    UnsupportedFormat(StreamFormat),

    #[error("Audio unit initialization failed: status {0}")]
    InitializationFailed(OsStatus),

    #[error("Render failed: status {0}")]
    RenderFailed(OsStatus),
}

impl HostError {
    pub fn stage(&self) -> LoadStage {
        match self {
            HostError::NotFound { .. } => LoadStage::Search,
            HostError::InstantiationFailed(_) => LoadStage::Instantiation,
            HostError::FormatUnavailable(_) | HostError::UnsupportedFormat(_) => {
                LoadStage::FormatNegotiation
            }
            HostError::InitializationFailed(_) => LoadStage::Initialization,
            HostError::RenderFailed(_) => LoadStage::Render,
        }
    }

    /// Underlying platform status, when there is one.
    pub fn status(&self) -> Option<OsStatus> {
        match self {
            HostError::InstantiationFailed(code)
            | HostError::FormatUnavailable(code)
            | HostError::InitializationFailed(code)
            | HostError::RenderFailed(code) => Some(*code),
            HostError::NotFound { .. } | HostError::UnsupportedFormat(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
