//! Centralized error type for the synthcast umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use std::fmt;
use synthcast_core::FourCcError;
use synthcast_plugin::LoadStage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {field}: {source}")]
    InvalidCode {
        field: &'static str,
        #[source]
        source: FourCcError,
    },

    #[error("buffer size must be greater than 0")]
    ZeroBufferSize,

    #[error("TCP target '{0}' must be HOST:PORT")]
    InvalidTcpTarget(String),

    #[error("no instrument selected")]
    MissingInstrument,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Host(#[from] synthcast_plugin::HostError),

    #[error("MIDI: {0}")]
    Midi(#[from] synthcast_midi::MidiError),

    #[error("Transport: {0}")]
    Sink(#[from] synthcast_sink::SinkError),

    #[error("RPC: {0}")]
    Rpc(#[from] synthcast_remote::RpcError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<FourCcError> for Error {
    fn from(source: FourCcError) -> Self {
        Error::Config(ConfigError::InvalidCode {
            field: "four-character code",
            source,
        })
    }
}

/// Startup step an [`Error`] belongs to, for the exit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Plugin(LoadStage),
    Midi,
    Transport,
    RemoteControl,
    Runtime,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Configuration => write!(f, "configuration"),
            Stage::Plugin(stage) => write!(f, "{stage}"),
            Stage::Midi => write!(f, "MIDI setup"),
            Stage::Transport => write!(f, "transport setup"),
            Stage::RemoteControl => write!(f, "remote control"),
            Stage::Runtime => write!(f, "runtime setup"),
        }
    }
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::Config(_) => Stage::Configuration,
            Error::Host(e) => Stage::Plugin(e.stage()),
            Error::Midi(_) => Stage::Midi,
            Error::Sink(_) => Stage::Transport,
            Error::Rpc(_) => Stage::RemoteControl,
            Error::Io(_) => Stage::Runtime,
        }
    }

    /// `error: <stage> failed: <description>`
    pub fn report(&self) -> String {
        format!("error: {} failed: {}", self.stage(), self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use synthcast_core::FourCharCode;
    use synthcast_plugin::HostError;

    #[test]
    fn test_report_names_stage() {
        let err: Error = HostError::NotFound {
            subtype: FourCharCode::new(b"Pt8q"),
            manufacturer: FourCharCode::new(b"Mdrt"),
        }
        .into();
        assert_eq!(err.stage(), Stage::Plugin(LoadStage::Search));
        assert_eq!(
            err.report(),
            "error: component search failed: Audio unit not found with subtype 'Pt8q' and manufacturer 'Mdrt'"
        );

        let err: Error = HostError::InitializationFailed(-10875).into();
        assert_eq!(
            err.report(),
            "error: plugin initialization failed: Audio unit initialization failed: status -10875"
        );
    }

    #[test]
    fn test_config_errors() {
        let err: Error = ConfigError::ZeroBufferSize.into();
        assert_eq!(
            err.report(),
            "error: configuration failed: buffer size must be greater than 0"
        );

        let err: Error = "abc".parse::<FourCharCode>().unwrap_err().into();
        assert_eq!(err.stage(), Stage::Configuration);
    }
}
