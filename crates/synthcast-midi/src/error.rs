//! Error types for the control event source.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MidiError {
    #[error("MIDI client error: {0}")]
    Client(String),

    #[error("MIDI port error: {0}")]
    Port(String),
}

impl From<midir::InitError> for MidiError {
    fn from(e: midir::InitError) -> Self {
        MidiError::Client(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiInput>> for MidiError {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        MidiError::Port(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MidiError>;
