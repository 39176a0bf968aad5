//! # synthcast
//!
//! Hosts one instrument plugin, plays it from every MIDI input, and streams
//! the rendered audio as raw float32 to a named pipe or TCP consumer.
//!
//! ## Architecture
//!
//! synthcast is an umbrella crate that coordinates:
//! - **synthcast-core** - Stream format, audio blocks, layout conversion, control events
//! - **synthcast-plugin** - Component search and serialized access to the hosted instrument
//! - **synthcast-midi** - Control event source over every MIDI input
//! - **synthcast-sink** - Non-blocking hand-off to a pipe or TCP writer thread
//! - **synthcast-remote** - Optional JSON-RPC preset and parameter poller
//!
//! The root crate adds the command line, logging setup, the render scheduler
//! and the [`Engine`] that wires everything together.
//!
//! ## Quick Start
//!
//! ```ignore
//! use synthcast::prelude::*;
//!
//! let engine = Engine::builder()
//!     .instrument(MatchCriteria::instrument("Pt8q".parse()?, "Mdrt".parse()?))
//!     .build()?;
//!
//! let stats = engine.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

pub use synthcast_core as core;
pub use synthcast_midi as midi;
pub use synthcast_plugin as plugin;
pub use synthcast_remote as remote;
pub use synthcast_sink as sink;

pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;

mod builder;
mod engine;

pub use builder::{EngineBuilder, CLIENT_NAME};
pub use config::{Action, Cli, Config};
pub use engine::Engine;
pub use error::{ConfigError, Error, Result, Stage};
pub use scheduler::{RenderScheduler, SchedulerState, SchedulerStats, TickOutcome};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Config, Engine, EngineBuilder, Error, Result};

    pub use synthcast_core::{ControlEvent, FourCharCode, OutputPayload, SampleLayout, StreamFormat};
    pub use synthcast_plugin::{HostOptions, MatchCriteria, PluginHost};
    pub use synthcast_remote::RpcEndpoint;
    pub use synthcast_sink::{PayloadSink, SinkTarget};
}
