//! Single-instance instrument plugin hosting for synthcast
//!
//! The host finds one instrument component in a [`ComponentRegistry`],
//! negotiates its output format, initializes it, and then serializes control
//! events and render calls against it behind one lock.
//!
//! ## Usage
//!
//! ```ignore
//! use synthcast_plugin::{system_registry, HostOptions, MatchCriteria, PluginHost};
//!
//! let registry = system_registry();
//! let criteria = MatchCriteria::instrument("Pt8q".parse()?, "Mdrt".parse()?);
//! let host = PluginHost::initialize(registry.as_ref(), &criteria, &HostOptions::default())?;
//!
//! let mut clock = synthcast_core::RenderClock::new();
//! if let Some(payload) = host.render_block(&mut clock, 512) {
//!     // hand the bytes to a sink
//! }
//! ```

pub mod error;
pub use error::{HostError, LoadStage, OsStatus, Result};

mod instance;
pub use instance::{PluginInstance, RenderStatus};

mod handle;
pub use handle::{HandleState, PluginHandle};

pub mod registry;
pub use registry::{
    find_component, list_components, ComponentDescription, ComponentRef, ComponentRegistry,
    ComponentSummary, MatchCriteria, MemoryRegistry, SearchStrategy, MUSIC_DEVICE, SANDBOX_SAFE,
};

mod host;
pub use host::{ComponentInfo, HostOptions, PluginHost};

pub mod tone;

#[cfg(target_os = "macos")]
mod audiounit;
#[cfg(target_os = "macos")]
pub use audiounit::{AudioUnitInstance, AudioUnitRegistry};

/// The platform's plugin registry.
///
/// AudioToolbox on macOS. Elsewhere there is no system registry, so the
/// in-memory registry with the built-in instruments stands in.
pub fn system_registry() -> Box<dyn ComponentRegistry> {
    #[cfg(target_os = "macos")]
    {
        Box::new(AudioUnitRegistry)
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(MemoryRegistry::with_builtins())
    }
}
