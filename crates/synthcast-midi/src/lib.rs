//! Control event source for synthcast
//!
//! Opens every MIDI input the platform reports and forwards each 3-byte
//! message to a delivery closure, typically the plugin host's
//! `deliver_control_event`.
//!
//! ```ignore
//! let host = Arc::new(host);
//! let target = Arc::clone(&host);
//! let source = ControlEventSource::connect_all("synthcast", move |event| {
//!     target.deliver_control_event(event)
//! })?;
//! ```

pub mod error;
pub use error::{MidiError, Result};

mod dispatcher;
pub use dispatcher::{ControlEventDispatcher, DispatchStats};

mod source;
pub use source::{list_sources, ControlEventSource, MidiSource};
