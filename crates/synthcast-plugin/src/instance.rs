//! Plugin instance trait.
//!
//! This is the seam between the host and a platform plugin API. Every method
//! is called with the host lock held, so implementations never see concurrent
//! entry.

use crate::error::OsStatus;
use synthcast_core::{AudioBlock, StreamFormat};

/// Outcome of one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Complete,
    /// The plugin has no output yet (warm-up, transient parameter state).
    /// Not an error; the tick is skipped.
    NotReady,
    Failed(OsStatus),
}

pub trait PluginInstance: Send {
    /// Preferred format of the output scope, element 0.
    fn output_format(&mut self) -> Result<StreamFormat, OsStatus>;

    fn set_maximum_frames_per_slice(&mut self, frames: u32) -> Result<(), OsStatus>;

    fn initialize(&mut self) -> Result<(), OsStatus>;

    /// Only called after a successful `initialize`.
    fn uninitialize(&mut self);

    /// Queue one control message for the next render.
    fn midi_event(&mut self, status: u8, data1: u8, data2: u8, offset_frames: u32);

    /// Render `block.frames()` frames into the block's channel buffers.
    fn render(&mut self, sample_time: f64, block: &mut AudioBlock) -> RenderStatus;

    /// Release the underlying platform instance. Must tolerate repeated calls.
    fn dispose(&mut self) {}
}
