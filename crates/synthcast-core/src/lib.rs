//! Core types shared by every synthcast subsystem.
//!
//! - [`StreamFormat`] / [`SampleLayout`] - negotiated format and output layout
//! - [`AudioBlock`] / [`OutputPayload`] - per-tick render buffers and converted bytes
//! - [`convert`] - interleaved / planar relayout of a rendered block
//! - [`RenderClock`] - sample position advanced by the render scheduler
//! - [`FourCharCode`] - packed component identifiers
//! - [`ControlEvent`] - 3-byte performance control messages and packet unpacking

pub mod error;
pub use error::{BlockError, FourCcError};

mod format;
pub use format::{SampleLayout, StreamFormat, BYTES_PER_SAMPLE};

mod block;
pub use block::{AudioBlock, LevelReading, OutputPayload};

pub mod convert;
pub use convert::convert;

mod clock;
pub use clock::RenderClock;

mod fourcc;
pub use fourcc::{pack_fourcc, FourCharCode};

mod event;
pub use event::{message_len, unpack_packet, ControlEvent, EventKind, PacketEvents};
