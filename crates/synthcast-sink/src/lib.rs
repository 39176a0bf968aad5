//! Transport sink for synthcast
//!
//! Rendered payloads leave the process as a raw float32 byte stream with no
//! header or framing, either through a named pipe or a TCP connection. The
//! consumer must already know the format.
//!
//! Sending is fire-and-forget: a missing consumer or a full queue drops the
//! block instead of stalling the render cadence.

pub mod error;
pub use error::{Result, SinkError};

mod target;
pub use target::{ensure_fifo, SinkTarget, DEFAULT_PIPE_PATH};

mod sink;
pub use sink::{MemorySink, PayloadSink, SinkStats, TransportSink, DEFAULT_QUEUE_CAPACITY};
