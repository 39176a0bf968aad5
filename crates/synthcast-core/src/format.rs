//! Negotiated stream format and output sample layout.

use std::fmt;
use std::time::Duration;

/// Output payloads are always float32.
pub const BYTES_PER_SAMPLE: usize = 4;

/// Lowest sample rate a stream may negotiate.
pub const MIN_SAMPLE_RATE: f64 = 1.0;

/// Byte layout of an [`OutputPayload`](crate::OutputPayload).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleLayout {
    /// Frame-major: every channel of frame 0, then frame 1, ...
    #[default]
    Interleaved,
    /// Channel-major: every frame of channel 0, then channel 1, ...
    Planar,
}

impl fmt::Display for SampleLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleLayout::Interleaved => write!(f, "interleaved"),
            SampleLayout::Planar => write!(f, "planar"),
        }
    }
}

/// Format negotiated once from the plugin's output scope.
///
/// Read-only after negotiation; all buffer sizing derives from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFormat {
    pub sample_rate: f64,
    pub channels: u32,
    pub bits_per_sample: u32,
    /// The plugin's native convention. Rendering always pulls one buffer per
    /// channel; this is informational.
    pub interleaved: bool,
}

impl StreamFormat {
    /// Non-interleaved float32, the usual instrument output format.
    pub fn new(sample_rate: f64, channels: u32) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 32,
            interleaved: false,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels as usize
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.channel_count() * BYTES_PER_SAMPLE
    }

    /// Byte length of one converted block, in either layout.
    pub fn payload_len(&self, frames: usize) -> usize {
        frames * self.bytes_per_frame()
    }

    /// Wall-clock duration of `frames` at this sample rate, zero for an
    /// invalid format.
    pub fn block_period(&self, frames: u32) -> Duration {
        if !self.is_valid() {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(frames as f64 / self.sample_rate).unwrap_or(Duration::ZERO)
    }

    pub fn is_valid(&self) -> bool {
        self.sample_rate.is_finite() && self.sample_rate >= MIN_SAMPLE_RATE && self.channels > 0
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}-bit, {}",
            self.sample_rate,
            self.channels,
            self.bits_per_sample,
            if self.interleaved {
                "interleaved"
            } else {
                "non-interleaved"
            }
        )
    }
}
