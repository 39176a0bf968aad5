//! Per-tick render buffers and converted output bytes.

use crate::error::BlockError;
use crate::format::{SampleLayout, BYTES_PER_SAMPLE};

/// Samples at or above this magnitude are treated as garbage by the level meter.
const LEVEL_CEILING: f32 = 10.0;

/// One render tick worth of float32 audio, one buffer per channel.
///
/// Allocated zeroed inside a render call and dropped before the call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl AudioBlock {
    pub fn zeroed(channels: usize, frames: usize) -> Self {
        Self {
            channels: (0..channels).map(|_| vec![0.0; frames]).collect(),
            frames,
        }
    }

    /// Build from existing channel buffers. Every channel must have the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self, BlockError> {
        let expected = channels.first().ok_or(BlockError::NoChannels)?.len();
        if let Some((channel, ch)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != expected)
        {
            return Err(BlockError::RaggedChannel {
                channel,
                len: ch.len(),
                expected,
            });
        }
        Ok(Self {
            channels,
            frames: expected,
        })
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    /// Peak and activity of one channel, for diagnostics.
    pub fn level(&self, index: usize) -> Option<LevelReading> {
        let samples = self.channels.get(index)?;
        let mut reading = LevelReading::default();
        for sample in samples.iter().map(|s| s.abs()) {
            if sample > reading.peak && sample < LEVEL_CEILING {
                reading.peak = sample;
            }
            if sample > 0.0 {
                reading.non_zero += 1;
            }
        }
        Some(reading)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelReading {
    pub peak: f32,
    pub non_zero: usize,
}

/// Byte-exact converter output for one [`AudioBlock`].
///
/// Carries no header; the shape fields are for local bookkeeping only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPayload {
    bytes: Vec<u8>,
    layout: SampleLayout,
    channels: usize,
    frames: usize,
}

impl OutputPayload {
    pub(crate) fn new(bytes: Vec<u8>, layout: SampleLayout, channels: usize, frames: usize) -> Self {
        debug_assert_eq!(bytes.len(), channels * frames * BYTES_PER_SAMPLE);
        Self {
            bytes,
            layout,
            channels,
            frames,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Decode the payload back into native-endian samples, in payload order.
    pub fn samples(&self) -> Vec<f32> {
        crate::convert::payload_samples(&self.bytes)
    }
}

impl AsRef<[u8]> for OutputPayload {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
