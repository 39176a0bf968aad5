//! Format converter: relayout of a rendered [`AudioBlock`] into payload bytes.
//!
//! Pure pass-through. No gain, clipping or resampling; samples are copied
//! byte-exact as native-endian float32.

use crate::block::{AudioBlock, OutputPayload};
use crate::format::{SampleLayout, BYTES_PER_SAMPLE};

/// Convert a block into the configured layout.
pub fn convert(block: &AudioBlock, layout: SampleLayout) -> OutputPayload {
    match layout {
        SampleLayout::Interleaved => interleave(block),
        SampleLayout::Planar => planarize(block),
    }
}

/// Frame-major output: sample `(f, c)` lands at index `f * channels + c`.
pub fn interleave(block: &AudioBlock) -> OutputPayload {
    let channels = block.channel_count();
    let frames = block.frames();
    let mut bytes = vec![0u8; frames * channels * BYTES_PER_SAMPLE];

    for (c, samples) in block.channels().enumerate() {
        for (f, sample) in samples.iter().enumerate() {
            let offset = (f * channels + c) * BYTES_PER_SAMPLE;
            bytes[offset..offset + BYTES_PER_SAMPLE].copy_from_slice(&sample.to_ne_bytes());
        }
    }

    OutputPayload::new(bytes, SampleLayout::Interleaved, channels, frames)
}

/// Channel-major output: channel `c` occupies samples `c * frames .. (c + 1) * frames`.
pub fn planarize(block: &AudioBlock) -> OutputPayload {
    let channels = block.channel_count();
    let frames = block.frames();
    let mut bytes = Vec::with_capacity(frames * channels * BYTES_PER_SAMPLE);

    for samples in block.channels() {
        for sample in samples {
            bytes.extend_from_slice(&sample.to_ne_bytes());
        }
    }

    OutputPayload::new(bytes, SampleLayout::Planar, channels, frames)
}

/// Inverse of [`interleave`] on decoded samples. A trailing partial frame is dropped.
pub fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    if channels == 0 {
        return Vec::new();
    }
    let frames = samples.len() / channels;
    (0..channels)
        .map(|c| (0..frames).map(|f| samples[f * channels + c]).collect())
        .collect()
}

/// Decode raw payload bytes into native-endian samples. Trailing bytes that
/// do not form a whole sample are ignored.
pub fn payload_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
