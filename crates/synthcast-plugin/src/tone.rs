//! Built-in test-tone instrument.
//!
//! A small polyphonic sine synth registered as `aumu`/`tone`/`Scst` in
//! [`MemoryRegistry::with_builtins`](crate::MemoryRegistry::with_builtins), so
//! the host runs end to end where no platform plugins are available.

use crate::error::OsStatus;
use crate::instance::{PluginInstance, RenderStatus};
use std::f64::consts::TAU;
use synthcast_core::{AudioBlock, ControlEvent, EventKind, FourCharCode, StreamFormat};

pub const TONE_SUBTYPE: FourCharCode = FourCharCode::new(b"tone");
pub const TONE_MANUFACTURER: FourCharCode = FourCharCode::new(b"Scst");

/// kAudioUnitErr_Uninitialized
pub const ERR_UNINITIALIZED: OsStatus = -10867;
/// kAudioUnitErr_TooManyFramesToProcess
pub const ERR_TOO_MANY_FRAMES: OsStatus = -10874;

const SAMPLE_RATE: f64 = 44100.0;
const CHANNELS: u32 = 2;
const MAX_VOICES: usize = 16;
const CC_ALL_NOTES_OFF: u8 = 123;

#[derive(Debug, Clone, Copy)]
struct Voice {
    note: u8,
    gain: f32,
    phase: f64,
}

#[derive(Debug)]
pub struct ToneInstrument {
    format: StreamFormat,
    max_frames: u32,
    initialized: bool,
    voices: Vec<Voice>,
}

impl Default for ToneInstrument {
    fn default() -> Self {
        Self {
            format: StreamFormat::new(SAMPLE_RATE, CHANNELS),
            max_frames: 1156,
            initialized: false,
            voices: Vec::with_capacity(MAX_VOICES),
        }
    }
}

impl ToneInstrument {
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        self.voices.retain(|v| v.note != note);
        if self.voices.len() == MAX_VOICES {
            self.voices.remove(0);
        }
        self.voices.push(Voice {
            note,
            gain: 0.2 * f32::from(velocity) / 127.0,
            phase: 0.0,
        });
    }

    fn note_off(&mut self, note: u8) {
        self.voices.retain(|v| v.note != note);
    }
}

fn note_frequency(note: u8) -> f64 {
    440.0 * 2f64.powf((f64::from(note) - 69.0) / 12.0)
}

impl PluginInstance for ToneInstrument {
    fn output_format(&mut self) -> Result<StreamFormat, OsStatus> {
        Ok(self.format)
    }

    fn set_maximum_frames_per_slice(&mut self, frames: u32) -> Result<(), OsStatus> {
        self.max_frames = frames;
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), OsStatus> {
        self.initialized = true;
        Ok(())
    }

    fn uninitialize(&mut self) {
        self.initialized = false;
        self.voices.clear();
    }

    fn midi_event(&mut self, status: u8, data1: u8, data2: u8, _offset_frames: u32) {
        let event = ControlEvent::new(status, data1, data2);
        match event.kind() {
            EventKind::NoteOn { note, velocity, .. } => self.note_on(note, velocity),
            EventKind::NoteOff { note, .. } => self.note_off(note),
            EventKind::Other if status & 0xF0 == 0xB0 && data1 == CC_ALL_NOTES_OFF => {
                self.voices.clear()
            }
            EventKind::Other => {}
        }
    }

    fn render(&mut self, _sample_time: f64, block: &mut AudioBlock) -> RenderStatus {
        if !self.initialized {
            return RenderStatus::Failed(ERR_UNINITIALIZED);
        }
        if block.frames() > self.max_frames as usize {
            return RenderStatus::Failed(ERR_TOO_MANY_FRAMES);
        }

        let sample_rate = self.format.sample_rate;
        for frame in 0..block.frames() {
            let mut sample = 0.0f32;
            for voice in &mut self.voices {
                sample += voice.gain * voice.phase.sin() as f32;
                voice.phase = (voice.phase + TAU * note_frequency(voice.note) / sample_rate) % TAU;
            }
            for channel in block.channels_mut() {
                channel[frame] = sample;
            }
        }
        RenderStatus::Complete
    }
}
