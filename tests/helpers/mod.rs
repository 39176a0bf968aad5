//! Test fixtures for synthcast integration tests.
//!
//! [`ScriptedInstrument`] plays back fixed per-channel sample patterns and can
//! be told to fail, or to have no output for, specific render calls.
//! Everything it sees is recorded in a shared [`Trace`].

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use synthcast::core::{AudioBlock, FourCharCode, OutputPayload, SampleLayout, StreamFormat};
use synthcast::plugin::{
    ComponentDescription, HostOptions, MatchCriteria, MemoryRegistry, OsStatus, PluginHost,
    PluginInstance, RenderStatus,
};
use synthcast::sink::{PayloadSink, SinkError};
use tokio_util::sync::CancellationToken;

pub const TEST_SUBTYPE: FourCharCode = FourCharCode::new(b"Scpt");
pub const TEST_MANUFACTURER: FourCharCode = FourCharCode::new(b"Test");
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Status returned by scripted render failures.
pub const SCRIPTED_FAILURE: OsStatus = -50;

#[derive(Debug, Clone, Default)]
pub struct Script {
    /// One pattern per output channel, repeated to fill each block.
    pub channels: Vec<Vec<f32>>,
    /// 1-based render calls that fail.
    pub failing_calls: Vec<usize>,
    /// 1-based render calls that report no output yet.
    pub not_ready_calls: Vec<usize>,
}

impl Script {
    pub fn new(channels: Vec<Vec<f32>>) -> Self {
        Self {
            channels,
            failing_calls: Vec::new(),
            not_ready_calls: Vec::new(),
        }
    }

    pub fn failing(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failing_calls.extend(calls);
        self
    }

    pub fn not_ready(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.not_ready_calls.extend(calls);
        self
    }
}

#[derive(Debug, Default)]
pub struct Trace {
    pub renders: AtomicUsize,
    pub sample_times: Mutex<Vec<f64>>,
    pub events: Mutex<Vec<[u8; 3]>>,
    pub initialized: AtomicBool,
    pub disposed: AtomicBool,
}

pub struct ScriptedInstrument {
    script: Arc<Script>,
    trace: Arc<Trace>,
}

impl PluginInstance for ScriptedInstrument {
    fn output_format(&mut self) -> Result<StreamFormat, OsStatus> {
        Ok(StreamFormat::new(
            TEST_SAMPLE_RATE,
            self.script.channels.len() as u32,
        ))
    }

    fn set_maximum_frames_per_slice(&mut self, _frames: u32) -> Result<(), OsStatus> {
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), OsStatus> {
        self.trace.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn uninitialize(&mut self) {
        self.trace.initialized.store(false, Ordering::SeqCst);
    }

    fn midi_event(&mut self, status: u8, data1: u8, data2: u8, _offset_frames: u32) {
        self.trace.events.lock().push([status, data1, data2]);
    }

    fn render(&mut self, sample_time: f64, block: &mut AudioBlock) -> RenderStatus {
        let call = self.trace.renders.fetch_add(1, Ordering::SeqCst) + 1;
        self.trace.sample_times.lock().push(sample_time);
        if self.script.failing_calls.contains(&call) {
            return RenderStatus::Failed(SCRIPTED_FAILURE);
        }
        if self.script.not_ready_calls.contains(&call) {
            return RenderStatus::NotReady;
        }

        for (channel, pattern) in block.channels_mut().zip(&self.script.channels) {
            for (frame, sample) in channel.iter_mut().enumerate() {
                *sample = pattern[frame % pattern.len()];
            }
        }
        RenderStatus::Complete
    }

    fn dispose(&mut self) {
        self.trace.disposed.store(true, Ordering::SeqCst);
    }
}

/// Registry holding the built-in instruments plus one scripted instrument.
pub fn scripted_registry(script: Script) -> (MemoryRegistry, Arc<Trace>) {
    let script = Arc::new(script);
    let trace = Arc::new(Trace::default());
    let mut registry = MemoryRegistry::with_builtins();
    {
        let trace = Arc::clone(&trace);
        registry.register(
            ComponentDescription::instrument(TEST_SUBTYPE, TEST_MANUFACTURER),
            "Test: Scripted",
            move || {
                Ok(Box::new(ScriptedInstrument {
                    script: Arc::clone(&script),
                    trace: Arc::clone(&trace),
                }) as Box<dyn PluginInstance>)
            },
        );
    }
    (registry, trace)
}

pub fn scripted_criteria() -> MatchCriteria {
    MatchCriteria::instrument(TEST_SUBTYPE, TEST_MANUFACTURER)
}

/// Host options with no warm-up pause.
pub fn quick_options(frames: u32, layout: SampleLayout) -> HostOptions {
    HostOptions {
        max_frames: frames,
        layout,
        warmup: Duration::ZERO,
    }
}

pub fn scripted_host(
    script: Script,
    frames: u32,
    layout: SampleLayout,
) -> (Arc<PluginHost>, Arc<Trace>) {
    let (registry, trace) = scripted_registry(script);
    let options = quick_options(frames, layout);
    let host = PluginHost::initialize(&registry, &scripted_criteria(), &options)
        .expect("scripted instrument should load");
    (Arc::new(host), trace)
}

/// Keeps payloads and cancels `token` once it holds `limit` of them.
pub struct CancelAfter {
    pub payloads: Mutex<Vec<OutputPayload>>,
    limit: usize,
    token: CancellationToken,
}

impl CancelAfter {
    pub fn new(limit: usize, token: CancellationToken) -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            limit,
            token,
        }
    }
}

impl PayloadSink for CancelAfter {
    fn send(&self, payload: OutputPayload) -> Result<(), SinkError> {
        let mut payloads = self.payloads.lock();
        payloads.push(payload);
        if payloads.len() >= self.limit {
            self.token.cancel();
        }
        Ok(())
    }
}

/// Native-endian bytes of `samples`, as a consumer reads them.
pub fn f32_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_ne_bytes()).collect()
}
