//! The plugin host: search, setup and serialized access to one instrument.

use crate::error::{HostError, Result};
use crate::handle::PluginHandle;
use crate::instance::RenderStatus;
use crate::registry::{
    find_component, list_components, ComponentDescription, ComponentRegistry, MatchCriteria,
    SearchStrategy,
};
use parking_lot::Mutex;
use std::time::Duration;
use synthcast_core::{
    convert, AudioBlock, ControlEvent, EventKind, OutputPayload, RenderClock, SampleLayout,
    StreamFormat,
};

/// Output level below which the level monitor stays quiet.
const LEVEL_LOG_THRESHOLD: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostOptions {
    /// Largest block the host will ever request.
    pub max_frames: u32,
    pub layout: SampleLayout,
    /// Pause after initialization before the first render. Zero disables it.
    pub warmup: Duration,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            max_frames: 512,
            layout: SampleLayout::Interleaved,
            warmup: Duration::from_millis(500),
        }
    }
}

/// What was actually loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    pub description: ComponentDescription,
    pub name: Option<String>,
    pub strategy: SearchStrategy,
}

/// Hosts exactly one plugin instance.
///
/// Control-event delivery and rendering may be called from different threads;
/// both take the same lock for the whole plugin call, so the instance never
/// sees concurrent entry.
pub struct PluginHost {
    plugin: Mutex<PluginHandle>,
    format: StreamFormat,
    layout: SampleLayout,
    max_frames: u32,
    component: ComponentInfo,
}

impl PluginHost {
    /// Locate, instantiate, negotiate and initialize the plugin named by `criteria`.
    ///
    /// Any failure after instantiation releases the instance before returning.
    pub fn initialize(
        registry: &dyn ComponentRegistry,
        criteria: &MatchCriteria,
        options: &HostOptions,
    ) -> Result<Self> {
        tracing::debug!(
            "Searching for audio unit: type={}, sub={}, mfr={}",
            criteria.component_type,
            criteria.subtype,
            criteria.manufacturer
        );

        let Some((component, strategy)) = find_component(registry, criteria) else {
            tracing::info!("Available music devices:");
            for summary in list_components(registry, criteria.component_type) {
                tracing::info!(
                    "  sub={}, mfr={}, name={}",
                    summary.description.subtype,
                    summary.description.manufacturer,
                    summary.name.as_deref().unwrap_or("<unnamed>")
                );
            }
            return Err(HostError::NotFound {
                subtype: criteria.subtype,
                manufacturer: criteria.manufacturer,
            });
        };

        let description = registry
            .describe(component)
            .unwrap_or(ComponentDescription::instrument(
                criteria.subtype,
                criteria.manufacturer,
            ));
        let name = registry.name(component);
        tracing::info!(
            "Found audio unit {} using {} search",
            name.as_deref().unwrap_or("<unnamed>"),
            strategy
        );

        let instance = registry
            .instantiate(component)
            .map_err(HostError::InstantiationFailed)?;
        let mut plugin = PluginHandle::new(instance);

        let format = plugin
            .output_format()
            .map_err(HostError::FormatUnavailable)?;
        if !format.is_valid() {
            return Err(HostError::UnsupportedFormat(format));
        }

        tracing::info!("Stream format:");
        tracing::info!("  Sample rate: {}", format.sample_rate);
        tracing::info!("  Channels: {}", format.channels);
        tracing::info!("  Bits per channel: {}", format.bits_per_sample);
        tracing::info!(
            "  Native layout: {}",
            if format.interleaved {
                "interleaved"
            } else {
                "non-interleaved"
            }
        );
        tracing::info!("  Output layout: {}", options.layout);

        if let Err(status) = plugin.set_max_frames(options.max_frames) {
            tracing::warn!(
                "Could not set maximum frames per slice to {}: status {}",
                options.max_frames,
                status
            );
        }

        plugin
            .initialize()
            .map_err(HostError::InitializationFailed)?;
        tracing::info!("Audio unit initialized");

        if !options.warmup.is_zero() {
            std::thread::sleep(options.warmup);
        }

        Ok(Self {
            plugin: Mutex::new(plugin),
            format,
            layout: options.layout,
            max_frames: options.max_frames,
            component: ComponentInfo {
                description,
                name,
                strategy,
            },
        })
    }

    pub fn format(&self) -> &StreamFormat {
        &self.format
    }

    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    pub fn max_frames(&self) -> u32 {
        self.max_frames
    }

    pub fn component(&self) -> &ComponentInfo {
        &self.component
    }

    /// Forward one control event to the plugin's event queue. Callable from any thread.
    pub fn deliver_control_event(&self, event: ControlEvent) {
        match event.kind() {
            EventKind::NoteOn {
                channel,
                note,
                velocity,
            } => tracing::debug!("Note On - Channel: {channel}, Note: {note}, Velocity: {velocity}"),
            EventKind::NoteOff {
                channel,
                note,
                velocity,
            } => {
                tracing::debug!("Note Off - Channel: {channel}, Note: {note}, Velocity: {velocity}")
            }
            EventKind::Other => {}
        }

        self.plugin.lock().deliver(event);
    }

    /// Render one block and convert it to the configured layout.
    ///
    /// `Ok(None)` means the plugin had no output yet. The clock advances only
    /// when a block is produced.
    pub fn try_render_block(
        &self,
        clock: &mut RenderClock,
        frames: u32,
    ) -> Result<Option<OutputPayload>> {
        if frames == 0 {
            return Ok(None);
        }

        let mut block = AudioBlock::zeroed(self.format.channel_count(), frames as usize);
        let status = self.plugin.lock().render(clock.sample_time(), &mut block);

        match status {
            RenderStatus::Complete => {}
            RenderStatus::NotReady => {
                tracing::trace!("No output yet at sample {}", clock.position());
                return Ok(None);
            }
            RenderStatus::Failed(code) => return Err(HostError::RenderFailed(code)),
        }
        clock.advance(frames);

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Some(level) = block.level(0).filter(|l| l.peak > LEVEL_LOG_THRESHOLD) {
                tracing::debug!(
                    "Audio level - Peak: {:.6}, Non-zero samples: {}/{}",
                    level.peak,
                    level.non_zero,
                    block.frames()
                );
            }
        }

        Ok(Some(convert(&block, self.layout)))
    }

    /// [`try_render_block`](Self::try_render_block) with failures logged and skipped.
    pub fn render_block(&self, clock: &mut RenderClock, frames: u32) -> Option<OutputPayload> {
        match self.try_render_block(clock, frames) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!("{err}");
                None
            }
        }
    }

    /// Uninitialize and dispose the plugin. Idempotent; dropping the host does the same.
    pub fn shutdown(&self) {
        self.plugin.lock().teardown();
    }
}
