use crate::error::OsStatus;
use crate::instance::{PluginInstance, RenderStatus};
use synthcast_core::{AudioBlock, ControlEvent, StreamFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Instantiated,
    Initialized,
    Released,
}

/// Owner of the single live plugin instance.
///
/// Tracks the instance lifecycle so teardown runs exactly once: uninitialize
/// only if initialization succeeded, then dispose. Dropping the handle tears
/// it down, which covers every early return during host setup.
pub struct PluginHandle {
    instance: Box<dyn PluginInstance>,
    state: HandleState,
}

impl PluginHandle {
    pub fn new(instance: Box<dyn PluginInstance>) -> Self {
        Self {
            instance,
            state: HandleState::Instantiated,
        }
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn output_format(&mut self) -> Result<StreamFormat, OsStatus> {
        self.instance.output_format()
    }

    pub fn set_max_frames(&mut self, frames: u32) -> Result<(), OsStatus> {
        self.instance.set_maximum_frames_per_slice(frames)
    }

    pub fn initialize(&mut self) -> Result<(), OsStatus> {
        self.instance.initialize()?;
        self.state = HandleState::Initialized;
        Ok(())
    }

    /// Events to a released instance are dropped.
    pub fn deliver(&mut self, event: ControlEvent) {
        if self.state == HandleState::Released {
            return;
        }
        self.instance
            .midi_event(event.status(), event.data1(), event.data2(), 0);
    }

    pub fn render(&mut self, sample_time: f64, block: &mut AudioBlock) -> RenderStatus {
        match self.state {
            HandleState::Initialized => self.instance.render(sample_time, block),
            HandleState::Instantiated | HandleState::Released => RenderStatus::NotReady,
        }
    }

    /// Idempotent.
    pub fn teardown(&mut self) {
        match self.state {
            HandleState::Released => return,
            HandleState::Initialized => self.instance.uninitialize(),
            HandleState::Instantiated => {}
        }
        self.instance.dispose();
        self.state = HandleState::Released;
    }
}

impl Drop for PluginHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}
