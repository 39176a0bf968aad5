/// Sample position of the render stream.
///
/// Owned by the render scheduler and lent to the host for the duration of a
/// render call. Not `Clone`: one clock per stream.
#[derive(Debug, Default)]
pub struct RenderClock {
    position: u64,
}

impl RenderClock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Timestamp handed to the plugin's render entry point.
    #[inline]
    pub fn sample_time(&self) -> f64 {
        self.position as f64
    }

    /// Call only after a successful render of `frames` frames.
    #[inline]
    pub fn advance(&mut self, frames: u32) {
        self.position += u64::from(frames);
    }
}
