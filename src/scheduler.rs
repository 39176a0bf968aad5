//! Fixed-cadence render loop.
//!
//! Every period (`frames / sample_rate`) the scheduler renders one block and
//! hands the payload to the sink. A tick that produces nothing, or whose
//! render fails, is skipped; there is no catch-up for lost ticks.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use synthcast_core::RenderClock;
use synthcast_plugin::{error::NO_ERR, OsStatus, PluginHost};
use synthcast_sink::PayloadSink;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Rendered and accepted by the sink.
    Sent,
    /// Rendered, but the sink could not take it.
    Dropped,
    /// The plugin had no output yet.
    Skipped,
    /// Render failed with this status.
    Failed(OsStatus),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub sent: u64,
    pub dropped: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl SchedulerStats {
    fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Sent => self.sent += 1,
            TickOutcome::Dropped => self.dropped += 1,
            TickOutcome::Skipped => self.skipped += 1,
            TickOutcome::Failed(_) => self.failed += 1,
        }
    }
}

pub struct RenderScheduler {
    host: Arc<PluginHost>,
    sink: Arc<dyn PayloadSink>,
    frames: u32,
    period: Duration,
    clock: RenderClock,
    state: SchedulerState,
    stats: SchedulerStats,
}

impl RenderScheduler {
    pub fn new(host: Arc<PluginHost>, sink: Arc<dyn PayloadSink>, frames: u32) -> Self {
        let period = host.format().block_period(frames);
        Self {
            host,
            sink,
            frames,
            period,
            clock: RenderClock::new(),
            state: SchedulerState::Idle,
            stats: SchedulerStats::default(),
        }
    }

    /// Override the tick period derived from the stream format.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn clock(&self) -> &RenderClock {
        &self.clock
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Render one block and pass it on.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = match self.host.try_render_block(&mut self.clock, self.frames) {
            Ok(Some(payload)) => match self.sink.send(payload) {
                Ok(()) => TickOutcome::Sent,
                Err(err) if err.is_transient() => {
                    tracing::debug!("Block dropped: {err}");
                    TickOutcome::Dropped
                }
                Err(err) => {
                    tracing::warn!("Block dropped: {err}");
                    TickOutcome::Dropped
                }
            },
            Ok(None) => TickOutcome::Skipped,
            Err(err) => {
                tracing::debug!("{err}");
                TickOutcome::Failed(err.status().unwrap_or(NO_ERR))
            }
        };
        self.stats.record(outcome);
        outcome
    }

    /// Tick every period until `cancel` fires. A stopped scheduler does not restart.
    pub async fn run(&mut self, cancel: CancellationToken) {
        if self.state == SchedulerState::Stopped {
            return;
        }
        self.state = SchedulerState::Running;
        tracing::info!(
            "Rendering {} frames every {:.2} ms",
            self.frames,
            self.period.as_secs_f64() * 1000.0
        );

        while !cancel.is_cancelled() {
            self.tick();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.period) => {}
            }
        }

        self.state = SchedulerState::Stopped;
        let stats = self.stats;
        tracing::debug!(
            "Render loop stopped after {} ticks ({} sent, {} dropped, {} skipped, {} failed)",
            stats.ticks,
            stats.sent,
            stats.dropped,
            stats.skipped,
            stats.failed
        );
    }

    /// Run on a dedicated thread with its own current-thread runtime. The
    /// scheduler comes back through the join handle once `cancel` fires.
    pub fn spawn(mut self, cancel: CancellationToken) -> std::io::Result<JoinHandle<Self>> {
        thread::Builder::new()
            .name("synthcast-render".to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(self.run(cancel)),
                    Err(e) => tracing::error!("Could not start render runtime: {e}"),
                }
                self
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthcast_core::ControlEvent;
    use synthcast_plugin::{HostOptions, MatchCriteria, MemoryRegistry};
    use synthcast_sink::{MemorySink, SinkError};

    fn tone_host() -> Arc<PluginHost> {
        let registry = MemoryRegistry::with_builtins();
        let criteria = MatchCriteria::instrument(
            synthcast_plugin::tone::TONE_SUBTYPE,
            synthcast_plugin::tone::TONE_MANUFACTURER,
        );
        let options = HostOptions {
            max_frames: 64,
            warmup: Duration::ZERO,
            ..HostOptions::default()
        };
        Arc::new(PluginHost::initialize(&registry, &criteria, &options).unwrap())
    }

    struct Refusing;

    impl PayloadSink for Refusing {
        fn send(&self, _payload: synthcast_core::OutputPayload) -> synthcast_sink::Result<()> {
            Err(SinkError::Backpressure)
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_period_follows_format() {
        let scheduler = RenderScheduler::new(tone_host(), Arc::new(MemorySink::new()), 441);
        approx::assert_relative_eq!(scheduler.period().as_secs_f64(), 0.01, epsilon = 1e-9);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_tick_sends_and_advances() {
        let host = tone_host();
        host.deliver_control_event(ControlEvent::new(0x90, 69, 100));
        let sink = Arc::new(MemorySink::new());
        let mut scheduler = RenderScheduler::new(host, sink.clone(), 64);

        assert_eq!(scheduler.tick(), TickOutcome::Sent);
        assert_eq!(scheduler.tick(), TickOutcome::Sent);
        assert_eq!(scheduler.clock().position(), 128);
        assert_eq!(sink.len(), 2);
        assert_eq!(scheduler.stats().sent, 2);
    }

    #[test]
    fn test_refused_block_is_dropped() {
        let mut scheduler = RenderScheduler::new(tone_host(), Arc::new(Refusing), 64);
        assert_eq!(scheduler.tick(), TickOutcome::Dropped);
        assert_eq!(scheduler.stats().dropped, 1);
        // The block was rendered, so time moved on.
        assert_eq!(scheduler.clock().position(), 64);
    }

    #[test]
    fn test_transient_drop_shows_with_verbose_logging() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(
                crate::logging::default_directive(true),
            ))
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();

        let mut scheduler = RenderScheduler::new(tone_host(), Arc::new(Refusing), 64);
        let outcome = tracing::subscriber::with_default(subscriber, || scheduler.tick());
        assert_eq!(outcome, TickOutcome::Dropped);

        let output = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(output.contains("Block dropped"), "{output}");
        assert!(output.contains("DEBUG"), "{output}");
    }
}
