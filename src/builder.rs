//! Builder for configuring and constructing an [`Engine`].

use crate::config::{Action, Config};
use crate::error::{ConfigError, Result};
use crate::scheduler::RenderScheduler;
use crate::Engine;
use std::sync::Arc;
use std::time::Duration;
use synthcast_midi::ControlEventSource;
use synthcast_plugin::{system_registry, ComponentRegistry, HostOptions, MatchCriteria, PluginHost};
use synthcast_remote::RpcEndpoint;
use synthcast_sink::{PayloadSink, SinkTarget, TransportSink};

/// MIDI client name announced to the system.
pub const CLIENT_NAME: &str = "synthcast";

/// Setup runs in a fixed order: plugin host, MIDI sources, transport sink.
/// A failure at any step releases whatever the earlier steps created.
///
/// # Example
///
/// ```ignore
/// use synthcast::prelude::*;
///
/// let engine = Engine::builder()
///     .instrument(MatchCriteria::instrument("Pt8q".parse()?, "Mdrt".parse()?))
///     .sink_target(SinkTarget::Tcp("127.0.0.1:9000".into()))
///     .build()?;
/// ```
pub struct EngineBuilder {
    criteria: Option<MatchCriteria>,
    host_options: HostOptions,
    registry: Option<Box<dyn ComponentRegistry>>,
    sink_target: SinkTarget,
    sink: Option<Arc<dyn PayloadSink>>,
    remote: Option<RpcEndpoint>,
    enable_midi: bool,
    period: Option<Duration>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            criteria: None,
            host_options: HostOptions::default(),
            registry: None,
            sink_target: SinkTarget::default(),
            sink: None,
            remote: None,
            enable_midi: true,
            period: None,
        }
    }
}

impl EngineBuilder {
    /// Everything a validated [`Config`] specifies.
    pub fn config(mut self, config: &Config) -> Self {
        if let Action::Run(criteria) = config.action {
            self.criteria = Some(criteria);
        }
        self.host_options = config.host;
        self.sink_target = config.sink.clone();
        self.remote = config.rpc.clone();
        self
    }

    pub fn instrument(mut self, criteria: MatchCriteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    pub fn host_options(mut self, options: HostOptions) -> Self {
        self.host_options = options;
        self
    }

    /// Search this registry instead of the platform's.
    pub fn registry(mut self, registry: Box<dyn ComponentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn sink_target(mut self, target: SinkTarget) -> Self {
        self.sink_target = target;
        self
    }

    /// Use an already constructed sink; the sink target is ignored.
    pub fn sink(mut self, sink: Arc<dyn PayloadSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn remote(mut self, endpoint: Option<RpcEndpoint>) -> Self {
        self.remote = endpoint;
        self
    }

    /// Connect MIDI inputs (on by default).
    pub fn midi(mut self, enable: bool) -> Self {
        self.enable_midi = enable;
        self
    }

    /// Fixed render period instead of the one derived from the stream format.
    pub fn render_period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let criteria = self.criteria.ok_or(ConfigError::MissingInstrument)?;
        let registry = self.registry.unwrap_or_else(system_registry);

        let host = Arc::new(PluginHost::initialize(
            registry.as_ref(),
            &criteria,
            &self.host_options,
        )?);

        let source = if self.enable_midi {
            let target = Arc::clone(&host);
            Some(ControlEventSource::connect_all(CLIENT_NAME, move |event| {
                target.deliver_control_event(event)
            })?)
        } else {
            None
        };

        let sink: Arc<dyn PayloadSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(TransportSink::open(self.sink_target)?),
        };

        let mut scheduler =
            RenderScheduler::new(Arc::clone(&host), Arc::clone(&sink), host.max_frames());
        if let Some(period) = self.period {
            scheduler = scheduler.with_period(period);
        }

        Ok(Engine::new(host, source, sink, scheduler, self.remote))
    }
}
