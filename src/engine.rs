//! The running application: host, MIDI sources, sink, render thread and
//! optional remote poller.

use crate::builder::EngineBuilder;
use crate::error::Result;
use crate::scheduler::{RenderScheduler, SchedulerStats};
use std::future::Future;
use std::sync::Arc;
use std::thread::JoinHandle;
use synthcast_midi::ControlEventSource;
use synthcast_plugin::PluginHost;
use synthcast_remote::{RemotePoller, RpcEndpoint};
use synthcast_sink::PayloadSink;
use tokio_util::sync::CancellationToken;

pub struct Engine {
    host: Arc<PluginHost>,
    source: Option<ControlEventSource>,
    sink: Option<Arc<dyn PayloadSink>>,
    scheduler: Option<RenderScheduler>,
    render_thread: Option<JoinHandle<RenderScheduler>>,
    remote: Option<RpcEndpoint>,
    cancel: CancellationToken,
    stats: Option<SchedulerStats>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub(crate) fn new(
        host: Arc<PluginHost>,
        source: Option<ControlEventSource>,
        sink: Arc<dyn PayloadSink>,
        scheduler: RenderScheduler,
        remote: Option<RpcEndpoint>,
    ) -> Self {
        Self {
            host,
            source,
            sink: Some(sink),
            scheduler: Some(scheduler),
            render_thread: None,
            remote,
            cancel: CancellationToken::new(),
            stats: None,
        }
    }

    pub fn host(&self) -> &Arc<PluginHost> {
        &self.host
    }

    /// Cancelling this token stops the render loop and the remote poller.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn midi_source_count(&self) -> usize {
        self.source
            .as_ref()
            .map_or(0, ControlEventSource::connection_count)
    }

    pub fn is_running(&self) -> bool {
        self.render_thread.is_some()
    }

    /// Start the render thread. Does nothing if it already ran.
    pub fn start(&mut self) -> Result<()> {
        let Some(scheduler) = self.scheduler.take() else {
            return Ok(());
        };
        self.render_thread = Some(scheduler.spawn(self.cancel.clone())?);
        Ok(())
    }

    /// Start rendering, poll the remote server if configured, and run until
    /// `shutdown` completes or the cancel token fires.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<SchedulerStats>
    where
        F: Future<Output = ()>,
    {
        self.start()?;

        let poller = match self.remote.clone() {
            Some(endpoint) => match RemotePoller::connect(endpoint.clone()).await {
                Ok((poller, _info)) => Some(tokio::spawn(poller.run(self.cancel.clone()))),
                Err(e) => {
                    tracing::warn!(
                        "Could not connect to RPC server at {endpoint}: {e}. Remote control disabled."
                    );
                    None
                }
            },
            None => None,
        };

        tracing::info!("Running. Press Ctrl-C to stop.");
        tokio::select! {
            _ = shutdown => {}
            _ = self.cancel.cancelled() => {}
        }
        tracing::info!("Shutting down...");

        let stats = self.shutdown();
        if let Some(poller) = poller {
            let _ = poller.await;
        }
        Ok(stats)
    }

    /// Stop rendering, disconnect MIDI, close the sink and release the plugin.
    /// Idempotent; dropping the engine does the same.
    pub fn shutdown(&mut self) -> SchedulerStats {
        if let Some(stats) = self.stats {
            return stats;
        }
        self.cancel.cancel();

        let scheduler = match self.render_thread.take() {
            Some(handle) => match handle.join() {
                Ok(scheduler) => Some(scheduler),
                Err(_) => {
                    tracing::error!("Render thread panicked");
                    None
                }
            },
            None => self.scheduler.take(),
        };
        let stats = scheduler.map(|s| s.stats()).unwrap_or_default();

        if let Some(mut source) = self.source.take() {
            source.close();
        }
        if let Some(sink) = self.sink.take() {
            sink.close();
        }
        self.host.shutdown();

        self.stats = Some(stats);
        stats
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
