//! Periodic preset and parameter change detection.

use crate::client::{Parameter, ProductInfo, RpcClient, RpcEndpoint};
use crate::error::Result;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Smallest normalized-value difference reported as a change.
pub const CHANGE_THRESHOLD: f64 = 0.0001;

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteChange {
    PresetChanged(String),
    ParameterChanged(Parameter),
}

/// Parameters of `new` whose value moved by more than [`CHANGE_THRESHOLD`]
/// since `old`. Ids missing from either snapshot are ignored.
pub fn diff_parameters(old: &[Parameter], new: &[Parameter]) -> Vec<Parameter> {
    let previous: HashMap<&str, f64> = old
        .iter()
        .map(|p| (p.id.as_str(), p.normalized_value))
        .collect();

    new.iter()
        .filter(|p| {
            previous
                .get(p.id.as_str())
                .is_some_and(|value| (value - p.normalized_value).abs() > CHANGE_THRESHOLD)
        })
        .cloned()
        .collect()
}

/// What the previous poll saw.
#[derive(Debug, Clone, Default)]
pub struct PollerState {
    preset: Option<String>,
    baseline: Option<Vec<Parameter>>,
}

impl PollerState {
    pub fn new(preset: Option<String>) -> Self {
        Self {
            preset,
            baseline: None,
        }
    }

    pub fn preset(&self) -> Option<&str> {
        self.preset.as_deref()
    }

    /// Fold one poll into the state. A preset change resets the parameter
    /// baseline, so the parameters fetched alongside it report nothing.
    pub fn observe(
        &mut self,
        info: Option<&ProductInfo>,
        parameters: Option<Vec<Parameter>>,
    ) -> Vec<RemoteChange> {
        let mut changes = Vec::new();

        if let Some(name) = info.and_then(ProductInfo::preset_name) {
            if self.preset.as_deref() != Some(name) {
                self.preset = Some(name.to_string());
                self.baseline = None;
                changes.push(RemoteChange::PresetChanged(name.to_string()));
            }
        }

        if let Some(current) = parameters {
            if let Some(baseline) = &self.baseline {
                changes.extend(
                    diff_parameters(baseline, &current)
                        .into_iter()
                        .map(RemoteChange::ParameterChanged),
                );
            }
            self.baseline = Some(current);
        }

        changes
    }
}

pub struct RemotePoller {
    client: RpcClient,
    interval: Duration,
    state: PollerState,
}

impl RemotePoller {
    /// Query the server once and print what it is running.
    ///
    /// An unreachable server is an error here; the caller decides whether
    /// that is fatal.
    pub async fn connect(endpoint: RpcEndpoint) -> Result<(Self, ProductInfo)> {
        let client = RpcClient::new(endpoint)?;
        let info = client.get_info().await?;

        tracing::info!("Connected to RPC server at {}:", client.endpoint());
        if let Some(product) = &info.product_name {
            tracing::info!("  Product: {product}");
        }
        if let Some(version) = &info.version {
            tracing::info!("  Version: {version}");
        }
        if let Some(preset) = info.preset_name() {
            tracing::info!("  Current Preset: {preset}");
        }

        let poller = Self {
            client,
            interval: DEFAULT_POLL_INTERVAL,
            state: PollerState::new(info.preset_name().map(str::to_string)),
        };
        Ok((poller, info))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    /// One round trip: info, then parameters.
    pub async fn poll_once(&mut self) -> Vec<RemoteChange> {
        tracing::debug!("Polling RPC server...");

        let info = match self.client.get_info().await {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!("Failed to get info from RPC server: {e}");
                None
            }
        };
        let parameters = match self.client.get_parameters().await {
            Ok(parameters) => Some(parameters),
            Err(e) => {
                tracing::debug!("Failed to get parameters from RPC server: {e}");
                None
            }
        };

        self.state.observe(info.as_ref(), parameters)
    }

    /// Poll every interval until `cancel` fires, logging each change.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            let changes = tokio::select! {
                _ = cancel.cancelled() => break,
                changes = self.poll_once() => changes,
            };
            for change in changes {
                report(&change);
            }
        }
        tracing::debug!("Remote poller stopped");
    }
}

fn report(change: &RemoteChange) {
    match change {
        RemoteChange::PresetChanged(name) => tracing::info!("[RPC] Preset changed to: {name}"),
        RemoteChange::ParameterChanged(p) => {
            tracing::info!("[RPC] Parameter changed: {} = {} (id: {})", p.name, p.text, p.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(id: &str, value: f64) -> Parameter {
        Parameter {
            id: id.to_string(),
            name: id.to_uppercase(),
            text: format!("{value:.2}"),
            normalized_value: value,
        }
    }

    fn info(preset: &str) -> ProductInfo {
        serde_json::from_value(serde_json::json!({"current_preset": {"name": preset}})).unwrap()
    }

    #[test]
    fn test_diff_threshold_and_unknown_ids() {
        let old = vec![param("a", 0.5), param("b", 0.5), param("gone", 0.1)];
        let new = vec![
            param("a", 0.50005),
            param("b", 0.6),
            param("fresh", 0.9),
        ];
        let changed = diff_parameters(&old, &new);
        assert_eq!(changed, vec![param("b", 0.6)]);
    }

    #[test]
    fn test_first_snapshot_is_baseline() {
        let mut state = PollerState::new(Some("Init".into()));
        assert!(state
            .observe(Some(&info("Init")), Some(vec![param("a", 0.1)]))
            .is_empty());

        let changes = state.observe(Some(&info("Init")), Some(vec![param("a", 0.2)]));
        assert_eq!(changes, vec![RemoteChange::ParameterChanged(param("a", 0.2))]);
    }

    #[test]
    fn test_preset_change_resets_baseline() {
        let mut state = PollerState::new(Some("Init".into()));
        state.observe(Some(&info("Init")), Some(vec![param("a", 0.1)]));

        let changes = state.observe(Some(&info("Bright")), Some(vec![param("a", 0.9)]));
        assert_eq!(changes, vec![RemoteChange::PresetChanged("Bright".into())]);
        assert_eq!(state.preset(), Some("Bright"));

        let changes = state.observe(Some(&info("Bright")), Some(vec![param("a", 0.9)]));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_failed_fetches_keep_state() {
        let mut state = PollerState::default();
        state.observe(None, Some(vec![param("a", 0.1)]));
        assert!(state.observe(None, None).is_empty());

        let changes = state.observe(None, Some(vec![param("a", 0.3)]));
        assert_eq!(changes.len(), 1);
    }
}
