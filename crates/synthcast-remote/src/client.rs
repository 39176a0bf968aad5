//! JSON-RPC 2.0 client for the synthesizer's remote control server.

use crate::error::{Result, RpcError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 8081;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcEndpoint {
    pub host: String,
    pub port: u16,
}

impl Default for RpcEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

impl RpcEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}/jsonrpc", self.host, self.port)
    }
}

impl fmt::Display for RpcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    method: &'a str,
    jsonrpc: &'static str,
    id: u64,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Preset {
    #[serde(default)]
    pub name: String,
}

/// First element of the `getInfo` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub current_preset: Option<Preset>,
}

impl ProductInfo {
    pub fn preset_name(&self) -> Option<&str> {
        self.current_preset.as_ref().map(|p| p.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Parameter {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub normalized_value: f64,
}

pub struct RpcClient {
    http: reqwest::Client,
    endpoint: RpcEndpoint,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: RpcEndpoint) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            url: endpoint.url(),
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &RpcEndpoint {
        &self.endpoint
    }

    /// Invoke `method` with empty params and return its `result`.
    pub async fn call(&self, method: &str) -> Result<Value> {
        let request = Request {
            method,
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            params: Value::Array(Vec::new()),
        };

        let response: Response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(RpcError::Protocol(format!("{method} failed: {error}")));
        }
        response
            .result
            .ok_or_else(|| RpcError::Protocol(format!("{method} returned no result")))
    }

    pub async fn get_info(&self) -> Result<ProductInfo> {
        let result = self.call("getInfo").await?;
        let mut infos: Vec<ProductInfo> = serde_json::from_value(result)?;
        if infos.is_empty() {
            return Err(RpcError::Protocol("getInfo returned an empty list".into()));
        }
        Ok(infos.swap_remove(0))
    }

    pub async fn get_parameters(&self) -> Result<Vec<Parameter>> {
        let result = self.call("getParameters").await?;
        Ok(serde_json::from_value(result)?)
    }
}
