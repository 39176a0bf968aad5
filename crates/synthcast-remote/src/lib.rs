//! Remote control poller for synthcast
//!
//! Some synthesizers expose a JSON-RPC server next to the audio plugin. When
//! enabled, the poller reports what the server is running at startup and then
//! logs preset switches and parameter moves every 500 ms.

pub mod error;
pub use error::{Result, RpcError};

mod client;
pub use client::{
    Parameter, Preset, ProductInfo, RpcClient, RpcEndpoint, DEFAULT_RPC_HOST, DEFAULT_RPC_PORT,
};

mod poller;
pub use poller::{
    diff_parameters, PollerState, RemoteChange, RemotePoller, CHANGE_THRESHOLD,
    DEFAULT_POLL_INTERVAL,
};
