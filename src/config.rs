//! Command line and the validated configuration built from it.

use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use synthcast_core::{FourCharCode, SampleLayout};
use synthcast_plugin::{HostOptions, MatchCriteria};
use synthcast_remote::{RpcEndpoint, DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use synthcast_sink::{SinkTarget, DEFAULT_PIPE_PATH};

#[derive(Parser, Debug, Clone)]
#[command(name = "synthcast")]
#[command(
    about = "Host an instrument plugin, play it from MIDI and stream its audio as raw float32",
    long_about = None
)]
pub struct Cli {
    /// Audio unit subtype (4 characters)
    #[arg(short, long, required_unless_present = "list")]
    pub subtype: Option<String>,

    /// Audio unit manufacturer (4 characters)
    #[arg(short, long, required_unless_present = "list")]
    pub manufacturer: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Frames rendered per block
    #[arg(short, long, default_value_t = 512)]
    pub buffer_size: u32,

    /// Output sample layout
    #[arg(short, long, value_enum, default_value_t = LayoutArg::Interleaved)]
    pub format: LayoutArg,

    /// Named pipe to write to
    #[arg(long, default_value = DEFAULT_PIPE_PATH, conflicts_with = "tcp")]
    pub pipe: PathBuf,

    /// Stream to a TCP consumer at HOST:PORT instead of the pipe
    #[arg(long)]
    pub tcp: Option<String>,

    /// Poll the synthesizer's JSON-RPC server for preset and parameter changes
    #[arg(long)]
    pub rpc: bool,

    /// JSON-RPC server host
    #[arg(long, default_value = DEFAULT_RPC_HOST)]
    pub rpc_host: String,

    /// JSON-RPC server port
    #[arg(long, default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Pause after plugin initialization, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub warmup_ms: u64,

    /// List installed instruments and exit
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    Interleaved,
    Planar,
}

impl From<LayoutArg> for SampleLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Interleaved => SampleLayout::Interleaved,
            LayoutArg::Planar => SampleLayout::Planar,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Print the installed instruments.
    List,
    /// Host the instrument matching the criteria.
    Run(MatchCriteria),
}

/// Validated settings, built once at startup and handed to each component.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub action: Action,
    pub host: HostOptions,
    pub sink: SinkTarget,
    /// `None` leaves the remote poller off.
    pub rpc: Option<RpcEndpoint>,
    pub verbose: bool,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let action = if cli.list {
            Action::List
        } else {
            let subtype = parse_code("subtype", cli.subtype.as_deref())?;
            let manufacturer = parse_code("manufacturer", cli.manufacturer.as_deref())?;
            Action::Run(MatchCriteria::instrument(subtype, manufacturer))
        };

        if cli.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }

        let sink = match cli.tcp {
            Some(addr) => {
                let valid = addr
                    .rsplit_once(':')
                    .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
                if !valid {
                    return Err(ConfigError::InvalidTcpTarget(addr));
                }
                SinkTarget::Tcp(addr)
            }
            None => SinkTarget::Pipe(cli.pipe),
        };

        Ok(Self {
            action,
            host: HostOptions {
                max_frames: cli.buffer_size,
                layout: cli.format.into(),
                warmup: Duration::from_millis(cli.warmup_ms),
            },
            sink,
            rpc: cli
                .rpc
                .then(|| RpcEndpoint::new(cli.rpc_host, cli.rpc_port)),
            verbose: cli.verbose,
        })
    }

    /// Frames per render tick.
    pub fn block_frames(&self) -> u32 {
        self.host.max_frames
    }
}

fn parse_code(field: &'static str, value: Option<&str>) -> Result<FourCharCode, ConfigError> {
    value
        .unwrap_or_default()
        .parse()
        .map_err(|source| ConfigError::InvalidCode { field, source })
}
