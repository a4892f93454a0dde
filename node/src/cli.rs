//! # CLI Interface
//!
//! Command-line arguments for `permaseed-node`. Every `run` option has an
//! environment-variable fallback so the node can be configured entirely
//! from a container environment.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use permaseed::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

/// Permaseed seeding node.
///
/// Accepts transactions, chunks and bundled items over HTTP, allocates
/// their place in the node's byte-address space, and serves stored content
/// back by id or manifest path.
#[derive(Parser, Debug)]
#[command(
    name = "permaseed-node",
    about = "Permaseed data-seeding node",
    version,
    propagate_version = true
)]
pub struct PermaseedNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the seeding node.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the node database. Created on first run.
    #[arg(
        long,
        short = 'd',
        env = "PERMASEED_DATA_DIR",
        default_value = "./permaseed-data"
    )]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[arg(long, env = "PERMASEED_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "PERMASEED_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "PERMASEED_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Default filter when `RUST_LOG` is unset.
    #[arg(
        long,
        default_value = "permaseed_node=info,permaseed=info,tower_http=debug"
    )]
    pub log_level: String,
}
