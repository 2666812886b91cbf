//! Binary crate for the `weather` services.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Wiring configuration, telemetry and providers
//! - Serving the gateway or the resolver until shutdown

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
