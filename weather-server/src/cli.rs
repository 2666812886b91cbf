use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use weather_core::{
    GatewayConfig, Pipeline, ResolverConfig, Telemetry,
    http::{gateway, resolver},
    provider::{ViaCepProvider, WeatherApiProvider, http_client},
    telemetry::{SHUTDOWN_TIMEOUT, init_logging},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Postal code weather services")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Public endpoint: validates postal codes and forwards them to the resolver.
    Gateway {
        /// Listen address; overrides LISTEN_ADDR.
        #[arg(long)]
        listen: Option<String>,
    },

    /// Internal endpoint: resolves postal codes to temperatures.
    Resolver {
        /// Listen address; overrides LISTEN_ADDR.
        #[arg(long)]
        listen: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Gateway { listen } => {
                let mut config = GatewayConfig::from_env();
                if let Some(listen) = listen {
                    config.listen_addr = listen;
                }
                run_gateway(config).await
            }
            Command::Resolver { listen } => {
                let mut config = ResolverConfig::from_env();
                if let Some(listen) = listen {
                    config.listen_addr = listen;
                }
                run_resolver(config).await
            }
        }
    }
}

async fn run_gateway(config: GatewayConfig) -> Result<()> {
    init_logging(&config.telemetry.log_filter)?;
    let telemetry = Telemetry::init(&config.telemetry);
    let http = http_client().context("Failed to build outbound HTTP client")?;

    info!(resolver = %config.resolver_url, "starting gateway");
    let state = gateway::GatewayState::new(http, config.resolver_url.clone(), telemetry.clone());

    let served = serve(&config.listen_addr, gateway::router(state)).await;
    telemetry.shutdown(SHUTDOWN_TIMEOUT).await;
    served
}

async fn run_resolver(config: ResolverConfig) -> Result<()> {
    init_logging(&config.telemetry.log_filter)?;
    let telemetry = Telemetry::init(&config.telemetry);
    let http = http_client().context("Failed to build outbound HTTP client")?;

    if config.weather_api_key.is_none() {
        warn!("WEATHER_API_KEY is not set; every weather lookup will fail");
    }

    let geocoder = Arc::new(ViaCepProvider::new(http.clone(), telemetry.clone()));
    let weather = Arc::new(WeatherApiProvider::new(
        config.weather_api_key.clone(),
        http,
        telemetry.clone(),
    ));
    let pipeline = Pipeline::new(geocoder, weather, telemetry.clone());

    info!("starting resolver");
    let state = resolver::ResolverState::new(pipeline, telemetry.clone());

    let served = serve(&config.listen_addr, resolver::router(state)).await;
    telemetry.shutdown(SHUTDOWN_TIMEOUT).await;
    served
}

async fn serve(addr: &str, app: Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["weather", "gateway", "--listen", "127.0.0.1:1"]).unwrap();
        assert!(matches!(cli.command, Command::Gateway { listen: Some(ref l) } if l == "127.0.0.1:1"));

        let cli = Cli::try_parse_from(["weather", "resolver"]).unwrap();
        assert!(matches!(cli.command, Command::Resolver { listen: None }));
    }
}
