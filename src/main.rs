//! Inference gateway.
//!
//! A reverse proxy in front of a set of AI inference backends, built with
//! Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::controller ──▶ routing::RouteTable
//!                                            │
//!                                            ▼
//!                                     queue::AdmissionQueue (one job at a time)
//!                                            │
//!                                            ▼
//!     Client Response                  proxy::relay ──▶ proxy::Forwarder ──▶ Backend
//!     ◀────────────── static headers ◀───────┘
//!
//!     Cross-cutting: config, observability, lifecycle, net::tls
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::net::TcpListener;

use inference_gateway::config::{self, StaticHeaders};
use inference_gateway::lifecycle::{signals, Shutdown};
use inference_gateway::net::tls::load_tls_config;
use inference_gateway::observability::{logging, metrics};
use inference_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "inference-gateway")]
#[command(about = "Reverse-proxy gateway for AI inference backends", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port, overriding the config file and `PORT`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Static response header document (JSON).
    #[arg(long)]
    headers: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    logging::init_logging(&config.observability, config.production);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "inference-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let headers_path = cli.headers.or_else(|| config.headers.path.as_ref().map(PathBuf::from));
    let headers = match headers_path.as_deref() {
        Some(path) => load_headers(path)?,
        None => StaticHeaders::default(),
    };

    tracing::info!(
        address = %config.listener.socket_addr(),
        routes = config.routes.len(),
        production = config.production,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = GatewayServer::new(&config, headers, &shutdown)?;
    let addr = config.listener.socket_addr();

    match &config.listener.tls {
        Some(tls) => {
            let tls = load_tls_config(tls).await?;
            server.run_tls(addr, tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn load_headers(path: &Path) -> Result<StaticHeaders, config::ConfigError> {
    let headers = StaticHeaders::load(path)?;
    tracing::info!(path = %path.display(), count = headers.len(), "Static headers loaded");
    Ok(headers)
}
