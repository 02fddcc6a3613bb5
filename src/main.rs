//! porta: SSH and HTTPS on one port.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────────┐
//!                    │                          PORTA                           │
//!                    │                                                          │
//!   :443 ────────────┼─▶ keepalive ─▶ demux ──SSH──▶ passthrough ──────────────┼──▶ local sshd
//!                    │                  │                                       │
//!                    │                  └─other─▶ TLS ─▶ security ─▶ virtual ──┼──▶ backends
//!                    │                                   headers      hosts     │
//!   :80  ────────────┼─▶ keepalive ─▶ redirector (301 → https://host/path)      │
//!                    │                                                          │
//!   :8080 ───────────┼─▶ keepalive ─▶ virtual hosts ───────────────────────────┼──▶ backends
//!                    │                                                          │
//!                    └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The first endpoint to stop, for any reason, terminates the process.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use porta::config::load_config;
use porta::observability::{logging, metrics};
use porta::Orchestrator;

#[derive(Parser)]
#[command(name = "porta")]
#[command(about = "Serve SSH and HTTPS on one port", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "/usr/local/etc/porta.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            tracing::error!(path = %cli.config.display(), error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!(path = %cli.config.display(), "porta v0.1.0 starting");

    if let Some(address) = &config.observability.metrics_address {
        match address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter");
                    return ExitCode::FAILURE;
                }
            }
            Err(e) => {
                tracing::error!(metrics_address = %address, error = %e, "Failed to parse metrics address");
                return ExitCode::FAILURE;
            }
        }
    }

    let orchestrator = match Orchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    match orchestrator.run().await {
        Some(exit) => match exit.result {
            Ok(()) => tracing::error!(endpoint = %exit.endpoint, "Endpoint stopped, shutting down"),
            Err(e) => tracing::error!(endpoint = %exit.endpoint, error = %e, "Endpoint failed, shutting down"),
        },
        None => tracing::error!("All endpoint tasks panicked, shutting down"),
    }
    ExitCode::FAILURE
}
