//! `agritroller-bus` -- standalone event bus server.
//!
//! Serves the controller's event stream endpoint and accepts events to
//! broadcast over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8080
//! cargo run --bin agritroller-bus
//!
//! # Run on custom address
//! cargo run --bin agritroller-bus -- --bind 127.0.0.1:9090
//!
//! # Publish an event
//! curl -X POST localhost:8080/api/events \
//!     -d '{"type":"wifi_status","payload":{"status":"connected","ssid":"Farm-5G"}}'
//! ```

use std::sync::Arc;

use agritroller_bus::bus::EventBus;
use agritroller_bus::config::{BusCliArgs, BusConfig};
use agritroller_bus::server::{self, BusState};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = BusCliArgs::parse();

    let config = match BusConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting agritroller event bus");

    let state = Arc::new(BusState::new(EventBus::new(config.event_buffer)));

    match server::start_server_with_state(&config.bind_addr.to_string(), state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "event bus listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "event bus server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start event bus");
            std::process::exit(1);
        }
    }
}
