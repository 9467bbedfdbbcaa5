//! `TaskDesk` reference server: an in-memory task API.
//!
//! ```bash
//! # Run on default address 127.0.0.1:8080
//! cargo run --bin taskdesk-server
//!
//! # Custom address
//! cargo run --bin taskdesk-server -- --bind 0.0.0.0:9090
//! TASKDESK_BIND=0.0.0.0:9090 cargo run --bin taskdesk-server
//! ```

use std::sync::Arc;

use clap::Parser;
use taskdesk_server::config::{ServerCliArgs, ServerConfig};
use taskdesk_server::routes::{self, ServerState};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting taskdesk server");

    tracing::info!(admins = ?config.admins, "admin usernames");
    let state = Arc::new(ServerState::with_limits(config.limits).with_admins(config.admins));

    match routes::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "taskdesk server listening on /api");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
