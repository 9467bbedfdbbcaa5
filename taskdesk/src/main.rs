//! `TaskDesk`: terminal client for the task API.
//!
//! ```bash
//! # Sign in and keep the token for later commands
//! eval "$(taskdesk login alice --password secret | grep ^export)"
//!
//! taskdesk dashboard
//! taskdesk tasks list --status in-progress
//! taskdesk tasks create "Write report" --priority high --assignee u1
//! taskdesk tasks edit 1 --status done
//! ```
//!
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskdesk/config.toml`). Logs go to a file so stdout only
//! carries view output.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskdesk::api::TokenSlot;
use taskdesk::api::http::HttpApi;
use taskdesk::app::{App, AppError};
use taskdesk::cli::Command;
use taskdesk::config::{CliArgs, ClientConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::from_cli(&cli)
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!(api_url = %config.api_url, "taskdesk starting");

    let token = TokenSlot::new();
    let api = match HttpApi::new(&config.api_url, config.request_timeout, token.clone()) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let app = App::new(api, token).with_default_username(config.username.clone());
    app.auth().restore(config.token.clone());

    let command = cli.command.unwrap_or(Command::Dashboard);
    match app.run(command).await {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(AppError::LoginRequired) => {
            eprintln!("{}", AppError::LoginRequired);
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until exit so buffered log
/// lines are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskdesk.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
