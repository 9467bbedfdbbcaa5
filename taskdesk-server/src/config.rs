//! Configuration for the `TaskDesk` reference server.
//!
//! Priority (highest first): CLI arguments, environment variables (via
//! clap `env`), TOML file (`~/.config/taskdesk-server/config.toml`),
//! compiled defaults.

use std::path::{Path, PathBuf};

use taskdesk_proto::task::{MAX_TASK_DESCRIPTION_LENGTH, MAX_TASK_TITLE_LENGTH};

use crate::store::DEFAULT_ADMIN;

/// Errors that can occur when loading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    max_title_len: Option<usize>,
    max_description_len: Option<usize>,
    admins: Option<Vec<String>>,
}

/// CLI arguments for the server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "TaskDesk reference server")]
pub struct ServerCliArgs {
    /// Address to bind to.
    #[arg(short, long, env = "TASKDESK_BIND")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/taskdesk-server/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum task title length in characters.
    #[arg(long)]
    pub max_title_len: Option<usize>,

    /// Maximum task description length in characters.
    #[arg(long)]
    pub max_description_len: Option<usize>,

    /// Username granted the `ADMIN` role; repeat for several.
    #[arg(long = "admin", value_name = "USERNAME")]
    pub admins: Vec<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKDESK_SERVER_LOG")]
    pub log_level: String,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the server to (e.g. `127.0.0.1:8080`).
    pub bind_addr: String,
    /// Field limits enforced on create and update.
    pub limits: Limits,
    /// Usernames granted the `ADMIN` role, which may delete tasks.
    pub admins: Vec<String>,
    /// Log level filter string.
    pub log_level: String,
}

/// Field length limits, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_title_len: usize,
    pub max_description_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_title_len: MAX_TASK_TITLE_LENGTH,
            max_description_len: MAX_TASK_DESCRIPTION_LENGTH,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            limits: Limits::default(),
            admins: vec![DEFAULT_ADMIN.to_string()],
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or any config file cannot be parsed.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    fn resolve(cli: &ServerCliArgs, file: &ServerConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            limits: Limits {
                max_title_len: cli
                    .max_title_len
                    .or(file.server.max_title_len)
                    .unwrap_or(defaults.limits.max_title_len),
                max_description_len: cli
                    .max_description_len
                    .or(file.server.max_description_len)
                    .unwrap_or(defaults.limits.max_description_len),
            },
            admins: if cli.admins.is_empty() {
                file.server.admins.clone().unwrap_or(defaults.admins)
            } else {
                cli.admins.clone()
            },
            log_level: cli.log_level.clone(),
        }
    }
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<ServerConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ServerConfigFile::default());
        };
        config_dir.join("taskdesk-server").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
