//! Configuration file management for optic.
//!
//! Provides a TOML-based config file at `~/.config/optic/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use optic_core::{PlannerConfig, ServiceConfig};

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub planner: PlannerSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSection {
    /// Path to the planner executable.
    pub path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    /// Parent directory for per-request workspaces.
    pub workspace_root: Option<PathBuf>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the optic config directory: `$XDG_CONFIG_HOME/optic` or
/// `~/.config/optic`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("optic");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("optic")
}

/// Return the path to the optic config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load the config file. A missing file is `Ok(None)`; a malformed one is
/// an error.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub planner: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub workspace_root: Option<PathBuf>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct OpticConfig {
    pub bind: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub service: ServiceConfig,
}

impl OpticConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - planner: `--planner` > `OPTIC_PLANNER_PATH` > `planner.path` > `/app/optic`
    /// - timeout: `--timeout` > `OPTIC_PLANNER_TIMEOUT_SECS` > `planner.timeout_secs` > 60
    /// - bind: `--bind` > `OPTIC_BIND` > `server.bind` > `0.0.0.0`
    /// - port: `--port` > `OPTIC_PORT` > `server.port` > 5000
    /// - workspace root: `--workspace-root` > `OPTIC_WORKSPACE_ROOT` > `planner.workspace_root` > OS temp dir
    /// - body limit: `OPTIC_MAX_BODY_BYTES` > `server.max_body_bytes` > 32 MiB
    pub fn resolve(cli: &Overrides) -> Result<Self> {
        let file = load_config()?.unwrap_or_default();

        let executable = cli
            .planner
            .clone()
            .or(env_value::<PathBuf>("OPTIC_PLANNER_PATH")?)
            .or(file.planner.path)
            .unwrap_or_else(|| PathBuf::from(PlannerConfig::DEFAULT_EXECUTABLE));

        let timeout_secs = cli
            .timeout_secs
            .or(env_value("OPTIC_PLANNER_TIMEOUT_SECS")?)
            .or(file.planner.timeout_secs)
            .unwrap_or(PlannerConfig::DEFAULT_TIMEOUT_SECS);

        let workspace_root = cli
            .workspace_root
            .clone()
            .or(env_value::<PathBuf>("OPTIC_WORKSPACE_ROOT")?)
            .or(file.planner.workspace_root);

        let bind = cli
            .bind
            .clone()
            .or(env_value("OPTIC_BIND")?)
            .or(file.server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let port = cli
            .port
            .or(env_value("OPTIC_PORT")?)
            .or(file.server.port)
            .unwrap_or(DEFAULT_PORT);

        let max_body_bytes = env_value("OPTIC_MAX_BODY_BYTES")?
            .or(file.server.max_body_bytes)
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        Ok(Self {
            bind,
            port,
            max_body_bytes,
            service: ServiceConfig {
                planner: PlannerConfig::new(executable, Duration::from_secs(timeout_secs)),
                workspace_root,
            },
        })
    }
}

/// Read and parse an env var. Unset or empty is `None`; unparseable is an error.
fn env_value<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        _ => Ok(None),
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
