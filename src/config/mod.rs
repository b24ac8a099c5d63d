//! CLI argument parsing and layered configuration loading.
//!
//! Precedence, lowest to highest: built-in defaults → config file (XDG
//! default path or `--config`) → `RINGLEADER_*` environment variables →
//! CLI flags. Unknown keys in the config file are warned about, not
//! rejected, so an older config keeps working against a newer binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use directories::ProjectDirs;
use serde::Deserialize;

/// Command-line arguments, parsed with clap's derive API. No subcommands —
/// the program has exactly one mode of operation.
#[derive(Debug, Parser)]
#[command(name = "ringleader", version, about = "Terminal orchestrator for concurrent, containerized AI coding agents")]
pub struct Args {
    /// Repository root to operate in. Defaults to the current directory.
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Path to a TOML config file overriding defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write structured logs here instead of the default state-dir location.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the resolved state file path and exit.
    #[arg(long)]
    pub print_state_path: bool,
}

/// All-`Option` mirror of [`Config`], the deserialization target for the
/// TOML config file — every field is optional so a partial file only
/// overrides what it mentions.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields = false)]
struct PartialConfig {
    max_workstreams: Option<usize>,
    mouse_enabled: Option<bool>,
    init_timeout_secs: Option<u64>,
    toast_duration_ms: Option<u64>,
    escape_timeout_ms: Option<u64>,
    prefix_timeout_ms: Option<u64>,
    pairing_health_interval_secs: Option<u64>,
    spinner_interval_ms: Option<u64>,
    fade_interval_ms: Option<u64>,
    auto_continue_delay_ms: Option<u64>,
    persist_debounce_ms: Option<u64>,
    container_engine: Option<String>,
}

/// Fully resolved runtime configuration, covering every tunable named in
/// the user-interface section: capacity limit, mouse support, and the
/// timing constants governing initialization, toasts, escape/prefix-key
/// disambiguation, pairing health polling, the spinner, fade animation,
/// auto-continue, and debounced persistence.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_workstreams: usize,
    pub mouse_enabled: bool,
    pub init_timeout: Duration,
    pub toast_duration: Duration,
    pub escape_timeout: Duration,
    pub prefix_timeout: Duration,
    pub pairing_health_interval: Duration,
    pub spinner_interval: Duration,
    pub fade_interval: Duration,
    pub auto_continue_delay: Duration,
    pub persist_debounce: Duration,
    /// Binary name for the container engine CLI (`docker`, `podman`, ...).
    /// `container::Engine` shells out to whatever this names, so a drop-in
    /// podman install needs nothing beyond this one setting.
    pub container_engine: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workstreams: 9,
            mouse_enabled: true,
            init_timeout: Duration::from_secs(5 * 60),
            toast_duration: Duration::from_secs(2),
            escape_timeout: Duration::from_millis(300),
            prefix_timeout: Duration::from_secs(2),
            pairing_health_interval: Duration::from_secs(30),
            spinner_interval: Duration::from_millis(250),
            fade_interval: Duration::from_millis(16),
            auto_continue_delay: Duration::from_millis(500),
            persist_debounce: Duration::from_millis(350),
            container_engine: "docker".to_string(),
        }
    }
}

impl Config {
    /// Resolves the default config file path under the XDG config
    /// directory, mirroring [`crate::persistence::Store::state_dir`]'s use
    /// of `directories::ProjectDirs`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "ringleader", "ringleader")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads configuration by applying, in order: built-in defaults, the
    /// config file at `config_path` (or the XDG default if `None` and a
    /// file exists there), `RINGLEADER_*` environment variables, then
    /// `args`. Missing files are silently skipped; a present-but-unparsable
    /// file is an error, since the user clearly meant to change something.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let file_path = args.config.clone().or_else(Config::default_path);
        if let Some(path) = file_path {
            if path.exists() {
                apply_file(&mut config, &path)?;
            }
        }

        apply_env(&mut config);

        Ok(config)
    }
}

fn apply_file(config: &mut Config, path: &Path) -> Result<(), ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (partial, unknown): (PartialConfig, Vec<String>) = {
        let value: toml::Value = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let known_keys = [
            "max_workstreams", "mouse_enabled", "init_timeout_secs", "toast_duration_ms",
            "escape_timeout_ms", "prefix_timeout_ms", "pairing_health_interval_secs",
            "spinner_interval_ms", "fade_interval_ms", "auto_continue_delay_ms",
            "persist_debounce_ms", "container_engine",
        ];
        let unknown = value
            .as_table()
            .map(|table| {
                table
                    .keys()
                    .filter(|k| !known_keys.contains(&k.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let partial = value.try_into().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        (partial, unknown)
    };

    for key in unknown {
        log::warn!("ignoring unknown config key `{key}` in {}", path.display());
    }

    if let Some(v) = partial.max_workstreams { config.max_workstreams = v; }
    if let Some(v) = partial.mouse_enabled { config.mouse_enabled = v; }
    if let Some(v) = partial.init_timeout_secs { config.init_timeout = Duration::from_secs(v); }
    if let Some(v) = partial.toast_duration_ms { config.toast_duration = Duration::from_millis(v); }
    if let Some(v) = partial.escape_timeout_ms { config.escape_timeout = Duration::from_millis(v); }
    if let Some(v) = partial.prefix_timeout_ms { config.prefix_timeout = Duration::from_millis(v); }
    if let Some(v) = partial.pairing_health_interval_secs {
        config.pairing_health_interval = Duration::from_secs(v);
    }
    if let Some(v) = partial.spinner_interval_ms { config.spinner_interval = Duration::from_millis(v); }
    if let Some(v) = partial.fade_interval_ms { config.fade_interval = Duration::from_millis(v); }
    if let Some(v) = partial.auto_continue_delay_ms {
        config.auto_continue_delay = Duration::from_millis(v);
    }
    if let Some(v) = partial.persist_debounce_ms { config.persist_debounce = Duration::from_millis(v); }
    if let Some(v) = partial.container_engine { config.container_engine = v; }

    Ok(())
}

fn apply_env(config: &mut Config) {
    if let Ok(v) = std::env::var("RINGLEADER_MAX_WORKSTREAMS") {
        if let Ok(v) = v.parse() {
            config.max_workstreams = v;
        }
    }
    if let Ok(v) = std::env::var("RINGLEADER_MOUSE_ENABLED") {
        if let Ok(v) = v.parse() {
            config.mouse_enabled = v;
        }
    }
    if let Ok(v) = std::env::var("RINGLEADER_CONTAINER_ENGINE") {
        config.container_engine = v;
    }
}

/// Errors loading the config file. A missing file is not an error (the
/// caller checks existence first); these only cover a file that exists but
/// can't be read or parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("could not parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(extra: &[&str]) -> Args {
        let mut argv = vec!["ringleader"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.max_workstreams, 9);
        assert!(config.mouse_enabled);
        assert_eq!(config.escape_timeout, Duration::from_millis(300));
    }

    #[test]
    fn file_overrides_defaults_for_known_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_workstreams = 4\nmouse_enabled = false\n").unwrap();
        let mut config = Config::default();
        apply_file(&mut config, &path).unwrap();
        assert_eq!(config.max_workstreams, 4);
        assert!(!config.mouse_enabled);
    }

    #[test]
    fn unknown_keys_are_ignored_not_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_workstreams = 3\nsome_future_key = true\n").unwrap();
        let mut config = Config::default();
        let result = apply_file(&mut config, &path);
        assert!(result.is_ok());
        assert_eq!(config.max_workstreams, 3);
    }

    #[test]
    fn cli_args_parse_verbosity_flags() {
        let args = parse_args(&["-vv"]);
        assert_eq!(args.verbose, 2);
    }
}
