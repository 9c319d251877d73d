//! Configuration for the chat binary
//!
//! Supports both command-line arguments and an optional TOML file.
//! CLI arguments take precedence over config file values.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::error::AppError;

/// Which side of the chat to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Server,
    Client,
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "tcp_chat")]
#[command(version = "0.1.0")]
#[command(about = "Multi-user TCP chat server and client", long_about = None)]
pub struct CliArgs {
    /// Run as "server" or "client"
    #[arg(long, value_enum, ignore_case = true, default_value = "client")]
    pub mode: Mode,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Server address (e.g., 127.0.0.1:3569)
    #[arg(short, long)]
    pub addr: Option<String>,

    /// Chat log file written by the server
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to, or to connect to in client mode
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Chat log location
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            log_file: default_log_file(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:3569".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub addr: String,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    ///
    /// An unknown `--mode` makes clap print usage and exit with status 2.
    pub fn load() -> Result<Self, AppError> {
        Self::from_args(CliArgs::parse())
    }

    /// Merge parsed CLI args with the TOML file they point at
    pub fn from_args(cli: CliArgs) -> Result<Self, AppError> {
        let toml_config = match cli.config {
            Some(ref path) => read_toml(path)?,
            None => TomlConfig::default(),
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            mode: cli.mode,
            addr: cli.addr.unwrap_or(toml_config.server.addr),
            log_file: cli.log_file.unwrap_or(toml_config.server.log_file),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }
}

fn read_toml(path: &Path) -> Result<TomlConfig, AppError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| AppError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("tcp_chat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_args(parse(&[])).unwrap();
        assert_eq!(config.mode, Mode::Client);
        assert_eq!(config.addr, "127.0.0.1:3569");
        assert_eq!(config.log_file, PathBuf::from("logs.txt"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_mode_is_case_insensitive() {
        assert_eq!(parse(&["--mode", "server"]).mode, Mode::Server);
        assert_eq!(parse(&["--mode", "SERVER"]).mode, Mode::Server);
        assert_eq!(parse(&["--mode", "Client"]).mode, Mode::Client);
    }

    #[test]
    fn test_unknown_mode_is_usage_error() {
        let err = CliArgs::try_parse_from(["tcp_chat", "--mode", "relay"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            addr = "0.0.0.0:4000"
            log_file = "/var/log/chat.txt"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:4000");
        assert_eq!(config.server.log_file, PathBuf::from("/var/log/chat.txt"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.toml");
        std::fs::write(
            &path,
            "[server]\naddr = \"0.0.0.0:4000\"\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = Config::from_args(parse(&[
            "--config",
            path.to_str().unwrap(),
            "--addr",
            "127.0.0.1:5000",
        ]))
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:5000");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_file, PathBuf::from("logs.txt"));
    }

    #[test]
    fn test_explicit_default_log_level_beats_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let config = Config::from_args(parse(&[
            "--config",
            path.to_str().unwrap(),
            "--log-level",
            "info",
        ]))
        .unwrap();

        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::from_args(parse(&["--config", "/nonexistent/chat.toml"]));
        assert!(matches!(result, Err(AppError::ConfigRead { .. })));
    }

    #[test]
    fn test_bad_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.toml");
        std::fs::write(&path, "[server\n").unwrap();

        let result = Config::from_args(parse(&["--config", path.to_str().unwrap()]));
        assert!(matches!(result, Err(AppError::ConfigParse { .. })));
    }
}
