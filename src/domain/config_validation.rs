//! Configuration validation.
//!
//! Validates all config fields before the server or CLI touches storage.

use crate::domain::error::StockfolioError;
use crate::ports::config_port::ConfigPort;
use std::net::SocketAddr;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

pub fn validate_app_config(config: &dyn ConfigPort) -> Result<(), StockfolioError> {
    match backend(config)? {
        Backend::Sqlite => require(config, "sqlite", "path")?,
        Backend::Postgres => require(config, "postgres", "connection_string")?,
    }
    validate_pool_size(config)?;
    validate_quote(config)?;
    listen_addr(config)?;
    Ok(())
}

pub fn backend(config: &dyn ConfigPort) -> Result<Backend, StockfolioError> {
    match config
        .get_string_or("database", "backend", "sqlite")
        .to_lowercase()
        .as_str()
    {
        "sqlite" => Ok(Backend::Sqlite),
        "postgres" | "postgresql" => Ok(Backend::Postgres),
        other => Err(StockfolioError::ConfigInvalid {
            section: "database".to_string(),
            key: "backend".to_string(),
            reason: format!("unknown backend '{other}', expected sqlite or postgres"),
        }),
    }
}

pub fn listen_addr(config: &dyn ConfigPort) -> Result<SocketAddr, StockfolioError> {
    config
        .get_string_or("web", "listen", DEFAULT_LISTEN)
        .parse()
        .map_err(|_| StockfolioError::ConfigInvalid {
            section: "web".to_string(),
            key: "listen".to_string(),
            reason: "expected host:port".to_string(),
        })
}

/// Maps the level names used by `DEBUG_LEVEL` (DEBUG, INFO, WARNING, ERROR,
/// CRITICAL) and tracing's own names to a tracing filter directive.
/// Unknown names fall back to warn.
pub fn log_level(config: &dyn ConfigPort) -> &'static str {
    match config
        .get_string_or("log", "level", DEFAULT_LOG_LEVEL)
        .to_lowercase()
        .as_str()
    {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "error" | "critical" => "error",
        _ => DEFAULT_LOG_LEVEL,
    }
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), StockfolioError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(StockfolioError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_pool_size(config: &dyn ConfigPort) -> Result<(), StockfolioError> {
    for section in ["sqlite", "postgres"] {
        let size = config.get_int(section, "pool_size", 4);
        if !(1..=64).contains(&size) {
            return Err(StockfolioError::ConfigInvalid {
                section: section.to_string(),
                key: "pool_size".to_string(),
                reason: "pool_size must be between 1 and 64".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_quote(config: &dyn ConfigPort) -> Result<(), StockfolioError> {
    let timeout = config.get_int("quote", "timeout_ms", 800);
    if !(1..=10_000).contains(&timeout) {
        return Err(StockfolioError::ConfigInvalid {
            section: "quote".to_string(),
            key: "timeout_ms".to_string(),
            reason: "timeout_ms must be between 1 and 10000".to_string(),
        });
    }
    let workers = config.get_int("quote", "workers", 8);
    if !(1..=64).contains(&workers) {
        return Err(StockfolioError::ConfigInvalid {
            section: "quote".to_string(),
            key: "workers".to_string(),
            reason: "workers must be between 1 and 64".to_string(),
        });
    }
    let base_url = config.get_string_or("quote", "base_url", "https://finnhub.io/api/v1");
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(StockfolioError::ConfigInvalid {
            section: "quote".to_string(),
            key: "base_url".to_string(),
            reason: "base_url must be an http(s) URL".to_string(),
        });
    }
    Ok(())
}
