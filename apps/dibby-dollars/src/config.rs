// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the parsed server settings.
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the ledger database | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `SESSION_SECRET` | HMAC secret for session tokens | random per process |
//! | `SESSION_TTL_HOURS` | Session lifetime | `12` |
//! | `CORS_ORIGINS` | Comma-separated allowed browser origins | `http://localhost:5173,http://localhost:5174` |
//! | `SEED_DEMO_DATA` | Seed behaviors, config and demo accounts (`true`/`false`) | `false` |
//! | `DISABLE_SCHEDULER` | Skip the snapshot/interest background task | `false` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; serve HTTPS when both are set | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `DIBBY_API_URL` | Base URL used by the dashboard client | `http://localhost:5000/api` |
//! | `DIBBY_SESSION_FILE` | Where the dashboard client persists its session | `./dibby-session.json` |
//! | `DIBBY_HTTP_TIMEOUT_SECS` | Overall timeout for client requests | `15` |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Environment variable name for the data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";
pub const SESSION_TTL_HOURS_ENV: &str = "SESSION_TTL_HOURS";
pub const CORS_ORIGINS_ENV: &str = "CORS_ORIGINS";
pub const SEED_DEMO_DATA_ENV: &str = "SEED_DEMO_DATA";
pub const DISABLE_SCHEDULER_ENV: &str = "DISABLE_SCHEDULER";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const API_URL_ENV: &str = "DIBBY_API_URL";
pub const SESSION_FILE_ENV: &str = "DIBBY_SESSION_FILE";
pub const HTTP_TIMEOUT_ENV: &str = "DIBBY_HTTP_TIMEOUT_SECS";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:5174";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SESSION_FILE: &str = "./dibby-session.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Ledger file name inside the data directory.
pub const LEDGER_FILE: &str = "dibby.redb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Parsed server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub session_secret: Option<String>,
    pub session_ttl_hours: i64,
    pub cors_origins: Vec<String>,
    pub seed_demo_data: bool,
    pub scheduler_enabled: bool,
    pub tls: Option<(PathBuf, PathBuf)>,
    pub log_format: LogFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address {0}")]
    BindAddress(String),
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup(PORT_ENV)
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let bind_addr = format!("{host}:{port}")
            .parse()
            .map_err(|_| ConfigError::BindAddress(format!("{host}:{port}")))?;

        let cors_origins = lookup(CORS_ORIGINS_ENV)
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let tls = match (lookup(TLS_CERT_PATH_ENV), lookup(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            _ => None,
        };

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            data_dir: PathBuf::from(
                lookup(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            session_secret: lookup(SESSION_SECRET_ENV).filter(|s| !s.trim().is_empty()),
            session_ttl_hours: lookup(SESSION_TTL_HOURS_ENV)
                .and_then(|h| h.trim().parse().ok())
                .filter(|h: &i64| *h > 0)
                .unwrap_or(DEFAULT_SESSION_TTL_HOURS),
            cors_origins,
            seed_demo_data: flag(lookup(SEED_DEMO_DATA_ENV)),
            scheduler_enabled: !flag(lookup(DISABLE_SCHEDULER_ENV)),
            tls,
            log_format,
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }
}

fn flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
