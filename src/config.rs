//! TOML configuration for the monitor.
//!
//! Every field has a default, so an absent file, an empty file and a file
//! with a single section are all valid. CLI flags are applied on top in
//! `main` via [`MonitorConfig::apply_overrides`].

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Args;
use crate::error::{MonitorError, Result};
use crate::refresh::OverlapPolicy;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub api: ApiConfig,
    pub refresh: RefreshConfig,
    pub server: ServerConfig,
    pub display: DisplayConfig,
    pub log: LogConfig,
}

/// Where monitoring data comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL for the remote monitoring API. `None` selects mock data.
    pub base_url: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Seed for the mock generator; `None` seeds from entropy.
    pub mock_seed: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            connect_timeout_ms: 3_000,
            request_timeout_ms: 10_000,
            mock_seed: None,
        }
    }
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_ms: u64,
    pub overlap: OverlapPolicy,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            overlap: OverlapPolicy::Skip,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8888,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Offset applied to timestamps before display. Brasília time by default.
    pub utc_offset_minutes: i32,
    pub title: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: -180,
            title: "AUDITORIA360 · Monitoramento".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Parse a configuration from TOML text. `origin` is only used in errors.
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| MonitorError::Config {
            path: origin.to_string(),
            detail: e.to_string(),
        })
    }

    /// Load from `path`, or return defaults when no path is given.
    ///
    /// # Errors
    /// - `MonitorError::Io` when the file cannot be read.
    /// - `MonitorError::Config` when the TOML does not match the schema.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                Self::from_toml_str(&text, &p.display().to_string())
            }
        }
    }

    /// Apply CLI flags on top of file values. Flags left unset keep the file value.
    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(url) = &args.base_url {
            self.api.base_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(ms) = args.interval_ms {
            self.refresh.interval_ms = ms;
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(bind) = &args.bind {
            self.server.bind = bind.clone();
        }
        if let Some(seed) = args.seed {
            self.api.mock_seed = Some(seed);
        }
        if let Some(filter) = &args.log {
            self.log.filter = filter.clone();
        }
    }
}
