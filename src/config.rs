use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server configuration.
///
/// Loaded from an optional YAML file (path taken from the `FILEDROP_CONFIG`
/// environment variable, falling back to `filedrop.yaml` in the working
/// directory). Missing file means built-in defaults. The `LISTEN` environment
/// variable overrides the listen address either way.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the TCP listener binds, e.g. "127.0.0.1:9999"
    pub listen_addr: String,

    /// Directory GET requests are served from
    pub serve_root: PathBuf,

    /// Directory uploads, deletes, and listings operate on
    pub storage_root: PathBuf,

    /// Per-connection inactivity timeout in seconds
    pub timeout_secs: u64,

    /// Rate-limiter settings
    pub limits: Limits,
}

/// Sliding-window rate-limiter settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum admitted requests per window, per client IP
    pub max_requests: usize,

    /// Window length in seconds
    pub window_secs: u64,

    /// Idle entries older than this are swept, in seconds
    pub idle_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:9999".to_string(),
            serve_root: PathBuf::from("."),
            storage_root: PathBuf::from("./storage"),
            timeout_secs: 120,
            limits: Limits::default(),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
            idle_ttl_secs: 3600,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("FILEDROP_CONFIG")
            .unwrap_or_else(|_| "filedrop.yaml".to_string());

        let mut cfg = if Path::new(&path).exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path))?
        } else {
            Config::default()
        };

        if let Ok(addr) = std::env::var("LISTEN") {
            cfg.listen_addr = addr;
        }

        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Limits {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}
