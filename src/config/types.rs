use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Named routes views can resolve, e.g. `home = "/"`.
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Path registered under `name` in `[routes]`.
    pub fn route(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(String::as_str)
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP server (host:port).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// How long in-flight requests may run after a shutdown signal (default: 5).
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

/// Per-session limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on live sessions (default: 256).
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Budget for one inbound event including the refresh it causes (default: 10000).
    #[serde(default = "default_event_timeout_ms")]
    pub event_timeout_ms: u64,
    /// Deepest view nesting rendered before the subtree is replaced by an
    /// error node (default: 64).
    #[serde(default = "default_render_depth_limit")]
    pub render_depth_limit: usize,
}

/// Tracing output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write logs to this file instead of stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:7878".to_string()
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_max_sessions() -> usize {
    256
}

fn default_event_timeout_ms() -> u64 {
    10_000
}

fn default_render_depth_limit() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            event_timeout_ms: default_event_timeout_ms(),
            render_depth_limit: default_render_depth_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}
