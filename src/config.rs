//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for the SDK, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults for a locally running Agent
//! - Builder overrides (explicit values passed to `DriverBuilder` win)
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TP_DEV_TOKEN` | Developer token sent to the Agent | none |
//! | `TP_AGENT_URL` | Agent base URL | `http://localhost:8585` |
//! | `TP_KEEP_DRIVER_SESSION` | Skip the real quit on teardown | `false` |
//! | `TP_MAX_REPORTS_BATCH_SIZE` | Max report items per batch request | `10` |
//! | `TP_AGENT_CONNECT_TIMEOUT` | HTTP connect timeout in seconds | `10` |
//! | `TP_AGENT_SESSION_TIMEOUT` | Session start timeout in seconds | `120` |
//! | `TP_REPORTS_DRAIN_TIMEOUT` | Report drain timeout on stop in seconds | `10` |
//!
//! # Example
//!
//! ```bash
//! export TP_DEV_TOKEN="my-token"
//! export TP_AGENT_URL="http://10.0.0.5:8585"
//!
//! # Keep the browser open after the test finishes
//! export TP_KEEP_DRIVER_SESSION=true
//! ```

use std::env;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default Agent base URL
pub const DEFAULT_AGENT_URL: &str = "http://localhost:8585";

/// Default maximum number of report items per batch request
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default HTTP connect timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Default session start timeout (seconds). The Agent may download a
/// browser driver before answering.
pub const DEFAULT_SESSION_TIMEOUT: u64 = 120;

/// Default per-report request timeout (seconds)
pub const DEFAULT_REPORT_TIMEOUT: u64 = 30;

/// Default bounded drain wait when stopping the report queue (seconds)
pub const DEFAULT_DRAIN_TIMEOUT: u64 = 10;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the developer token
pub const ENV_DEV_TOKEN: &str = "TP_DEV_TOKEN";

/// Environment variable for the Agent URL
pub const ENV_AGENT_URL: &str = "TP_AGENT_URL";

/// Environment variable requesting that the driver session stays alive
pub const ENV_KEEP_SESSION: &str = "TP_KEEP_DRIVER_SESSION";

/// Environment variable overriding the batch size
pub const ENV_BATCH_SIZE: &str = "TP_MAX_REPORTS_BATCH_SIZE";

/// Environment variable for the HTTP connect timeout
pub const ENV_CONNECT_TIMEOUT: &str = "TP_AGENT_CONNECT_TIMEOUT";

/// Environment variable for the session start timeout
pub const ENV_SESSION_TIMEOUT: &str = "TP_AGENT_SESSION_TIMEOUT";

/// Environment variable for the report drain timeout
pub const ENV_DRAIN_TIMEOUT: &str = "TP_REPORTS_DRAIN_TIMEOUT";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized SDK configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Agent connection settings
    pub agent: AgentSettings,
    /// Report delivery settings
    pub reports: ReportQueueSettings,
    /// Driver lifecycle settings
    pub driver: DriverSettings,
}

/// Agent connection settings
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Agent base URL
    pub url: String,
    /// Developer token, if present in the environment
    pub token: Option<String>,
    /// HTTP connect timeout (seconds)
    pub connect_timeout: u64,
    /// Session start timeout (seconds)
    pub session_timeout: u64,
}

/// Report delivery settings
#[derive(Debug, Clone)]
pub struct ReportQueueSettings {
    /// Maximum items per batch request (always at least 1)
    pub batch_size: usize,
    /// Per-report request timeout (seconds)
    pub request_timeout: u64,
    /// Bounded drain wait on stop (seconds)
    pub drain_timeout: u64,
}

/// Driver lifecycle settings
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Skip the real quit when the driver is torn down
    pub keep_session: bool,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            agent: AgentSettings::from_env(),
            reports: ReportQueueSettings::from_env(),
            driver: DriverSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            agent: AgentSettings::defaults(),
            reports: ReportQueueSettings::defaults(),
            driver: DriverSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AgentSettings {
    /// Create Agent settings from environment variables
    pub fn from_env() -> Self {
        Self {
            url: env::var(ENV_AGENT_URL)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AGENT_URL.to_string()),
            token: env::var(ENV_DEV_TOKEN)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            connect_timeout: parse_env(ENV_CONNECT_TIMEOUT).unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            session_timeout: parse_env(ENV_SESSION_TIMEOUT).unwrap_or(DEFAULT_SESSION_TIMEOUT),
        }
    }

    /// Create Agent settings with defaults
    pub fn defaults() -> Self {
        Self {
            url: DEFAULT_AGENT_URL.to_string(),
            token: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout)
    }
}

impl ReportQueueSettings {
    /// Create report settings from environment variables
    pub fn from_env() -> Self {
        Self {
            batch_size: parse_env::<usize>(ENV_BATCH_SIZE)
                .unwrap_or(DEFAULT_BATCH_SIZE)
                .max(1),
            request_timeout: DEFAULT_REPORT_TIMEOUT,
            drain_timeout: parse_env(ENV_DRAIN_TIMEOUT).unwrap_or(DEFAULT_DRAIN_TIMEOUT),
        }
    }

    /// Create report settings with defaults
    pub fn defaults() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: DEFAULT_REPORT_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout)
    }
}

impl DriverSettings {
    /// Create driver settings from environment variables
    pub fn from_env() -> Self {
        Self {
            keep_session: env::var(ENV_KEEP_SESSION)
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    /// Create driver settings with defaults
    pub fn defaults() -> Self {
        Self { keep_session: false }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Interpret a boolean-ish environment value ("1", "true", "yes", "on")
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
