//! Configuration sections.
//!
//! Every section derives serde with per-field defaults and rejects unknown
//! fields, so a typo in a file fails loudly instead of being ignored.

use serde::{Deserialize, Serialize};
use switchyard_core::Mode;

/// Engine section.
///
/// ```
/// use switchyard_config::EngineSection;
/// use switchyard_core::Mode;
///
/// let section = EngineSection::default();
/// assert_eq!(section.mode, Mode::Debug);
/// assert!(!section.handle_method_not_allowed);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Run mode: `debug`, `release` or `test`.
    #[serde(default)]
    pub mode: Mode,

    /// Answer 405 with an `Allow` header instead of 404 when the path
    /// exists under other methods.
    #[serde(default)]
    pub handle_method_not_allowed: bool,

    /// Idle contexts kept for reuse.
    #[serde(default = "default_max_idle_contexts")]
    pub max_idle_contexts: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            handle_method_not_allowed: false,
            max_idle_contexts: default_max_idle_contexts(),
        }
    }
}

fn default_max_idle_contexts() -> usize {
    1024
}

/// Server section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// HTTP/1.1 keep-alive.
    #[serde(default = "default_true")]
    pub keep_alive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_body_bytes: default_max_body_bytes(),
            keep_alive: true,
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    4 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

/// Global request timeout section.
///
/// When enabled, a timeout guard is installed as a global step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSection {
    /// Install the guard.
    #[serde(default)]
    pub enabled: bool,

    /// Deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub duration_ms: u64,

    /// Message written on timeout.
    #[serde(default = "default_timeout_message")]
    pub message: String,

    /// Status written on timeout.
    #[serde(default = "default_timeout_status")]
    pub status: u16,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_ms: default_timeout_ms(),
            message: default_timeout_message(),
            status: default_timeout_status(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_timeout_message() -> String {
    switchyard_middleware::timeout::DEFAULT_MESSAGE.to_string()
}

fn default_timeout_status() -> u16 {
    switchyard_middleware::timeout::DEFAULT_STATUS.as_u16()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable lines.
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Install a log subscriber.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `switchyard_server=debug,info`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include file and line.
    #[serde(default)]
    pub file_line_info: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Install the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Scrape listener address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// Telemetry section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsSection,
}
