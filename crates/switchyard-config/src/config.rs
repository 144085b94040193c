//! Root configuration and its conversions into runtime types.

use std::net::SocketAddr;
use std::time::Duration;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use switchyard_core::Mode;
use switchyard_middleware::Timeout;
use switchyard_server::{EngineConfig, ServerConfig};
use switchyard_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};

use crate::schema::{
    EngineSection, LogFormat, ServerSection, TelemetrySection, TimeoutSection,
};
use crate::ConfigError;

/// Complete Switchyard configuration.
///
/// ```
/// use switchyard_config::SwitchyardConfig;
///
/// let config = SwitchyardConfig::default();
/// assert!(config.validate().is_ok());
/// assert!(config.timeout_guard().is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SwitchyardConfig {
    /// Dispatch engine settings.
    #[serde(default)]
    pub engine: EngineSection,

    /// HTTP host settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Global request timeout.
    #[serde(default)]
    pub timeout: TimeoutSection,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl SwitchyardConfig {
    /// Checks values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.telemetry.metrics.enabled
            && self.telemetry.metrics.addr.parse::<SocketAddr>().is_err()
        {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.addr",
                format!("invalid socket address: {}", self.telemetry.metrics.addr),
            ));
        }

        if self.engine.max_idle_contexts == 0 {
            return Err(ConfigError::invalid_value(
                "engine.max_idle_contexts",
                "must be at least 1",
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be at least 1",
            ));
        }

        if self.timeout.duration_ms == 0 {
            return Err(ConfigError::invalid_value(
                "timeout.duration_ms",
                "must be greater than zero",
            ));
        }

        if StatusCode::from_u16(self.timeout.status).is_err() {
            return Err(ConfigError::invalid_value(
                "timeout.status",
                format!("not an HTTP status code: {}", self.timeout.status),
            ));
        }

        if let Err(err) = switchyard_telemetry::logging::create_env_filter(
            &self.telemetry.logging.level,
        ) {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                err.to_string(),
            ));
        }

        Ok(())
    }

    /// Debug mode, pretty logs at debug level with source locations.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.engine.mode = Mode::Debug;
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.file_line_info = true;
        config
    }

    /// Release mode, JSON logs at info level, 405 handling and a 30s guard.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.engine.mode = Mode::Release;
        config.engine.handle_method_not_allowed = true;
        config.timeout.enabled = true;
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.metrics.enabled = true;
        config
    }

    /// Engine settings.
    #[must_use]
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            mode: self.engine.mode,
            handle_method_not_allowed: self.engine.handle_method_not_allowed,
            max_idle_contexts: self.engine.max_idle_contexts,
        }
    }

    /// Host settings.
    #[must_use]
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::builder()
            .http_addr(self.server.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(self.server.shutdown_timeout_secs))
            .max_body_bytes(self.server.max_body_bytes)
            .keep_alive(self.server.keep_alive)
            .build()
    }

    /// Telemetry settings.
    #[must_use]
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        let logging = &self.telemetry.logging;
        TelemetryConfig {
            logging: LogConfig {
                enabled: logging.enabled,
                level: logging.level.clone(),
                json_format: logging.format == LogFormat::Json,
                span_events: logging.span_events,
                file_line_info: logging.file_line_info,
                include_target: true,
            },
            metrics: MetricsConfig {
                enabled: self.telemetry.metrics.enabled,
                addr: self.telemetry.metrics.addr.clone(),
            },
        }
    }

    /// The global timeout guard, if enabled.
    ///
    /// An out-of-range status falls back to 504; [`validate`](Self::validate)
    /// rejects it before this point when the loader is used.
    #[must_use]
    pub fn timeout_guard(&self) -> Option<Timeout> {
        if !self.timeout.enabled {
            return None;
        }
        let status =
            StatusCode::from_u16(self.timeout.status).unwrap_or(StatusCode::GATEWAY_TIMEOUT);
        Some(
            Timeout::new(Duration::from_millis(self.timeout.duration_ms))
                .message(self.timeout.message.clone())
                .status(status),
        )
    }
}
