//! Typed, layered configuration for Switchyard.
//!
//! Sources are applied defaults → file → environment, and unknown fields
//! are rejected at every level.
//!
//! ```no_run
//! use switchyard_config::ConfigLoader;
//!
//! # fn main() -> Result<(), switchyard_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("switchyard.toml")?
//!     .with_env_prefix("SWITCHYARD")
//!     .load()?;
//!
//! let engine = config.to_engine_config();
//! let server = config.to_server_config();
//! # let _ = (engine, server);
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [engine]
//! mode = "release"
//! handle_method_not_allowed = true
//! max_idle_contexts = 1024
//!
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! max_body_bytes = 4194304
//! keep_alive = true
//!
//! [timeout]
//! enabled = true
//! duration_ms = 30000
//! message = "request timeout"
//! status = 504
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard-config/0.1.0")]

mod config;
mod error;
mod loader;
mod schema;

pub use config::SwitchyardConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    EngineSection, LogFormat, LoggingSection, MetricsSection, ServerSection, TelemetrySection,
    TimeoutSection,
};
