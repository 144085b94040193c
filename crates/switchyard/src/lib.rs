//! # Switchyard
//!
//! A request-dispatch core for HTTP services.
//!
//! - a per-method path trie with `:name` and `*name` segments
//! - pooled request contexts driving an index-based middleware chain
//! - lifecycle hooks at request, route, response and error points
//! - conditional combinators and a timeout guard
//! - a hyper host adapter with graceful shutdown
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use switchyard::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("switchyard.toml")?
//!         .with_env_prefix("SWITCHYARD")
//!         .load()?;
//!     switchyard::init_telemetry(&config)?;
//!
//!     let mut engine = switchyard::engine_from_config(&config);
//!     engine.get("/hello/:name", vec![from_fn(|ctx| Box::pin(async move {
//!         let name = ctx.param("name").unwrap_or("world").to_string();
//!         ctx.string(StatusCode::OK, format!("hello {name}"));
//!         Ok(())
//!     }))])?;
//!
//!     Server::new(engine, config.to_server_config()).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! acquire Context → on_request → route lookup → on_route
//!     → [on_response] + global steps + group steps + route steps
//!     → response written → Context released
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard/0.1.0")]

use std::sync::Arc;

pub use switchyard_config as config;
pub use switchyard_core as core;
pub use switchyard_middleware as middleware;
pub use switchyard_router as router;
pub use switchyard_server as server;
pub use switchyard_telemetry as telemetry;

use switchyard_config::SwitchyardConfig;
use switchyard_server::Engine;
use switchyard_telemetry::TelemetryResult;

/// Builds an engine with recovery and access logging installed, plus the
/// global timeout guard when the configuration enables one.
#[must_use]
pub fn engine_from_config(config: &SwitchyardConfig) -> Engine {
    let mut engine = Engine::with_defaults(config.to_engine_config());
    if let Some(guard) = config.timeout_guard() {
        engine.use_middleware(Arc::new(guard));
    }
    engine
}

/// Installs logging and metrics from the configuration.
///
/// # Errors
///
/// Returns `TelemetryError` if a subscriber or recorder is already installed
/// or an address or filter is invalid.
pub fn init_telemetry(config: &SwitchyardConfig) -> TelemetryResult<()> {
    switchyard_telemetry::init_telemetry(&config.to_telemetry_config())
}

/// Common imports.
///
/// ```rust
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    pub use http::{Method, StatusCode};

    pub use switchyard_config::{ConfigLoader, SwitchyardConfig};
    pub use switchyard_core::{
        from_fn, named_fn, Context, DispatchError, FieldError, HandlerResult, HookPoint,
        Middleware, Mode, Params, Request, Response, Step,
    };
    pub use switchyard_middleware::{
        and, combine, error_handler, header_present, logger, method_is, not, only, or,
        path_prefix, predicate, recovery, request_id, skip, unless, when, Predicate, Timeout,
    };
    pub use switchyard_server::{
        Engine, EngineConfig, RouterGroup, Routes, Server, ServerConfig, ShutdownSignal,
    };
}
