//! # Switchyard Server
//!
//! The dispatch engine and its HTTP host adapter.
//!
//! - [`Engine`]: route table, global steps, lifecycle hooks and a pool of
//!   reusable contexts; [`Engine::serve_request`] turns one request into
//!   one response
//! - [`RouterGroup`] and [`Routes`]: prefix groups with their own steps
//! - [`Server`]: hyper HTTP/1.1 accept loop with graceful shutdown
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use http::{Method, StatusCode};
//! use switchyard_core::from_fn;
//! use switchyard_server::{Engine, EngineConfig, Routes};
//!
//! # tokio_test::block_on(async {
//! let mut engine = Engine::new(EngineConfig::default());
//! engine
//!     .get("/hello/:name", vec![from_fn(|ctx| Box::pin(async move {
//!         let name = ctx.param("name").unwrap_or("world").to_string();
//!         ctx.string(StatusCode::OK, format!("hello {name}"));
//!         Ok(())
//!     }))])
//!     .unwrap();
//!
//! let request = http::Request::builder()
//!     .method(Method::GET)
//!     .uri("/hello/ada")
//!     .body(Bytes::new())
//!     .unwrap();
//! let response = engine.serve_request(request).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard-server/0.1.0")]

pub mod config;
pub mod engine;
pub mod error;
pub mod group;
pub mod pool;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use engine::{Engine, EngineConfig, METHOD_NOT_ALLOWED_BODY, NOT_FOUND_BODY};
pub use error::ServerError;
pub use group::{RouterGroup, Routes, ANY_METHODS};
pub use pool::ContextPool;
pub use server::Server;
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
