//! Core types for the Switchyard dispatch core.
//!
//! This crate defines the pieces every other Switchyard crate builds on:
//!
//! - [`Context`]: per-request state and the index-based continuation chain
//! - [`Middleware`] / [`Step`]: the unit of work in a chain
//! - [`Hooks`]: lifecycle callbacks (`on_request`, `on_route`, `on_response`, `on_error`)
//! - [`ResponseWriter`]: the buffered response sink
//! - [`DispatchError`] / [`ErrorResponse`]: errors and their JSON envelope
//! - [`Mode`]: debug, release or test
//!
//! # Chain semantics
//!
//! A chain is a flat list of steps plus a cursor. [`Context::next`] runs
//! steps from the cursor until the list is exhausted or the context is
//! aborted. Steps that await `next()` get "before" and "after" halves:
//!
//! ```text
//!   logger ─┐                            ┌─ logger (after)
//!           auth ─┐                ┌─ auth (after)
//!                 handler ─────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use http::StatusCode;
//! use switchyard_core::{from_fn, Context};
//!
//! # tokio_test::block_on(async {
//! let mut ctx = Context::default();
//! ctx.push_steps(vec![
//!     from_fn(|ctx| Box::pin(async move {
//!         ctx.header("x-powered-by", "switchyard");
//!         ctx.next().await;
//!         Ok(())
//!     })),
//!     from_fn(|ctx| Box::pin(async move {
//!         ctx.string(StatusCode::OK, "hello");
//!         Ok(())
//!     })),
//! ]);
//! ctx.next().await;
//!
//! assert_eq!(ctx.writer().body(), b"hello");
//! assert_eq!(ctx.writer().headers()["x-powered-by"], "switchyard");
//! # });
//! ```

pub mod context;
pub mod error;
pub mod hooks;
pub mod middleware;
pub mod mode;
pub mod types;
pub mod writer;

pub use context::{Context, Keys, ABORT_INDEX};
pub use error::{DispatchError, ErrorResponse, FieldError, HandlerResult, INTERNAL_MESSAGE};
pub use hooks::{HookFn, HookPoint, Hooks, ResponseHooks};
pub use middleware::{from_fn, named_fn, BoxFuture, FnMiddleware, Middleware, Step};
pub use mode::{Mode, ParseModeError};
pub use types::{clone_request, Request, Response};
pub use writer::ResponseWriter;

/// Re-export of the router's parameter type.
pub use switchyard_router::Params;
