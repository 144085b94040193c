//! Core step trait and types.
//!
//! Every element of a dispatch chain (global middleware, group middleware,
//! route middleware and the terminal handler) implements [`Middleware`].
//! A step that wants the rest of the chain to run awaits
//! [`Context::next`]; code after that await is the step's "after" half.
//!
//! # Example
//!
//! ```
//! use switchyard_core::{from_fn, Context};
//!
//! let timing = from_fn(|ctx: &mut Context| {
//!     Box::pin(async move {
//!         let start = std::time::Instant::now();
//!         ctx.next().await;
//!         tracing::debug!(elapsed = ?start.elapsed(), "chain finished");
//!         Ok(())
//!     })
//! });
//! assert_eq!(timing.name(), "fn");
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::HandlerResult;

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared, type-erased step.
pub type Step = Arc<dyn Middleware>;

/// A request-processing step.
///
/// Returning `Err` records the error on the context and aborts the chain
/// without writing a response; the error handler step or the engine
/// renders it afterwards.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this step, used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Processes the request.
    fn handle<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult>;
}

/// A step created from a closure.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based step.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self.func)(ctx)
    }
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Wraps a closure as a [`Step`].
pub fn from_fn<F>(func: F) -> Step
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(FnMiddleware::new("fn", func))
}

/// Wraps a closure as a named [`Step`].
pub fn named_fn<F>(name: &'static str, func: F) -> Step
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(FnMiddleware::new(name, func))
}
