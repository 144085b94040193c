//! Panic recovery.
//!
//! Catches panics raised anywhere in the rest of the chain, logs them,
//! counts them and answers with a 500 error envelope unless a response was
//! already written. The panic text and a `stack` field reach the client
//! only in debug mode.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use switchyard_core::{BoxFuture, Context, DispatchError, HandlerResult, Middleware, Step};
use switchyard_telemetry::metrics::{record_panic, UNMATCHED_ROUTE};
use tracing::error;

/// Step that converts panics into 500 responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recovery;

impl Middleware for Recovery {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let outcome = AssertUnwindSafe(ctx.next()).catch_unwind().await;
            let Err(payload) = outcome else {
                return Ok(());
            };

            let message = panic_message(payload.as_ref());
            let route = ctx.full_path().unwrap_or(UNMATCHED_ROUTE).to_string();
            error!(
                panic = %message,
                http.method = %ctx.method(),
                http.path = ctx.path(),
                http.route = %route,
                "recovered from panic"
            );
            record_panic(&route);

            let stack = ctx
                .mode()
                .is_debug()
                .then(|| Backtrace::force_capture().to_string());
            let err = DispatchError::panic(message, stack);

            if ctx.is_written() {
                ctx.set_error(err);
                ctx.abort();
            } else {
                ctx.abort_with_error(err);
            }
            Ok(())
        })
    }
}

/// Returns a step that recovers from panics.
pub fn recovery() -> Step {
    Arc::new(Recovery)
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
