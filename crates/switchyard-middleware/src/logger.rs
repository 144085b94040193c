//! Access logging and request metrics.
//!
//! Emits one structured `tracing` event per request after the chain has
//! unwound, and records `switchyard_requests_total`,
//! `switchyard_request_duration_seconds` and the in-flight gauge.

use std::sync::Arc;
use std::time::Instant;

use switchyard_core::{BoxFuture, Context, HandlerResult, Middleware, Step};
use switchyard_telemetry::metrics::{record_request, InFlightGuard, UNMATCHED_ROUTE};
use tracing::{info, warn};

use crate::request_id::REQUEST_ID_KEY;

/// Step that logs each completed request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Middleware for Logger {
    fn name(&self) -> &'static str {
        "logger"
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let start = Instant::now();
            let _in_flight = InFlightGuard::new();
            let method = ctx.method().clone();
            let path = ctx.path().to_string();

            ctx.next().await;

            let elapsed = start.elapsed();
            let status = ctx.writer().status().as_u16();
            let route = ctx.full_path().unwrap_or(UNMATCHED_ROUTE).to_string();
            let request_id = ctx
                .get::<String>(REQUEST_ID_KEY)
                .map_or("-", String::as_str);
            let duration_ms = elapsed.as_secs_f64() * 1000.0;

            if let Some(err) = ctx.error() {
                warn!(
                    request_id,
                    http.method = %method,
                    http.path = %path,
                    http.route = %route,
                    http.status_code = status,
                    duration_ms,
                    error = %err,
                    "request completed with error"
                );
            } else {
                info!(
                    request_id,
                    http.method = %method,
                    http.path = %path,
                    http.route = %route,
                    http.status_code = status,
                    duration_ms,
                    "request completed"
                );
            }

            record_request(method.as_str(), &route, status, elapsed);
            Ok(())
        })
    }
}

/// Returns an access-logging step.
pub fn logger() -> Step {
    Arc::new(Logger)
}
