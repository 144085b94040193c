//! Deadline guard for the rest of a chain.
//!
//! [`Timeout`] moves the remaining chain into an owned [`Context`] with a
//! fresh response buffer, spawns it on the tokio runtime and races it
//! against a timer. A shared race state decides which side owns the real
//! response sink:
//!
//! - **Completion first**: the buffered status, headers and body are copied
//!   onto the real sink and the context state (keys, error, cursor, abort
//!   flag) is restored.
//! - **Deadline first**: a JSON timeout body is written with the configured
//!   status and the context is aborted. Whatever the detached chain
//!   produces later is dropped.
//!
//! A panic in the detached chain before the deadline is re-raised in the
//! guard so an outer [`recovery`](crate::recovery()) step can answer it.
//! After the deadline it is logged and dropped.
//!
//! Keys live with the detached chain while it runs. After a deadline they
//! are not restored.

use std::any::Any;
use std::fmt::Write as _;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use http::StatusCode;
use parking_lot::Mutex;
use serde_json::json;
use switchyard_core::{BoxFuture, Context, DispatchError, HandlerResult, Middleware};
use switchyard_telemetry::metrics::{record_timeout, UNMATCHED_ROUTE};
use tokio::task::JoinError;
use tracing::{debug, error, warn};

use crate::recovery::panic_message;

/// Default timeout response message.
pub const DEFAULT_MESSAGE: &str = "request timeout";

/// Default timeout response status.
pub const DEFAULT_STATUS: StatusCode = StatusCode::GATEWAY_TIMEOUT;

/// Which side of the race owns the real response sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Race {
    Pending,
    Finished,
    TimedOut,
}

type PanicPayload = Box<dyn Any + Send + 'static>;

/// What the detached task hands back to the guard.
enum Outcome {
    Completed(Context),
    Panicked(PanicPayload),
    Abandoned,
}

/// Runs the rest of the chain under a deadline.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use http::StatusCode;
/// use switchyard_middleware::Timeout;
///
/// let guard = Timeout::new(Duration::from_secs(2))
///     .message("upstream too slow")
///     .status(StatusCode::SERVICE_UNAVAILABLE);
/// assert_eq!(guard.duration(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct Timeout {
    duration: Duration,
    message: String,
    status: StatusCode,
}

impl Timeout {
    /// Creates a guard with the default message and status 504.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            message: DEFAULT_MESSAGE.to_string(),
            status: DEFAULT_STATUS,
        }
    }

    /// Sets the message written on timeout.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the status written on timeout.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns the deadline.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    fn settle(
        &self,
        ctx: &mut Context,
        joined: Result<Outcome, JoinError>,
    ) -> HandlerResult {
        match joined {
            Ok(Outcome::Completed(detached)) => {
                ctx.reattach(detached);
                Ok(())
            }
            Ok(Outcome::Panicked(payload)) => std::panic::resume_unwind(payload),
            Ok(Outcome::Abandoned) => Ok(()),
            Err(err) => {
                error!(error = %err, path = ctx.path(), "guarded chain task failed");
                ctx.abort();
                Err(DispatchError::internal_with_source(
                    "guarded chain task failed",
                    err,
                ))
            }
        }
    }

    fn write_timeout(&self, ctx: &mut Context) {
        let route = ctx.full_path().unwrap_or(UNMATCHED_ROUTE).to_string();
        warn!(
            path = ctx.path(),
            route = %route,
            timeout = %format_duration(self.duration),
            "request timed out"
        );
        record_timeout(&route);

        let body = json!({
            "error": self.message,
            "timeout": format_duration(self.duration),
        });
        ctx.json(self.status, &body);
        ctx.abort();
    }
}

/// Claims the sink for one side of the race. Returns false if the other
/// side already holds it.
fn claim(state: &Mutex<Race>, winner: Race) -> bool {
    let mut race = state.lock();
    if *race == Race::Pending {
        *race = winner;
        true
    } else {
        false
    }
}

impl Middleware for Timeout {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let mut detached = ctx.detach();
            let state = Arc::new(Mutex::new(Race::Pending));
            let task_state = Arc::clone(&state);
            let path = ctx.path().to_string();

            let mut handle = tokio::spawn(async move {
                let result = AssertUnwindSafe(detached.next()).catch_unwind().await;

                if claim(&task_state, Race::Finished) {
                    return match result {
                        Ok(()) => Outcome::Completed(detached),
                        Err(payload) => Outcome::Panicked(payload),
                    };
                }

                if let Err(payload) = result {
                    error!(
                        path = %path,
                        panic = %panic_message(payload.as_ref()),
                        "guarded chain panicked after its deadline"
                    );
                } else {
                    debug!(path = %path, "discarding output of timed-out chain");
                }
                Outcome::Abandoned
            });

            tokio::select! {
                biased;
                joined = &mut handle => self.settle(ctx, joined),
                () = tokio::time::sleep(self.duration) => {
                    if claim(&state, Race::TimedOut) {
                        self.write_timeout(ctx);
                        Ok(())
                    } else {
                        // The chain finished between the timer firing and the claim.
                        let joined = handle.await;
                        self.settle(ctx, joined)
                    }
                }
            }
        })
    }
}

/// Formats a duration the way Go's `time.Duration` prints
/// (`2s`, `500ms`, `1.5s`, `1m30s`, `1h0m0s`).
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos / 1_000, nanos % 1_000, 3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos / 1_000_000, nanos % 1_000_000, 6));
    }

    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = decimal(
        u128::from(total % 60),
        u128::from(duration.subsec_nanos()),
        9,
    );

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h{minutes}m");
    } else if minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{seconds}s");
    out
}

/// Renders `whole.fraction` with trailing zeros removed.
fn decimal(whole: u128, fraction: u128, width: usize) -> String {
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
