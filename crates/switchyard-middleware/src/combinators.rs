//! Conditional middleware combinators.
//!
//! Predicates are evaluated against the live [`Context`] on every request;
//! nothing is memoized.
//!
//! ```
//! use http::Method;
//! use switchyard_middleware::combinators::{and, method_is, not, path_prefix, when};
//! use switchyard_middleware::request_id;
//!
//! // Tag every non-GET request under /api with a request id.
//! let step = when(
//!     and(vec![path_prefix("/api"), not(method_is(Method::GET))]),
//!     request_id(),
//! );
//! # let _ = step;
//! ```

use std::sync::Arc;

use http::Method;
use switchyard_core::{BoxFuture, Context, HandlerResult, Middleware, Step};

/// A per-request condition.
pub type Predicate = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Wraps a closure as a [`Predicate`].
pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&Context) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Runs `step` only when `pred` holds; otherwise continues the chain.
struct Conditional {
    pred: Predicate,
    step: Step,
    run_when: bool,
}

impl Middleware for Conditional {
    fn name(&self) -> &'static str {
        if self.run_when {
            "when"
        } else {
            "unless"
        }
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            if (self.pred)(&*ctx) == self.run_when {
                self.step.handle(ctx).await
            } else {
                ctx.next().await;
                Ok(())
            }
        })
    }
}

/// Runs `step` when `pred` holds, otherwise passes through.
#[doc(alias = "if")]
pub fn when(pred: Predicate, step: Step) -> Step {
    Arc::new(Conditional {
        pred,
        step,
        run_when: true,
    })
}

/// Runs `step` when `pred` does not hold, otherwise passes through.
pub fn unless(pred: Predicate, step: Step) -> Step {
    Arc::new(Conditional {
        pred,
        step,
        run_when: false,
    })
}

/// Skips `step` for requests matching `pred`. Same as [`unless`].
pub fn skip(pred: Predicate, step: Step) -> Step {
    unless(pred, step)
}

/// Runs `step` only for requests matching `pred`. Same as [`when`].
pub fn only(pred: Predicate, step: Step) -> Step {
    when(pred, step)
}

/// True when every predicate holds. Empty input is true.
pub fn and(preds: Vec<Predicate>) -> Predicate {
    Arc::new(move |ctx: &Context| preds.iter().all(|p| p(ctx)))
}

/// True when any predicate holds. Empty input is false.
pub fn or(preds: Vec<Predicate>) -> Predicate {
    Arc::new(move |ctx: &Context| preds.iter().any(|p| p(ctx)))
}

/// Negates a predicate.
pub fn not(pred: Predicate) -> Predicate {
    Arc::new(move |ctx: &Context| !pred(ctx))
}

/// Splices several steps into the chain at the current position.
struct Combined {
    steps: Vec<Step>,
}

impl Middleware for Combined {
    fn name(&self) -> &'static str {
        "combine"
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            ctx.insert_and_continue(self.steps.clone()).await;
            Ok(())
        })
    }
}

/// Combines steps into one.
///
/// When invoked, the steps are spliced right after the combined step and
/// the chain continues through them and then through the original
/// remainder.
pub fn combine(steps: Vec<Step>) -> Step {
    Arc::new(Combined { steps })
}

// ============================================================================
// Predicate helpers
// ============================================================================

/// Matches requests whose path starts with `prefix`.
pub fn path_prefix(prefix: impl Into<String>) -> Predicate {
    let prefix = prefix.into();
    Arc::new(move |ctx: &Context| ctx.path().starts_with(prefix.as_str()))
}

/// Matches requests with the given method.
pub fn method_is(method: Method) -> Predicate {
    Arc::new(move |ctx: &Context| *ctx.method() == method)
}

/// Matches requests carrying header `name`.
pub fn header_present(name: &'static str) -> Predicate {
    Arc::new(move |ctx: &Context| ctx.request().headers().contains_key(name))
}
