//! Lifecycle hooks.
//!
//! Hooks are synchronous callbacks registered on the engine before serving
//! starts and shared read-only by every request:
//!
//! | Hook          | Fires                                             |
//! |---------------|---------------------------------------------------|
//! | `on_request`  | before route matching                             |
//! | `on_route`    | after a match, before the chain runs              |
//! | `on_response` | after the whole chain has unwound                 |
//! | `on_error`    | only when [`Context::fire_error_hooks`] is called |
//!
//! An `on_request` or `on_route` hook that aborts the context stops the
//! remaining hooks of that list and the rest of dispatch. The `on_response`
//! and `on_error` lists always run in full.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::HandlerResult;
use crate::middleware::{BoxFuture, Middleware};

/// A lifecycle callback.
pub type HookFn = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Which hook list to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before matching.
    Request,
    /// After matching.
    Route,
    /// After the chain.
    Response,
    /// On explicit error reporting.
    Error,
}

/// Ordered hook lists for one engine.
#[derive(Clone, Default)]
pub struct Hooks {
    on_request: Vec<HookFn>,
    on_route: Vec<HookFn>,
    on_response: Vec<HookFn>,
    on_error: Vec<HookFn>,
}

impl Hooks {
    /// Creates an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an `on_request` hook.
    pub fn on_request<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.on_request.push(Arc::new(hook));
        self
    }

    /// Appends an `on_route` hook.
    pub fn on_route<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.on_route.push(Arc::new(hook));
        self
    }

    /// Appends an `on_response` hook.
    pub fn on_response<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.on_response.push(Arc::new(hook));
        self
    }

    /// Appends an `on_error` hook.
    pub fn on_error<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.on_error.push(Arc::new(hook));
        self
    }

    /// Returns the hooks registered for `point`.
    #[must_use]
    pub fn list(&self, point: HookPoint) -> &[HookFn] {
        match point {
            HookPoint::Request => &self.on_request,
            HookPoint::Route => &self.on_route,
            HookPoint::Response => &self.on_response,
            HookPoint::Error => &self.on_error,
        }
    }

    /// Returns true if at least one `on_response` hook is registered.
    #[must_use]
    pub fn has_response_hooks(&self) -> bool {
        !self.on_response.is_empty()
    }

    /// Returns true if no hooks are registered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.on_request.is_empty()
            && self.on_route.is_empty()
            && self.on_response.is_empty()
            && self.on_error.is_empty()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_request", &self.on_request.len())
            .field("on_route", &self.on_route.len())
            .field("on_response", &self.on_response.len())
            .field("on_error", &self.on_error.len())
            .finish()
    }
}

/// Outermost step that fires `on_response` hooks once the chain unwinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseHooks;

impl Middleware for ResponseHooks {
    fn name(&self) -> &'static str {
        "on_response"
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            ctx.next().await;
            ctx.fire_hooks(HookPoint::Response);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_register_in_order() {
        let mut hooks = Hooks::new();
        assert!(hooks.is_empty());

        hooks
            .on_request(|ctx| ctx.set("first", 1_u32))
            .on_request(|ctx| ctx.set("second", 2_u32))
            .on_error(|_| {});

        assert_eq!(hooks.list(HookPoint::Request).len(), 2);
        assert_eq!(hooks.list(HookPoint::Error).len(), 1);
        assert!(!hooks.has_response_hooks());
        assert!(!hooks.is_empty());
    }

    #[test]
    fn test_debug_shows_counts() {
        let mut hooks = Hooks::new();
        hooks.on_route(|_| {});
        let debug = format!("{hooks:?}");
        assert!(debug.contains("on_route: 1"));
    }
}
