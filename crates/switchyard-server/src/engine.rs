//! The dispatch engine.
//!
//! An [`Engine`] owns the route table, the global steps, the lifecycle
//! hooks and the context pool. Registration happens through `&mut self`
//! before serving; [`Engine::serve_request`] only needs `&self`, so a
//! finished engine is shared behind an `Arc`.
//!
//! # Dispatch
//!
//! For every request the engine:
//!
//! 1. Takes a context from the pool and installs the request.
//! 2. Fires `on_request` hooks. An abort ends dispatch here.
//! 3. Looks the route up. On a miss the global steps, followed by the
//!    steps of the innermost group whose prefix covers the path, run with
//!    a preset 404 (or 405) status and a plain-text body is written if
//!    nobody answered.
//! 4. On a hit, records the parameters and the matched pattern, then fires
//!    `on_route` hooks. An abort ends dispatch here.
//! 5. Runs `[on_response wrapper] + global steps + group steps + route
//!    steps`, where group steps are those of the route's group and its
//!    ancestors, outermost first.
//! 6. Writes the error envelope if the chain left an error and no
//!    response.
//! 7. Converts the sink into a response and returns the context to the pool.
//!
//! # Example
//!
//! ```
//! use http::{Method, StatusCode};
//! use switchyard_core::from_fn;
//! use switchyard_server::{Engine, EngineConfig, Routes};
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! engine
//!     .get(
//!         "/users/:id",
//!         vec![from_fn(|ctx| {
//!             Box::pin(async move {
//!                 let id = ctx.param("id").unwrap_or_default().to_string();
//!                 ctx.string(StatusCode::OK, id);
//!                 Ok(())
//!             })
//!         })],
//!     )
//!     .unwrap();
//!
//! assert_eq!(engine.routes().count(), 1);
//! ```

use std::sync::Arc;

use http::{Method, StatusCode};
use switchyard_core::{Context, HookPoint, Hooks, Mode, Request, Response, ResponseHooks, Step};
use switchyard_middleware::{logger, recovery};
use switchyard_router::{RouteError, Router};
use tracing::debug;

use crate::group::{GroupTable, RouterGroup, Routes};
use crate::pool::{ContextPool, DEFAULT_MAX_IDLE};

/// Body written for unmatched routes.
pub const NOT_FOUND_BODY: &str = "404 page not found";

/// Body written when the path exists under other methods.
pub const METHOD_NOT_ALLOWED_BODY: &str = "405 method not allowed";

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Run mode threaded into every context.
    pub mode: Mode,
    /// Answer 405 with an `Allow` header when the path is registered under
    /// other methods.
    pub handle_method_not_allowed: bool,
    /// Idle contexts kept in the pool.
    pub max_idle_contexts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Debug,
            handle_method_not_allowed: false,
            max_idle_contexts: DEFAULT_MAX_IDLE,
        }
    }
}

impl EngineConfig {
    /// Returns a copy with `mode` set.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns a copy with 405 handling switched on or off.
    #[must_use]
    pub fn with_method_not_allowed(mut self, enabled: bool) -> Self {
        self.handle_method_not_allowed = enabled;
        self
    }
}

/// Steps registered for one method and pattern, plus the group they were
/// registered through.
pub(crate) struct RouteEntry {
    pub(crate) group: Option<usize>,
    pub(crate) steps: Vec<Step>,
}

/// Route table, global steps, groups, hooks and context pool.
pub struct Engine {
    config: EngineConfig,
    router: Router<RouteEntry>,
    global: Vec<Step>,
    groups: GroupTable,
    hooks: Arc<Hooks>,
    pool: ContextPool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("routes", &self.router.len())
            .field("global", &self.global.len())
            .field("groups", &self.groups.len())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Creates an engine with no steps, hooks or routes.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let hooks = Arc::new(Hooks::new());
        let pool =
            ContextPool::with_max_idle(config.mode, Arc::clone(&hooks), config.max_idle_contexts);
        Self {
            config,
            router: Router::new(),
            global: Vec::new(),
            groups: GroupTable::default(),
            hooks,
            pool,
        }
    }

    /// Creates an engine with [`recovery`] and [`logger`] installed as
    /// global steps.
    #[must_use]
    pub fn with_defaults(config: EngineConfig) -> Self {
        let mut engine = Self::new(config);
        engine.use_middleware(recovery()).use_middleware(logger());
        engine
    }

    /// Returns the engine settings.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the run mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Appends a global step. Global steps run before group and route
    /// steps on every request, matched or not.
    pub fn use_middleware(&mut self, step: Step) -> &mut Self {
        self.global.push(step);
        self
    }

    /// Returns the global steps.
    #[must_use]
    pub fn global_steps(&self) -> &[Step] {
        &self.global
    }

    /// Opens a route group under `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        RouterGroup::new(self, prefix)
    }

    /// Number of groups opened so far, nested ones included.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub(crate) fn groups(&self) -> &GroupTable {
        &self.groups
    }

    pub(crate) fn groups_mut(&mut self) -> &mut GroupTable {
        &mut self.groups
    }

    /// Appends an `on_request` hook.
    pub fn on_request<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.update_hooks(|hooks| {
            hooks.on_request(hook);
        })
    }

    /// Appends an `on_route` hook.
    pub fn on_route<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.update_hooks(|hooks| {
            hooks.on_route(hook);
        })
    }

    /// Appends an `on_response` hook.
    pub fn on_response<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.update_hooks(|hooks| {
            hooks.on_response(hook);
        })
    }

    /// Appends an `on_error` hook.
    pub fn on_error<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.update_hooks(|hooks| {
            hooks.on_error(hook);
        })
    }

    /// Returns the registered hooks.
    #[must_use]
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    // Pooled contexts hold the previous hook set, so the pool is rebuilt.
    fn update_hooks(&mut self, update: impl FnOnce(&mut Hooks)) -> &mut Self {
        update(Arc::make_mut(&mut self.hooks));
        self.pool = ContextPool::with_max_idle(
            self.config.mode,
            Arc::clone(&self.hooks),
            self.config.max_idle_contexts,
        );
        self
    }

    pub(crate) fn add_route(
        &mut self,
        method: Method,
        pattern: &str,
        group: Option<usize>,
        steps: Vec<Step>,
    ) -> Result<(), RouteError> {
        let count = steps.len();
        self.router
            .insert(method.clone(), pattern, RouteEntry { group, steps })?;
        if self.config.mode.is_debug() {
            debug!(method = %method, pattern, steps = count, "route registered");
        }
        Ok(())
    }

    /// Lists registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.router.routes()
    }

    /// Returns the context pool.
    #[must_use]
    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// Dispatches one request and returns its response.
    pub async fn serve_request(&self, request: Request) -> Response {
        let mut ctx = self.pool.acquire();
        ctx.set_request(request);

        self.dispatch(&mut ctx).await;

        let response = ctx.take_response();
        self.pool.release(ctx);
        response
    }

    async fn dispatch(&self, ctx: &mut Context) {
        ctx.fire_hooks(HookPoint::Request);
        if ctx.is_aborted() {
            debug!(path = ctx.path(), "request aborted by on_request hook");
            return self.write_pending_error(ctx);
        }

        let method = ctx.method().clone();
        let path = ctx.path().to_string();

        let Some(found) = self.router.find(&method, &path) else {
            self.handle_miss(ctx, &method, &path).await;
            return self.write_pending_error(ctx);
        };

        ctx.set_params(found.params);
        ctx.set_full_path(found.pattern);

        ctx.fire_hooks(HookPoint::Route);
        if ctx.is_aborted() {
            debug!(route = found.pattern, "request aborted by on_route hook");
            return self.write_pending_error(ctx);
        }

        self.install_chain(ctx, found.value.group, &found.value.steps);
        ctx.next().await;
        self.write_pending_error(ctx);
    }

    fn install_chain(&self, ctx: &mut Context, group: Option<usize>, route_steps: &[Step]) {
        if self.hooks.has_response_hooks() {
            ctx.push_steps([Arc::new(ResponseHooks) as Step]);
        }
        ctx.push_steps(self.global.iter().cloned());
        if let Some(group) = group {
            ctx.push_steps(self.groups.steps(group));
        }
        ctx.push_steps(route_steps.iter().cloned());
    }

    async fn handle_miss(&self, ctx: &mut Context, method: &Method, path: &str) {
        let allowed = if self.config.handle_method_not_allowed {
            self.router
                .allowed_methods(path)
                .into_iter()
                .filter(|m| m != method)
                .collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        let (status, body) = if allowed.is_empty() {
            (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
        } else {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            ctx.header(http::header::ALLOW.as_str(), &allow);
            (StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_BODY)
        };

        debug!(method = %method, path, status = status.as_u16(), "no route matched");

        ctx.status(status);
        self.install_chain(ctx, self.groups.innermost_for_path(path), &[]);
        ctx.next().await;

        if !ctx.is_written() && ctx.error().is_none() {
            ctx.string(status, body);
        }
    }

    // Every request yields a response: an error left on the context with
    // nothing written is rendered here.
    fn write_pending_error(&self, ctx: &mut Context) {
        if ctx.is_written() {
            return;
        }
        if let Some(err) = ctx.take_error() {
            ctx.write_error(&err);
            ctx.set_error(err);
        }
    }
}

impl Routes for Engine {
    fn handle(&mut self, method: Method, pattern: &str, steps: Vec<Step>) -> Result<(), RouteError> {
        self.add_route(method, pattern, None, steps)
    }
}
