//! Route registration and groups.
//!
//! [`Routes`] is implemented by both [`Engine`](crate::Engine) and
//! [`RouterGroup`]. A group carries a path prefix and its own steps. The
//! prefix is joined into each route pattern at registration; the steps
//! stay with the group and are collected from the route's group and its
//! ancestors when a request is dispatched.
//!
//! ```
//! use http::StatusCode;
//! use switchyard_core::from_fn;
//! use switchyard_server::{Engine, Routes};
//!
//! let mut engine = Engine::default();
//! let mut api = engine.group("/api");
//! api.use_middleware(from_fn(|ctx| Box::pin(async move {
//!     ctx.header("x-api", "1");
//!     ctx.next().await;
//!     Ok(())
//! })));
//!
//! let mut v1 = api.group("/v1");
//! v1.get("/health", vec![from_fn(|ctx| Box::pin(async move {
//!     ctx.string(StatusCode::OK, "ok");
//!     Ok(())
//! }))])
//! .unwrap();
//!
//! let routes: Vec<_> = engine.routes().map(|(_, p)| p.to_string()).collect();
//! assert_eq!(routes, vec!["/api/v1/health"]);
//! ```

use http::Method;
use switchyard_core::Step;
use switchyard_router::RouteError;

use crate::engine::Engine;

/// Methods registered by [`Routes::any`].
pub const ANY_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::DELETE,
    Method::CONNECT,
    Method::TRACE,
];

/// Route registration surface.
pub trait Routes {
    /// Registers `steps` for `method` and `pattern`.
    fn handle(&mut self, method: Method, pattern: &str, steps: Vec<Step>)
        -> Result<(), RouteError>;

    /// Registers a `GET` route.
    fn get(&mut self, pattern: &str, steps: Vec<Step>) -> Result<(), RouteError> {
        self.handle(Method::GET, pattern, steps)
    }

    /// Registers a `POST` route.
    fn post(&mut self, pattern: &str, steps: Vec<Step>) -> Result<(), RouteError> {
        self.handle(Method::POST, pattern, steps)
    }

    /// Registers a `PUT` route.
    fn put(&mut self, pattern: &str, steps: Vec<Step>) -> Result<(), RouteError> {
        self.handle(Method::PUT, pattern, steps)
    }

    /// Registers a `DELETE` route.
    fn delete(&mut self, pattern: &str, steps: Vec<Step>) -> Result<(), RouteError> {
        self.handle(Method::DELETE, pattern, steps)
    }

    /// Registers a `PATCH` route.
    fn patch(&mut self, pattern: &str, steps: Vec<Step>) -> Result<(), RouteError> {
        self.handle(Method::PATCH, pattern, steps)
    }

    /// Registers a `HEAD` route.
    fn head(&mut self, pattern: &str, steps: Vec<Step>) -> Result<(), RouteError> {
        self.handle(Method::HEAD, pattern, steps)
    }

    /// Registers an `OPTIONS` route.
    fn options(&mut self, pattern: &str, steps: Vec<Step>) -> Result<(), RouteError> {
        self.handle(Method::OPTIONS, pattern, steps)
    }

    /// Registers the same steps under every method in [`ANY_METHODS`].
    fn any(&mut self, pattern: &str, steps: Vec<Step>) -> Result<(), RouteError> {
        for method in ANY_METHODS {
            self.handle(method, pattern, steps.clone())?;
        }
        Ok(())
    }
}

/// A registered group: its absolute prefix, the group it was opened from
/// and the steps added through it.
struct GroupEntry {
    prefix: String,
    parent: Option<usize>,
    steps: Vec<Step>,
}

/// Every group opened on an engine, addressed by id.
///
/// Group steps are looked up at dispatch time, so a step added to a group
/// applies to all of its routes regardless of registration order.
#[derive(Default)]
pub(crate) struct GroupTable {
    entries: Vec<GroupEntry>,
}

impl GroupTable {
    /// Registers a group and returns its id.
    pub(crate) fn open(&mut self, parent: Option<usize>, prefix: String) -> usize {
        self.entries.push(GroupEntry {
            prefix,
            parent,
            steps: Vec::new(),
        });
        self.entries.len() - 1
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn prefix(&self, id: usize) -> &str {
        &self.entries[id].prefix
    }

    fn push_step(&mut self, id: usize, step: Step) {
        self.entries[id].steps.push(step);
    }

    /// Steps of `id` and its ancestors, outermost group first.
    pub(crate) fn steps(&self, id: usize) -> Vec<Step> {
        let mut lineage = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            lineage.push(id);
            current = self.entries[id].parent;
        }
        lineage
            .into_iter()
            .rev()
            .flat_map(|id| self.entries[id].steps.iter().cloned())
            .collect()
    }

    /// The most specific group whose prefix covers `path`.
    ///
    /// Prefixes are compared segment by segment; `:name` matches any one
    /// segment and `*name` the rest. Among equally long prefixes the group
    /// opened first wins.
    pub(crate) fn innermost_for_path(&self, path: &str) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (id, entry) in self.entries.iter().enumerate() {
            let Some(depth) = covers(&entry.prefix, path) else {
                continue;
            };
            if best.map_or(true, |(_, deepest)| depth > deepest) {
                best = Some((id, depth));
            }
        }
        best.map(|(id, _)| id)
    }
}

/// Number of prefix segments when `prefix` covers `path`.
fn covers(prefix: &str, path: &str) -> Option<usize> {
    let mut request = path.split('/').filter(|s| !s.is_empty());
    let mut depth = 0;
    for part in prefix.split('/').filter(|s| !s.is_empty()) {
        if part.starts_with('*') {
            return Some(depth + 1);
        }
        match request.next() {
            Some(segment) if part.starts_with(':') || segment == part => depth += 1,
            _ => return None,
        }
    }
    Some(depth)
}

/// Registration handle for a path prefix plus steps shared by the routes
/// registered through it and its subgroups.
pub struct RouterGroup<'e> {
    engine: &'e mut Engine,
    id: usize,
}

impl std::fmt::Debug for RouterGroup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterGroup")
            .field("id", &self.id)
            .field("prefix", &self.prefix())
            .finish_non_exhaustive()
    }
}

impl<'e> RouterGroup<'e> {
    pub(crate) fn new(engine: &'e mut Engine, prefix: &str) -> Self {
        let id = engine.groups_mut().open(None, join_paths("", prefix));
        Self { engine, id }
    }

    /// Returns the group's absolute prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.engine.groups().prefix(self.id)
    }

    /// Appends a step that runs before the route steps of every route in
    /// this group or its subgroups, including routes registered earlier.
    /// Unmatched requests under the prefix run it as well.
    pub fn use_middleware(&mut self, step: Step) -> &mut Self {
        self.engine.groups_mut().push_step(self.id, step);
        self
    }

    /// Opens a nested group. It inherits this group's prefix and steps.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let joined = join_paths(self.prefix(), prefix);
        let id = self.engine.groups_mut().open(Some(self.id), joined);
        RouterGroup {
            engine: &mut *self.engine,
            id,
        }
    }
}

impl Routes for RouterGroup<'_> {
    fn handle(&mut self, method: Method, pattern: &str, steps: Vec<Step>) -> Result<(), RouteError> {
        let full = join_paths(self.prefix(), pattern);
        self.engine.add_route(method, &full, Some(self.id), steps)
    }
}

/// Joins a group prefix and a relative path with exactly one `/` between
/// them. A trailing slash on `relative` is kept.
fn join_paths(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return if base.is_empty() {
            "/".to_string()
        } else {
            base.to_string()
        };
    }
    format!("{base}/{relative}")
}
