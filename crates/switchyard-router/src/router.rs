//! Method-aware router built on per-method segment tries.
//!
//! This module provides the main [`Router`] struct which is the primary
//! interface for registering and matching routes.

use std::collections::HashMap;

use http::Method;

use crate::error::RouteError;
use crate::node::{split_path, Node};
use crate::params::Params;

/// The result of a successful route lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the matched route.
    pub value: &'a T,

    /// The matched route pattern (e.g. `/users/:id`).
    pub pattern: &'a str,

    /// Extracted path parameters.
    pub params: Params,
}

/// One trie plus its registered values for a single HTTP method.
#[derive(Debug, Clone)]
struct MethodTree<T> {
    root: Node,
    values: HashMap<String, T>,
}

impl<T> MethodTree<T> {
    fn new() -> Self {
        Self {
            root: Node::root(),
            values: HashMap::new(),
        }
    }
}

/// A router mapping `(method, pattern)` pairs to values of type `T`.
///
/// Each method has its own trie, so `GET /users/:id` and
/// `DELETE /users/:uid` never interact.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use switchyard_router::Router;
///
/// let mut router = Router::new();
/// router.insert(Method::GET, "/users/:id", "getUser").unwrap();
/// router.insert(Method::GET, "/static/*filepath", "assets").unwrap();
///
/// let found = router.find(&Method::GET, "/users/42").unwrap();
/// assert_eq!(*found.value, "getUser");
/// assert_eq!(found.params.get("id"), Some("42"));
///
/// let found = router.find(&Method::GET, "/static/css/site.css").unwrap();
/// assert_eq!(found.params.get("filepath"), Some("css/site.css"));
/// ```
///
/// # Route Priority
///
/// When multiple routes could match, segments are tried in this order at
/// every depth:
///
/// 1. **Literal segments** (e.g., `/users/me`)
/// 2. **Parameter segments** (e.g., `/users/:id`)
/// 3. **Wildcard segments** (e.g., `/files/*path`)
#[derive(Debug, Clone)]
pub struct Router<T> {
    trees: Vec<(Method, MethodTree<T>)>,
    routes: Vec<(Method, String)>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Registers `value` under `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed patterns, conflicting
    /// wildcards, or a method and pattern pair that is already registered.
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) -> Result<(), RouteError> {
        let segments = Node::parse_pattern(pattern)?;
        let canonical = canonical_pattern(&segments);

        let tree = self.tree_mut(&method);
        if tree.values.contains_key(&canonical) {
            return Err(RouteError::Duplicate {
                method: method.to_string(),
                pattern: canonical,
            });
        }

        tree.root.insert(&canonical)?;
        tree.values.insert(canonical.clone(), value);
        self.routes.push((method, canonical));
        Ok(())
    }

    /// Finds the route matching `method` and `path`.
    ///
    /// Returns `None` when nothing matches; the caller decides how to
    /// answer (usually with a 404).
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        let tree = self.tree(method)?;
        let segments = split_path(path);
        let node = tree.root.search(&segments)?;
        let pattern = node.pattern.as_deref()?;
        let value = tree.values.get(pattern)?;

        Some(RouteMatch {
            value,
            pattern,
            params: extract_params(pattern, &segments),
        })
    }

    /// Returns the methods whose tree has a route matching `path`.
    ///
    /// Methods are listed in the order they were first registered.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let segments = split_path(path);
        self.trees
            .iter()
            .filter(|(_, tree)| tree.root.search(&segments).is_some())
            .map(|(method, _)| method.clone())
            .collect()
    }

    /// Returns every registered `(method, pattern)` pair in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter().map(|(m, p)| (m, p.as_str()))
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes have been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn tree(&self, method: &Method) -> Option<&MethodTree<T>> {
        self.trees
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, tree)| tree)
    }

    fn tree_mut(&mut self, method: &Method) -> &mut MethodTree<T> {
        let index = match self.trees.iter().position(|(m, _)| m == method) {
            Some(index) => index,
            None => {
                self.trees.push((method.clone(), MethodTree::new()));
                self.trees.len() - 1
            }
        };
        &mut self.trees[index].1
    }
}

/// Rebuilds a pattern from its segments so `/users//:id/` and `/users/:id`
/// register as the same route.
fn canonical_pattern(segments: &[(String, crate::node::SegmentKind)]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut pattern = String::new();
    for (part, _) in segments {
        pattern.push('/');
        pattern.push_str(part);
    }
    pattern
}

/// Binds parameter values by walking the pattern alongside the path.
fn extract_params(pattern: &str, segments: &[&str]) -> Params {
    let mut params = Params::new();

    for (i, part) in split_path(pattern).iter().enumerate() {
        if let Some(name) = part.strip_prefix(':') {
            if let Some(value) = segments.get(i) {
                params.insert(name, *value);
            }
        } else if let Some(name) = part.strip_prefix('*') {
            let rest = segments.get(i..).unwrap_or_default();
            params.insert(name, rest.join("/"));
            break;
        }
    }

    params
}
