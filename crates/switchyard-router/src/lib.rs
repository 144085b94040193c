//! Segment-trie path router for Switchyard.
//!
//! This crate matches request paths against registered route patterns. Each
//! HTTP method owns a separate trie of `/`-delimited segments.
//!
//! # Features
//!
//! - **Named Parameters**: `/users/:id` binds one segment to `id`
//! - **Wildcards**: `/assets/*filepath` binds the remainder of the path
//! - **Explicit Precedence**: literal segments beat parameters, which beat wildcards
//! - **Strict Registration**: malformed or duplicate patterns are rejected up front
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use switchyard_router::Router;
//!
//! let mut router = Router::new();
//! router.insert(Method::GET, "/users/me", "currentUser").unwrap();
//! router.insert(Method::GET, "/users/:id", "getUser").unwrap();
//!
//! let found = router.find(&Method::GET, "/users/me").unwrap();
//! assert_eq!(*found.value, "currentUser");
//!
//! let found = router.find(&Method::GET, "/users/7").unwrap();
//! assert_eq!(found.pattern, "/users/:id");
//! assert_eq!(found.params.get("id"), Some("7"));
//! ```
//!
//! # Architecture
//!
//! ```text
//!                  GET (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!           "users"        "assets"
//!              │               │
//!        ┌─────┴─────┐    "*filepath"
//!        │           │     [terminal]
//!      "me"        ":id"
//!   [terminal]  [terminal]
//! ```

mod error;
mod node;
mod params;
mod router;

pub use error::RouteError;
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use router::{RouteMatch, Router};
