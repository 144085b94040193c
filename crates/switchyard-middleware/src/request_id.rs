//! Request ID middleware.
//!
//! Assigns every request an identifier, stores it under the
//! [`REQUEST_ID_KEY`] context key and echoes it in the `X-Request-Id`
//! response header.
//!
//! ## Request ID Sources
//!
//! 1. **X-Request-Id header**: used when incoming IDs are trusted and the
//!    header holds a valid UUID
//! 2. **Generated UUID v7**: otherwise

use std::sync::Arc;

use switchyard_core::{BoxFuture, Context, HandlerResult, Middleware, Step};
use uuid::Uuid;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Context key holding the request ID as a `String`.
pub const REQUEST_ID_KEY: &str = "request_id";

/// Middleware that generates or propagates request IDs.
#[derive(Debug, Clone, Default)]
pub struct RequestId {
    trust_incoming: bool,
}

impl RequestId {
    /// Creates a middleware that always generates new IDs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a middleware that reuses valid incoming `X-Request-Id` headers.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn incoming(&self, ctx: &Context) -> Option<String> {
        if !self.trust_incoming {
            return None;
        }
        ctx.request_header(REQUEST_ID_HEADER)
            .and_then(|value| Uuid::parse_str(value).ok())
            .map(|id| id.to_string())
    }
}

impl Middleware for RequestId {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let id = self
                .incoming(ctx)
                .unwrap_or_else(|| Uuid::now_v7().to_string());

            ctx.header(REQUEST_ID_HEADER, &id);
            ctx.set(REQUEST_ID_KEY, id);
            ctx.next().await;
            Ok(())
        })
    }
}

/// Returns a step that assigns fresh request IDs.
pub fn request_id() -> Step {
    Arc::new(RequestId::new())
}
