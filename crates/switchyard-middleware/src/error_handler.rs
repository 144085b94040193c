//! Error rendering after the chain unwinds.
//!
//! Steps report application errors with [`Context::set_error`] or by
//! returning `Err`. This step waits for the rest of the chain, then fires
//! the `on_error` hooks and, if nothing has been written yet, renders the
//! error envelope.

use std::sync::Arc;

use switchyard_core::{BoxFuture, Context, HandlerResult, Middleware, Step};
use tracing::debug;

/// Step that surfaces errors recorded by later steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorHandler;

impl Middleware for ErrorHandler {
    fn name(&self) -> &'static str {
        "error_handler"
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            ctx.next().await;

            if ctx.error().is_none() {
                return Ok(());
            }

            ctx.fire_error_hooks();

            if let Some(err) = ctx.take_error() {
                if ctx.is_written() {
                    debug!(error = %err, "response already written, error not rendered");
                } else {
                    ctx.write_error(&err);
                }
                ctx.set_error(err);
            }
            Ok(())
        })
    }
}

/// Returns an error-rendering step.
pub fn error_handler() -> Step {
    Arc::new(ErrorHandler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use switchyard_core::{from_fn, DispatchError, FieldError, Hooks, Mode};

    #[tokio::test]
    async fn test_renders_set_error_and_fires_hooks() {
        let mut hooks = Hooks::new();
        hooks.on_error(|ctx| {
            let message = ctx.error().map(|e| e.message().to_string());
            ctx.set("hook_saw", message);
        });

        let mut ctx = Context::new(Mode::Release, Arc::new(hooks));
        ctx.push_steps(vec![
            error_handler(),
            from_fn(|ctx| {
                Box::pin(async move {
                    ctx.set_error(DispatchError::validation(
                        "invalid input",
                        vec![FieldError::new("name", "required").with_tag("required")],
                    ));
                    Ok(())
                })
            }),
        ]);
        ctx.next().await;

        assert_eq!(
            ctx.get::<Option<String>>("hook_saw"),
            Some(&Some("invalid input".to_string()))
        );
        assert_eq!(ctx.writer().status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(ctx.writer().body()).unwrap();
        assert_eq!(body["errors"][0]["field"], "name");
        assert!(ctx.error().is_some());
    }

    #[tokio::test]
    async fn test_returned_error_is_rendered() {
        let mut ctx = Context::default();
        ctx.push_steps(vec![
            error_handler(),
            from_fn(|_ctx| Box::pin(async move { Err(DispatchError::not_found("no such job")) })),
        ]);
        ctx.next().await;

        assert_eq!(ctx.writer().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_written_response_is_kept() {
        let mut ctx = Context::default();
        ctx.push_steps(vec![
            error_handler(),
            from_fn(|ctx| {
                Box::pin(async move {
                    ctx.string(StatusCode::OK, "partial");
                    ctx.set_error(DispatchError::internal("after write"));
                    Ok(())
                })
            }),
        ]);
        ctx.next().await;

        assert_eq!(ctx.writer().status(), StatusCode::OK);
        assert_eq!(ctx.writer().body(), b"partial");
    }

    #[tokio::test]
    async fn test_no_error_no_hooks() {
        let mut hooks = Hooks::new();
        hooks.on_error(|ctx| ctx.set("fired", true));

        let mut ctx = Context::new(Mode::Test, Arc::new(hooks));
        ctx.push_steps(vec![error_handler()]);
        ctx.next().await;

        assert!(!ctx.contains_key("fired"));
        assert!(!ctx.is_written());
    }
}
