//! Integration tests for combinators and the timeout guard.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use switchyard_core::{from_fn, Context, DispatchError, Hooks, Mode, Step};
use switchyard_middleware::{combine, error_handler, recovery, Timeout};

fn mark(label: &'static str) -> Step {
    from_fn(move |ctx| {
        Box::pin(async move {
            if let Some(log) = ctx.get_mut::<Vec<&'static str>>("trace") {
                log.push(label);
            } else {
                ctx.set("trace", vec![label]);
            }
            Ok(())
        })
    })
}

fn trace(ctx: &Context) -> Vec<&'static str> {
    ctx.get::<Vec<&'static str>>("trace")
        .cloned()
        .unwrap_or_default()
}

fn boom(message: &str) -> switchyard_core::HandlerResult {
    panic!("{message}")
}

fn body_json(ctx: &Context) -> serde_json::Value {
    serde_json::from_slice(ctx.writer().body()).unwrap()
}

fn guard(ms: u64) -> Step {
    Arc::new(Timeout::new(Duration::from_millis(ms)))
}

#[tokio::test]
async fn combine_splices_at_cursor() {
    let mut ctx = Context::default();
    ctx.push_steps(vec![
        mark("s0"),
        mark("s1"),
        combine(vec![mark("c0"), mark("c1")]),
        mark("s3"),
        mark("s4"),
    ]);
    ctx.next().await;

    assert_eq!(trace(&ctx), vec!["s0", "s1", "c0", "c1", "s3", "s4"]);
    // k + 1 + inserted + (n - k - 1) with n = 5, k = 2
    assert_eq!(ctx.cursor(), 2 + 1 + 2 + (5 - 2 - 1));
    assert_eq!(ctx.step_count(), 7);
}

#[tokio::test]
async fn nested_combine_preserves_order() {
    let mut ctx = Context::default();
    ctx.push_steps(vec![
        combine(vec![mark("a"), combine(vec![mark("b"), mark("c")])]),
        mark("d"),
    ]);
    ctx.next().await;

    assert_eq!(trace(&ctx), vec!["a", "b", "c", "d"]);
}

#[tokio::test(start_paused = true)]
async fn fast_chain_output_and_keys_are_restored() {
    let mut ctx = Context::default();
    ctx.push_steps(vec![
        guard(100),
        from_fn(|ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ctx.set("user", "alice".to_string());
                ctx.header("x-handled", "yes");
                ctx.string(StatusCode::CREATED, "fast");
                Ok(())
            })
        }),
    ]);
    ctx.next().await;

    assert_eq!(ctx.writer().status(), StatusCode::CREATED);
    assert_eq!(ctx.writer().body(), b"fast");
    assert_eq!(ctx.writer().headers()["x-handled"], "yes");
    assert_eq!(ctx.get::<String>("user").map(String::as_str), Some("alice"));
    assert!(!ctx.is_aborted());
}

#[tokio::test(start_paused = true)]
async fn slow_chain_gets_timeout_body() {
    let mut ctx = Context::default();
    ctx.push_steps(vec![
        guard(100),
        from_fn(|ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                ctx.string(StatusCode::OK, "too late");
                Ok(())
            })
        }),
    ]);
    ctx.next().await;

    assert!(ctx.is_aborted());
    assert_eq!(ctx.writer().status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        body_json(&ctx),
        serde_json::json!({"error": "request timeout", "timeout": "100ms"})
    );

    // Let the abandoned task finish; its output must not leak.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(ctx.writer().status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn custom_message_and_status() {
    let timeout = Timeout::new(Duration::from_secs(2))
        .message("upstream too slow")
        .status(StatusCode::SERVICE_UNAVAILABLE);

    let mut ctx = Context::default();
    ctx.push_steps(vec![
        Arc::new(timeout) as Step,
        from_fn(|_ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
        }),
    ]);
    ctx.next().await;

    assert_eq!(ctx.writer().status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(&ctx),
        serde_json::json!({"error": "upstream too slow", "timeout": "2s"})
    );
}

#[tokio::test(start_paused = true)]
async fn panic_before_deadline_reaches_outer_recovery() {
    let mut ctx = Context::new(Mode::Release, Arc::new(Hooks::new()));
    ctx.push_steps(vec![
        recovery(),
        guard(100),
        from_fn(|_ctx| Box::pin(async move { boom("guarded failure") })),
    ]);
    ctx.next().await;

    assert_eq!(ctx.writer().status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(&ctx)["error"], "internal server error");
    assert_eq!(
        ctx.error().map(DispatchError::message),
        Some("guarded failure")
    );
}

#[tokio::test(start_paused = true)]
async fn panic_after_deadline_is_dropped() {
    let mut ctx = Context::new(Mode::Release, Arc::new(Hooks::new()));
    ctx.push_steps(vec![
        recovery(),
        guard(100),
        from_fn(|_ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                boom("late failure")
            })
        }),
    ]);
    ctx.next().await;

    assert_eq!(ctx.writer().status(), StatusCode::GATEWAY_TIMEOUT);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(ctx.writer().status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(ctx.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn error_inside_guard_is_restored() {
    let mut ctx = Context::new(Mode::Release, Arc::new(Hooks::new()));
    ctx.push_steps(vec![
        error_handler(),
        guard(100),
        from_fn(|_ctx| Box::pin(async move { Err(DispatchError::not_found("no such job")) })),
    ]);
    ctx.next().await;

    assert_eq!(ctx.writer().status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(&ctx)["error"], "no such job");
    assert!(matches!(ctx.error(), Some(DispatchError::NotFound { .. })));
}

#[tokio::test(start_paused = true)]
async fn steps_before_guard_see_restored_state() {
    let mut ctx = Context::default();
    ctx.push_steps(vec![
        from_fn(|ctx| {
            Box::pin(async move {
                ctx.set("before", 1_u32);
                ctx.next().await;
                let seen = ctx.get::<u32>("inner").copied();
                ctx.set("outer_saw", seen);
                Ok(())
            })
        }),
        guard(100),
        from_fn(|ctx| {
            Box::pin(async move {
                let before = ctx.get::<u32>("before").copied().unwrap_or_default();
                ctx.set("inner", before + 1);
                Ok(())
            })
        }),
    ]);
    ctx.next().await;

    assert_eq!(ctx.get::<Option<u32>>("outer_saw"), Some(&Some(2)));
}
