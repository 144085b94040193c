//! Chain executor behavior through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::StatusCode;
use switchyard_core::{
    from_fn, Context, DispatchError, HookPoint, Hooks, Middleware, Mode, ResponseHooks, Step,
};

fn counting(counter: Arc<AtomicUsize>) -> Step {
    from_fn(move |ctx| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            ctx.next().await;
            Ok(())
        })
    })
}

#[tokio::test]
async fn every_step_runs_exactly_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut ctx = Context::default();
    ctx.push_steps((0..10).map(|_| counting(Arc::clone(&counter))));

    ctx.next().await;
    // A second call after the chain is exhausted is a no-op.
    ctx.next().await;

    assert_eq!(counter.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn abort_before_next_prevents_handler() {
    let handler_ran = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&handler_ran);

    let mut ctx = Context::default();
    ctx.push_steps(vec![
        from_fn(|ctx| {
            Box::pin(async move {
                if ctx.request_header("authorization").is_none() {
                    ctx.abort_with_error(DispatchError::unauthorized("missing token"));
                    return Ok(());
                }
                ctx.next().await;
                Ok(())
            })
        }),
        from_fn(move |ctx| {
            let seen = Arc::clone(&seen);
            Box::pin(async move {
                seen.fetch_add(1, Ordering::SeqCst);
                ctx.string(StatusCode::OK, "secret");
                Ok(())
            })
        }),
    ]);

    ctx.next().await;

    assert_eq!(handler_ran.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.writer().status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = serde_json::from_slice(ctx.writer().body()).unwrap();
    assert_eq!(body["error"], "missing token");
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn response_hooks_run_after_chain_unwinds() {
    let mut hooks = Hooks::new();
    hooks.on_response(|ctx| {
        let status = ctx.writer().status().as_u16();
        ctx.set("observed_status", status);
    });

    let mut ctx = Context::new(Mode::Test, Arc::new(hooks));
    ctx.push_steps(vec![
        Arc::new(ResponseHooks) as Step,
        from_fn(|ctx| {
            Box::pin(async move {
                ctx.string(StatusCode::CREATED, "ok");
                Ok(())
            })
        }),
    ]);
    ctx.next().await;

    assert_eq!(ctx.get::<u16>("observed_status"), Some(&201));
    assert_eq!(ResponseHooks.name(), "on_response");
}

#[tokio::test]
async fn route_hook_abort_stops_remaining_route_hooks() {
    let mut hooks = Hooks::new();
    hooks
        .on_route(|ctx| ctx.abort_with_status(StatusCode::FORBIDDEN))
        .on_route(|ctx| ctx.set("second", true));

    let mut ctx = Context::new(Mode::Release, Arc::new(hooks));
    ctx.fire_hooks(HookPoint::Route);

    assert!(ctx.is_aborted());
    assert!(!ctx.contains_key("second"));
    assert_eq!(ctx.writer().status(), StatusCode::FORBIDDEN);
}
