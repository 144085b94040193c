//! End-to-end dispatch through the engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use switchyard_core::{from_fn, DispatchError, Mode, Request, Response, Step};
use switchyard_middleware::{error_handler, recovery, request_id, Timeout, REQUEST_ID_HEADER};
use switchyard_server::{Engine, EngineConfig, Routes};

fn get(uri: &str) -> Request {
    http::Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn echo_param(name: &'static str) -> Step {
    from_fn(move |ctx| {
        Box::pin(async move {
            let value = ctx.param(name).unwrap_or_default().to_string();
            tokio::task::yield_now().await;
            ctx.string(StatusCode::OK, value);
            Ok(())
        })
    })
}

fn engine() -> Engine {
    Engine::new(EngineConfig::default().with_mode(Mode::Test))
}

/// Stores the `id` parameter under a key, yields, then echoes the key.
fn echo_key() -> Step {
    from_fn(|ctx| {
        Box::pin(async move {
            let id = ctx.param("id").unwrap_or_default().to_string();
            ctx.set("user", id);
            tokio::task::yield_now().await;
            let user = ctx.get::<String>("user").cloned().unwrap_or_default();
            ctx.string(StatusCode::OK, user);
            Ok(())
        })
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_keep_params_and_keys_isolated() {
    let mut engine = engine();
    engine.get("/users/:id", vec![echo_key()]).unwrap();
    let engine = Arc::new(engine);

    let mut handles = Vec::with_capacity(1000);
    for i in 0..1000 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let response = engine.serve_request(get(&format!("/users/{i}"))).await;
            (i, response.status(), body_text(response).await)
        }));
    }

    for handle in handles {
        let (i, status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, i.to_string());
    }

    let pool = engine.pool();
    assert!(pool.created() <= 1000);
    assert_eq!(pool.idle(), pool.created());
}

#[tokio::test]
async fn sequential_requests_reuse_one_context() {
    let mut engine = engine();
    engine.get("/files/*path", vec![echo_param("path")]).unwrap();

    for i in 0..50 {
        let response = engine.serve_request(get(&format!("/files/a/{i}.txt"))).await;
        assert_eq!(body_text(response).await, format!("a/{i}.txt"));
    }
    assert_eq!(engine.pool().created(), 1);
}

#[tokio::test]
async fn keys_do_not_leak_between_requests() {
    let mut engine = engine();
    engine
        .get(
            "/visit",
            vec![from_fn(|ctx| {
                Box::pin(async move {
                    let seen = ctx.contains_key("visited");
                    ctx.set("visited", true);
                    ctx.string(StatusCode::OK, if seen { "stale" } else { "fresh" });
                    Ok(())
                })
            })],
        )
        .unwrap();

    for _ in 0..3 {
        let response = engine.serve_request(get("/visit")).await;
        assert_eq!(body_text(response).await, "fresh");
    }
}

#[tokio::test]
async fn hooks_fire_in_lifecycle_order() {
    let order = Arc::new(Log::default());
    let mut engine = engine();

    let log = Arc::clone(&order);
    engine.on_request(move |_ctx| log.push("request"));
    let log = Arc::clone(&order);
    engine.on_route(move |_ctx| log.push("route"));
    let log = Arc::clone(&order);
    engine.on_response(move |_ctx| log.push("response"));

    let log = Arc::clone(&order);
    engine.use_middleware(from_fn(move |ctx| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.push("global");
            ctx.next().await;
            Ok(())
        })
    }));
    let log = Arc::clone(&order);
    engine
        .get(
            "/ping",
            vec![from_fn(move |ctx| {
                let log = Arc::clone(&log);
                Box::pin(async move {
                    log.push("handler");
                    ctx.string(StatusCode::OK, "pong");
                    Ok(())
                })
            })],
        )
        .unwrap();

    engine.serve_request(get("/ping")).await;
    assert_eq!(
        order.entries(),
        vec!["request", "route", "global", "handler", "response"]
    );
}

#[tokio::test]
async fn route_hook_abort_skips_chain() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut engine = engine();

    let counter = Arc::clone(&calls);
    engine
        .get(
            "/admin",
            vec![from_fn(move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { Ok(()) })
            })],
        )
        .unwrap();
    engine.on_route(|ctx| {
        if ctx.full_path() == Some("/admin") {
            ctx.abort_with_error(DispatchError::forbidden("admins only"));
        }
    });

    let response = engine.serve_request(get("/admin")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn group_middleware_applies_only_inside_group() {
    let mut engine = engine();
    {
        let mut api = engine.group("/api");
        api.use_middleware(from_fn(|ctx| {
            Box::pin(async move {
                ctx.header("x-api", "yes");
                ctx.next().await;
                Ok(())
            })
        }));
        api.get("/status", vec![echo_param("none")]).unwrap();
    }
    engine.get("/status", vec![echo_param("none")]).unwrap();

    let inside = engine.serve_request(get("/api/status")).await;
    assert_eq!(inside.headers()["x-api"], "yes");

    let outside = engine.serve_request(get("/status")).await;
    assert!(outside.headers().get("x-api").is_none());
}

fn tag(name: &'static str, value: &'static str) -> Step {
    from_fn(move |ctx| {
        Box::pin(async move {
            ctx.header(name, value);
            ctx.next().await;
            Ok(())
        })
    })
}

#[tokio::test]
async fn group_middleware_added_late_applies_to_earlier_routes() {
    let mut engine = engine();
    {
        let mut api = engine.group("/api");
        api.get("/early", vec![echo_param("none")]).unwrap();
        let mut v1 = api.group("/v1");
        v1.get("/nested", vec![echo_param("none")]).unwrap();
        api.use_middleware(tag("x-api", "yes"));
    }

    let early = engine.serve_request(get("/api/early")).await;
    assert_eq!(early.status(), StatusCode::OK);
    assert_eq!(early.headers()["x-api"], "yes");

    let nested = engine.serve_request(get("/api/v1/nested")).await;
    assert_eq!(nested.headers()["x-api"], "yes");
}

#[tokio::test]
async fn group_middleware_runs_on_miss_under_prefix() {
    let mut engine = engine();
    {
        let mut api = engine.group("/api");
        api.get("/early", vec![echo_param("none")]).unwrap();
        api.use_middleware(tag("x-api", "yes"));
        let mut v1 = api.group("/v1");
        v1.use_middleware(tag("x-v1", "yes"));
    }

    let missing = engine.serve_request(get("/api/missing")).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(missing.headers()["x-api"], "yes");
    assert!(missing.headers().get("x-v1").is_none());

    let nested = engine.serve_request(get("/api/v1/missing")).await;
    assert_eq!(nested.status(), StatusCode::NOT_FOUND);
    assert_eq!(nested.headers()["x-api"], "yes");
    assert_eq!(nested.headers()["x-v1"], "yes");

    let outside = engine.serve_request(get("/apix")).await;
    assert!(outside.headers().get("x-api").is_none());
}

#[tokio::test]
async fn full_stack_with_timeout() {
    let mut engine = engine();
    engine
        .use_middleware(recovery())
        .use_middleware(request_id())
        .use_middleware(error_handler());

    engine
        .get(
            "/slow",
            vec![
                Arc::new(Timeout::new(Duration::from_millis(20))) as Step,
                from_fn(|ctx| {
                    Box::pin(async move {
                        tokio::time::sleep(Duration::from_secs(2)).await;
                        ctx.string(StatusCode::OK, "late");
                        Ok(())
                    })
                }),
            ],
        )
        .unwrap();
    engine
        .get(
            "/boom",
            vec![from_fn(|_ctx| Box::pin(async move { explode() }))],
        )
        .unwrap();

    let response = engine.serve_request(get("/slow")).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["timeout"], "20ms");

    let response = engine.serve_request(get("/boom")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn release_mode_hides_panic_text() {
    let mut engine = Engine::new(EngineConfig::default().with_mode(Mode::Release));
    engine.use_middleware(recovery());
    engine
        .get(
            "/db",
            vec![from_fn(|_ctx| {
                Box::pin(async move { leak("connect failed: db password=hunter2") })
            })],
        )
        .unwrap();

    let response = engine.serve_request(get("/db")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(!body.contains("hunter2"));
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "internal server error");
    assert!(body.get("stack").is_none());
}

fn leak(message: &str) -> switchyard_core::HandlerResult {
    panic!("{message}")
}

fn explode() -> switchyard_core::HandlerResult {
    panic!("handler blew up")
}

/// Append-only event log shared between hooks and steps.
#[derive(Default)]
struct Log(Mutex<Vec<&'static str>>);

impl Log {
    fn push(&self, entry: &'static str) {
        self.0.lock().push(entry);
    }

    fn entries(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }
}
