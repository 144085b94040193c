//! Building an engine from configuration through the facade.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::BodyExt;
use switchyard::prelude::*;

fn get(uri: &str) -> Request {
    http::Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

fn sleepy() -> Step {
    from_fn(|ctx| {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            ctx.string(StatusCode::OK, "late");
            Ok(())
        })
    })
}

#[tokio::test(start_paused = true)]
async fn configured_timeout_guards_every_route() {
    let config = ConfigLoader::new()
        .with_string(
            r#"
            [engine]
            mode = "test"

            [timeout]
            enabled = true
            duration_ms = 1500
            message = "upstream too slow"
            status = 503
            "#,
            "toml",
        )
        .unwrap()
        .load()
        .unwrap();

    let mut engine = switchyard::engine_from_config(&config);
    assert_eq!(engine.mode(), Mode::Test);
    assert_eq!(engine.global_steps().len(), 3);
    engine.get("/slow", vec![sleepy()]).unwrap();

    let response = engine.serve_request(get("/slow")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        std::str::from_utf8(&body).unwrap(),
        r#"{"error":"upstream too slow","timeout":"1.5s"}"#
    );
}

#[tokio::test]
async fn method_not_allowed_follows_configuration() {
    let config = ConfigLoader::new()
        .with_string("[engine]\nhandle_method_not_allowed = true", "toml")
        .unwrap()
        .load()
        .unwrap();

    let mut engine = switchyard::engine_from_config(&config);
    assert_eq!(engine.global_steps().len(), 2);
    engine
        .post(
            "/items",
            vec![from_fn(|ctx| {
                Box::pin(async move {
                    ctx.status(StatusCode::CREATED);
                    Ok(())
                })
            })],
        )
        .unwrap();

    let response = engine.serve_request(get("/items")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "POST");
}
