//! HTTP surface tests, driven through the router without a socket.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pipeline_recovery::http::{build_router, AppState};
use pipeline_recovery::invocation::InvocationHandler;
use pipeline_recovery::recovery::StaticProber;
use pipeline_recovery::resilience::CircuitBreakerManager;
use pipeline_recovery::secrets::StaticSecretStore;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

fn router(env: &common::TestEnv) -> Router {
    let config = common::test_config("http://127.0.0.1:1");
    let state = AppState::new(config, InvocationHandler::new(env.deps.clone()));
    build_router(state, Duration::from_secs(30))
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn invoke(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/invoke")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_repository() {
    let env = common::test_env(StaticSecretStore::new(), StaticProber::new());
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(router(&env), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["repository"], "acme/widgets");
}

#[tokio::test]
async fn test_invoke_runs_recovery() {
    let env = common::test_env(
        StaticSecretStore::new().with_secret("github-token", "t0ken"),
        StaticProber::new(),
    );

    let (status, body) = send(
        router(&env),
        invoke(json!({"failure_type": "build_failure", "context": {"runner_type": "ubuntu-latest"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Automated recovery completed");
    assert_eq!(body["failure_type"], "build_failure");
    assert_eq!(body["success"], true);
    assert!(body["invocation_id"].is_string());
    assert_eq!(env.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_invoke_rejects_malformed_event() {
    let env = common::test_env(
        StaticSecretStore::new().with_secret("github-token", "t0ken"),
        StaticProber::new(),
    );

    let (status, body) = send(router(&env), invoke(json!({"failure_type": 7}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid invocation event");
}

#[tokio::test]
async fn test_invoke_without_credentials_is_server_error() {
    let env = common::test_env(StaticSecretStore::new(), StaticProber::new());

    let (status, body) = send(router(&env), invoke(json!({"failure_type": "manual_recovery"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Recovery system misconfigured");
    assert!(body["details"].as_str().unwrap().contains("github-token"));
}

#[tokio::test]
async fn test_circuits_lists_open_breakers() {
    let env = common::test_env(StaticSecretStore::new(), StaticProber::new());
    let breaker = CircuitBreakerManager::new(
        env.deps.circuit_store.clone(),
        env.clock.clone(),
        Default::default(),
    );
    for _ in 0..5 {
        breaker.record_failure("github").await;
    }
    breaker.record_failure("artifact-registry").await;

    let request = Request::builder().uri("/circuits").body(Body::empty()).unwrap();
    let (status, body) = send(router(&env), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["open"], 1);
}
