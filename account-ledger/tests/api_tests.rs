//! HTTP API tests
//!
//! Drive the axum router in-process and check status codes and bodies.

use account_ledger::{
    api::{self, AppState},
    Config, Ledger,
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    ledger: Arc<Ledger>,
    shutdown: CancellationToken,
}

impl TestApp {
    fn new() -> Self {
        let ledger = Arc::new(Ledger::open(Config::default()).unwrap());
        let shutdown = CancellationToken::new();
        let router = api::router(AppState::new(ledger.clone(), shutdown.clone()));
        Self {
            router,
            ledger,
            shutdown,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn create_account(&self) -> u64 {
        let (status, body) = self.send("POST", "/accounts", "{}").await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        value["AccountID"].as_u64().unwrap()
    }
}

#[tokio::test]
async fn test_create_account_api() {
    let app = TestApp::new();

    let (status, body) = app.send("POST", "/accounts", "{}").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"AccountID":1}"#);
}

#[tokio::test]
async fn test_deposit_account_api() {
    let app = TestApp::new();
    let id = app.create_account().await;

    let (status, body) = app
        .send(
            "POST",
            "/accounts/deposit",
            &format!(r#"{{"account_id":{},"amount":100}}"#, id),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""success""#);

    let (status, body) = app.send("GET", &format!("/accounts/{}", id), "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!(r#"{{"ID":{},"Balance":100}}"#, id));
}

#[tokio::test]
async fn test_withdraw_account_api() {
    let app = TestApp::new();
    let id = app.create_account().await;

    app.send(
        "POST",
        "/accounts/deposit",
        &format!(r#"{{"account_id":{},"amount":100}}"#, id),
    )
    .await;

    let (status, body) = app
        .send(
            "POST",
            "/accounts/withdraw",
            &format!(r#"{{"account_id":{},"amount":50}}"#, id),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""success""#);

    let (status, body) = app
        .send(
            "POST",
            "/accounts/withdraw",
            &format!(r#"{{"account_id":{},"amount":150}}"#, id),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#""insufficient funds""#);
}

#[tokio::test]
async fn test_transfer_account_api() {
    let app = TestApp::new();
    let from = app.create_account().await;
    let to = app.create_account().await;

    app.send(
        "POST",
        "/accounts/deposit",
        &format!(r#"{{"account_id":{},"amount":100}}"#, from),
    )
    .await;

    let (status, body) = app
        .send(
            "POST",
            "/accounts/transfer",
            &format!(
                r#"{{"from_account_id":{},"to_account_id":{},"amount":50}}"#,
                from, to
            ),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""success""#);

    app.ledger.flush_log().await.unwrap();
    let (status, body) = app.send("GET", "/transactions", "").await;
    assert_eq!(status, StatusCode::OK);
    let entries: Value = serde_json::from_str(&body).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["From"], from);
    assert_eq!(entries[0]["To"], to);
    assert_eq!(entries[0]["Amount"], 50);
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let app = TestApp::new();

    let first = app.create_account().await;
    let (_, body) = app.send("GET", &format!("/accounts/{}", first), "").await;
    assert_eq!(body, format!(r#"{{"ID":{},"Balance":0}}"#, first));

    app.send(
        "POST",
        "/accounts/deposit",
        &format!(r#"{{"account_id":{},"amount":100}}"#, first),
    )
    .await;

    let second = app.create_account().await;
    let (status, _) = app
        .send(
            "POST",
            "/accounts/transfer",
            &format!(
                r#"{{"from_account_id":{},"to_account_id":{},"amount":50}}"#,
                first, second
            ),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send("GET", &format!("/accounts/{}", first), "").await;
    assert_eq!(body, format!(r#"{{"ID":{},"Balance":50}}"#, first));
    let (_, body) = app.send("GET", &format!("/accounts/{}", second), "").await;
    assert_eq!(body, format!(r#"{{"ID":{},"Balance":50}}"#, second));

    let (status, _) = app
        .send(
            "POST",
            "/accounts/withdraw",
            &format!(r#"{{"account_id":{},"amount":50}}"#, first),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            "POST",
            "/accounts/withdraw",
            &format!(r#"{{"account_id":{},"amount":1}}"#, first),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#""insufficient funds""#);
}

#[tokio::test]
async fn test_malformed_body_returns_400() {
    let app = TestApp::new();

    let (status, body) = app.send("POST", "/accounts/deposit", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(serde_json::from_str::<String>(&body).is_ok());

    let (status, _) = app
        .send("POST", "/accounts/transfer", r#"{"from_account_id":1}"#)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_same_account_transfer_returns_500() {
    let app = TestApp::new();
    let id = app.create_account().await;

    let (status, body) = app
        .send(
            "POST",
            "/accounts/transfer",
            &format!(
                r#"{{"from_account_id":{},"to_account_id":{},"amount":1}}"#,
                id, id
            ),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#""cannot transfer to the same account""#);
}

#[tokio::test]
async fn test_unknown_account_returns_500() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/accounts/42", "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#""account not found""#);

    let (status, _) = app.send("GET", "/accounts/not-a-number", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_requests_rejected_after_shutdown_signal() {
    let app = TestApp::new();
    let id = app.create_account().await;

    app.shutdown.cancel();
    let (status, _) = app
        .send(
            "POST",
            "/accounts/deposit",
            &format!(r#"{{"account_id":{},"amount":10}}"#, id),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.ledger.get_account(id.into()).unwrap().balance, 0);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = TestApp::new();
    app.create_account().await;

    let (status, body) = app.send("GET", "/health", "").await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["accounts"], 1);

    let (status, body) = app.send("GET", "/metrics", "").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ledger_accounts_created_total 1"));
}
