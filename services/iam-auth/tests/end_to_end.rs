//! 端到端：注册 → 激活 → 读取当前用户，以及公共路由

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{
    InMemoryCache, InMemoryRefreshTokens, StaticProbe, TestApp, body_bytes, body_json, get,
    get_with, json_request, light_hasher, registration_config,
};
use iam_auth::api::http::router;
use iam_auth::app::{Dependencies, build_state};
use iam_auth::application::MailQueue;
use iam_auth::domain::{User, UserRepository};
use passage_adapter_email::EmailTemplate;
use passage_auth_core::TokenService;
use passage_common::UserId;
use passage_errors::AppResult;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_ada_lovelace_signs_up_and_reads_profile() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/auth/signup",
            &json!({
                "name": "Ada Lovelace",
                "email": "ada@x.com",
                "password": "Abc123!@",
                "confirmPassword": "Abc123!@",
            }),
        ))
        .await;
    assert_eq!(response.status(), 201);

    let token = app.only_pending_token();
    let response = app
        .send(get(&format!("/api/v1/auth/verify?token={}", token)))
        .await;
    assert_eq!(response.status(), 200);
    let activated = body_json(response).await;
    let access = activated["data"]["access_token"].as_str().unwrap();
    assert!(!activated["data"]["refresh_token"].as_str().unwrap().is_empty());

    let response = app
        .send(get_with(
            "/user",
            &[("authorization", format!("Bearer {}", access).as_str())],
        ))
        .await;
    assert_eq!(response.status(), 200);

    let user = body_json(response).await;
    assert_eq!(user["id"], activated["data"]["id"]);
    assert_eq!(user["name"], "Ada Lovelace");
    assert_eq!(user["email"], "ada@x.com");
    assert_eq!(user["role"], "user");
    assert!(
        chrono::DateTime::parse_from_rfc3339(user["created_at"].as_str().unwrap()).is_ok()
    );
}

#[tokio::test]
async fn test_healthcheck_and_fallback() {
    let app = TestApp::new();

    for uri in ["/healthcheck", "/api/v1/healthcheck"] {
        let response = app.send(get(uri)).await;
        assert_eq!(response.status(), 200);
        let body = body_json(response).await;
        assert_eq!(body["title"], "Success");
        assert_eq!(body["message"], "API is healthy and running");
    }

    let response = app.send(get("/nope")).await;
    assert_eq!(response.status(), 404);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Route Error");
    assert_eq!(body["message"], "Route does not exist");
}

#[tokio::test]
async fn test_readiness_reflects_probe() {
    let response = TestApp::new().send(get("/ready")).await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(response).await["healthy"], true);

    let response = TestApp::with_probe(false).send(get("/ready")).await;
    assert_eq!(response.status(), 503);
    let body = body_json(response).await;
    assert_eq!(body["healthy"], false);
    assert_eq!(body["checks"][0]["name"], "postgres");
}

#[tokio::test]
async fn test_metrics_absent_without_recorder() {
    let response = TestApp::new().send(get("/metrics")).await;
    assert_eq!(response.status(), 404);
}

struct PanickingUsers;

#[async_trait]
impl UserRepository for PanickingUsers {
    async fn find_by_id(&self, _id: &UserId) -> AppResult<Option<User>> {
        panic!("connection state corrupted: secret-detail");
    }

    async fn find_by_email(&self, _email: &str) -> AppResult<Option<User>> {
        panic!("connection state corrupted: secret-detail");
    }

    async fn exists_by_email(&self, _email: &str) -> AppResult<bool> {
        panic!("connection state corrupted: secret-detail");
    }

    async fn insert(&self, _user: &User) -> AppResult<UserId> {
        panic!("connection state corrupted: secret-detail");
    }
}

#[tokio::test]
async fn test_panic_becomes_generic_internal_error() {
    let (mail, _rx) = MailQueue::new(4);
    let state = build_state(
        Dependencies {
            users: Arc::new(PanickingUsers),
            refresh_tokens: Arc::new(InMemoryRefreshTokens::default()),
            cache: Arc::new(InMemoryCache::default()),
            tokens: Arc::new(TokenService::new(
                common::ACCESS_SECRET,
                common::REFRESH_SECRET,
                900,
                604_800,
                "passage",
            )),
            hasher: light_hasher(),
            template: Arc::new(EmailTemplate::builtin().unwrap()),
            mail,
            readiness: Arc::new(StaticProbe(true)),
            metrics: None,
        },
        &registration_config(),
        Duration::from_secs(10),
    )
    .unwrap();

    let response = router(state)
        .oneshot(json_request(
            "POST",
            "/auth/signin",
            &json!({"email": "ada@x.com", "password": "Abc123!@"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let bytes = body_bytes(response).await;
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["title"], "Internal Server Error");
    assert_eq!(body["message"], "Something went wrong, try again later");
    assert!(!String::from_utf8_lossy(&bytes).contains("secret-detail"));
}
