//! 注册、激活与重发激活邮件

mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::{TestApp, body_json, get, json_request};
use passage_adapter_email::EmailTemplate;
use passage_ports::CachePort;
use serde_json::json;

const PASSWORD: &str = "Abc123!@";

#[tokio::test]
async fn test_signup_defers_user_until_activation() {
    let mut app = TestApp::new();

    let response = app.signup("Ada Lovelace", "ada@x.com", PASSWORD).await;
    assert_eq!(response.status(), 201);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Success");
    assert!(body.get("data").is_none());

    assert_eq!(app.users.count(), 0);
    let token = app.only_pending_token();
    assert_eq!(token.len(), 64);

    let mail = app.queued_mail();
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].to, "ada@x.com");
    assert_eq!(mail[0].subject, "Verify your email");
    assert!(mail[0].html.contains("Welcome, Ada Lovelace!"));
    assert!(mail[0].html.contains(&format!(
        "http://localhost:3000/api/v1/auth/verify?token={}",
        token
    )));

    // 激活前不能登录
    let response = app
        .send(json_request(
            "POST",
            "/auth/signin",
            &json!({"email": "ada@x.com", "password": PASSWORD}),
        ))
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_signup_reports_every_invalid_field() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            "POST",
            "/auth/signup",
            &json!({
                "name": "Al",
                "email": "not-an-email",
                "password": "abc",
                "confirmPassword": "abd",
                "role": "root",
            }),
        ))
        .await;
    assert_eq!(response.status(), 400);

    let body = body_json(response).await;
    assert_eq!(body["title"], "Validation Error");
    let messages: Vec<String> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        messages,
        vec![
            "name must be at least 3 characters",
            "email must be a valid email address",
            "password must be at least 6 characters",
            "confirmPassword must match password",
            "role can only either be user, admin or management",
        ]
    );
    assert!(app.cache.pending_tokens().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let app = TestApp::new();

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/auth/signup")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), 400);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid JSON body");
}

#[tokio::test]
async fn test_activation_is_at_most_once() {
    let mut app = TestApp::new();
    app.signup("Ada Lovelace", "ada@x.com", PASSWORD).await;
    let token = app.only_pending_token();
    app.queued_mail();

    let response = app.send(get(&format!("/auth/verify?token={}", token))).await;
    assert_eq!(response.status(), 200);
    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("refresh_token="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], "ada@x.com");
    assert_eq!(body["data"]["role"], "user");
    assert!(!body["data"]["access_token"].as_str().unwrap().is_empty());
    assert!(!body["data"]["refresh_token"].as_str().unwrap().is_empty());

    assert_eq!(app.users.count(), 1);
    assert_eq!(app.refresh_tokens.count(), 1);
    assert!(app.cache.pending_tokens().is_empty());

    let response = app.send(get(&format!("/auth/verify?token={}", token))).await;
    assert_eq!(response.status(), 400);
    assert_eq!(body_json(response).await["message"], "invalid or expired token");
    assert_eq!(app.users.count(), 1);
}

#[tokio::test]
async fn test_reactivation_with_stale_record_is_validation() {
    let app = TestApp::new();
    app.signup("Ada Lovelace", "ada@x.com", PASSWORD).await;
    let token = app.only_pending_token();
    let key = format!("verify:{}", token);
    let raw = app.cache.get(&key).await.unwrap().unwrap();

    let response = app.send(get(&format!("/auth/verify?token={}", token))).await;
    assert_eq!(response.status(), 200);

    // 模拟激活后删除失败，记录仍留在缓存中
    app.cache.insert_raw(&key, &raw);

    let response = app.send(get(&format!("/auth/verify?token={}", token))).await;
    assert_eq!(response.status(), 400);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Validation Error");
    assert_eq!(body["message"], "invalid or expired token");

    assert_eq!(app.users.count(), 1);
    assert_eq!(app.refresh_tokens.count(), 1);
    assert!(app.cache.pending_tokens().is_empty());
}

#[tokio::test]
async fn test_render_failure_leaves_no_pending_record() {
    let mut app = TestApp::with_template(EmailTemplate::from_strings(HashMap::new()).unwrap());

    let response = app.signup("Ada Lovelace", "ada@x.com", PASSWORD).await;
    assert_eq!(response.status(), 500);

    assert!(app.cache.pending_tokens().is_empty());
    assert!(app.queued_mail().is_empty());
    assert_eq!(app.users.count(), 0);
}

#[tokio::test]
async fn test_unknown_or_missing_token_is_validation() {
    let app = TestApp::new();

    for uri in ["/auth/verify?token=deadbeef", "/auth/verify?token=", "/auth/verify"] {
        let response = app.send(get(uri)).await;
        assert_eq!(response.status(), 400, "{}", uri);
        let body = body_json(response).await;
        assert_eq!(body["title"], "Validation Error");
        assert_eq!(body["message"], "invalid or expired token");
    }
}

#[tokio::test]
async fn test_expired_activation_token_is_validation() {
    let app = TestApp::new();
    app.signup("Ada Lovelace", "ada@x.com", PASSWORD).await;
    let token = app.only_pending_token();

    tokio::time::pause();
    tokio::time::advance(Duration::from_secs(16 * 60)).await;

    let response = app.send(get(&format!("/auth/verify?token={}", token))).await;
    assert_eq!(response.status(), 400);
    assert_eq!(body_json(response).await["message"], "invalid or expired token");
    assert_eq!(app.users.count(), 0);
}

#[tokio::test]
async fn test_duplicate_email_after_activation() {
    let app = TestApp::new();
    app.activated_user("Ada Lovelace", "ada@x.com", PASSWORD).await;

    let response = app.signup("Ada Again", "ADA@x.com", PASSWORD).await;
    assert_eq!(response.status(), 400);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Duplicate Value");
    assert_eq!(
        body["message"],
        "Duplicate value entered for email field, please choose another value"
    );
}

#[tokio::test]
async fn test_resend_reuses_pending_token() {
    let mut app = TestApp::new();
    app.signup("Ada Lovelace", "ada@x.com", PASSWORD).await;
    let token = app.only_pending_token();
    app.queued_mail();

    let response = app
        .send(json_request("POST", "/auth/resend", &json!({"email": " Ada@X.com "})))
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(response).await["title"], "Success");

    let mail = app.queued_mail();
    assert_eq!(mail.len(), 1);
    assert!(mail[0].html.contains(&token));
    assert_eq!(app.only_pending_token(), token);
}

#[tokio::test]
async fn test_resend_rejections() {
    let app = TestApp::new();
    app.activated_user("Ada Lovelace", "ada@x.com", PASSWORD).await;

    let cases = [
        (json!({"email": ""}), "email is required"),
        (json!({"email": "ada@x.com"}), "account already activated"),
        (
            json!({"email": "nobody@x.com"}),
            "verification token not found or expired",
        ),
    ];

    for (body, expected) in cases {
        let response = app.send(json_request("POST", "/auth/resend", &body)).await;
        assert_eq!(response.status(), 400);
        assert_eq!(body_json(response).await["message"], expected);
    }
}
