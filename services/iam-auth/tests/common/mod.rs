//! 集成测试公共设施：内存版存储与测试应用

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use chrono::Utc;
use iam_auth::api::http::{AppState, router};
use iam_auth::app::{Dependencies, build_state};
use iam_auth::application::{MailJob, MailQueue};
use iam_auth::domain::{RefreshTokenRecord, RefreshTokenRepository, User, UserRepository};
use iam_auth::infrastructure::cache::PENDING_PREFIX;
use iam_auth::infrastructure::health::ReadinessProbe;
use passage_adapter_email::{EmailSender, EmailTemplate};
use passage_auth_core::{CredentialHasher, HasherParams, ManualClock, TokenService};
use passage_common::UserId;
use passage_config::RegistrationConfig;
use passage_errors::{AppError, AppResult};
use passage_ports::{CachePort, ScanPage};
use passage_telemetry::HealthStatus;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tower::ServiceExt;

pub const ACCESS_SECRET: &str = "test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &str = "test-refresh-secret-0123456789abcdef";
pub const ACCESS_TTL_SECS: i64 = 15 * 60;
pub const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// 内存版 UserRepository
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUsers {
    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn seed(&self, user: User) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        Ok(self.users.lock().unwrap().values().any(|u| u.email == email))
    }

    async fn insert(&self, user: &User) -> AppResult<UserId> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::duplicate("email"));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user.id.clone())
    }
}

// ---------------------------------------------------------------------------
// 内存版 RefreshTokenRepository
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryRefreshTokens {
    records: Mutex<Vec<RefreshTokenRecord>>,
}

impl InMemoryRefreshTokens {
    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn records(&self) -> Vec<RefreshTokenRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokens {
    async fn save(&self, record: &RefreshTokenRecord) -> AppResult<()> {
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.token == record.token) {
            return Err(AppError::duplicate("token"));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshTokenRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.token == token)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// 内存版 CachePort（TTL 基于 tokio 时间，SCAN 按 key 排序分页）
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<BTreeMap<String, (String, Option<Instant>)>>,
    scan_calls: AtomicU32,
}

impl InMemoryCache {
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), None));
    }

    /// 所有未过期的待激活 token
    pub fn pending_tokens(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, (_, expires))| expires.is_none_or(|at| at > now))
            .filter_map(|(key, _)| key.strip_prefix(PENDING_PREFIX).map(str::to_string))
            .collect()
    }

    pub fn scan_calls(&self) -> u32 {
        self.scan_calls.load(Ordering::SeqCst)
    }

    fn live(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((_, Some(at))) if *at <= Instant::now() => {
                entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }
}

fn glob_match(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => pattern == key,
    }
}

#[async_trait]
impl CachePort for InMemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.live(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), Some(Instant::now() + ttl)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> AppResult<ScanPage> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);

        let entries = self.entries.lock().unwrap();
        let keys: Vec<&String> = entries.keys().collect();
        let start = cursor as usize;
        let end = (start + count.max(1)).min(keys.len());

        let page = keys[start.min(keys.len())..end]
            .iter()
            .filter(|key| glob_match(pattern, key))
            .map(|key| key.to_string())
            .collect();
        let next = if end >= keys.len() { 0 } else { end as u64 };

        Ok(ScanPage {
            cursor: next,
            keys: page,
        })
    }
}

// ---------------------------------------------------------------------------
// 记录型 EmailSender，可配置前 N 次失败
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<MailJob>>,
    failures_left: AtomicU32,
    attempts: AtomicU32,
}

impl RecordingSender {
    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(times),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<MailJob> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send_html_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        _text_body: Option<&str>,
    ) -> AppResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(AppError::internal("smtp unavailable"));
        }

        self.sent.lock().unwrap().push(MailJob {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

pub struct StaticProbe(pub bool);

#[async_trait]
impl ReadinessProbe for StaticProbe {
    async fn check(&self) -> HealthStatus {
        let mut status = HealthStatus::new();
        status.add_check("postgres", self.0, None);
        status.add_check("redis", true, None);
        status
    }
}

// ---------------------------------------------------------------------------
// 测试应用
// ---------------------------------------------------------------------------

pub fn light_hasher() -> CredentialHasher {
    CredentialHasher::new(HasherParams {
        time_cost: 1,
        memory_cost: 1024,
        parallelism: 1,
        output_len: 32,
    })
    .unwrap()
}

pub fn registration_config() -> RegistrationConfig {
    RegistrationConfig {
        frontend_url: "http://localhost:3000".to_string(),
        activation_ttl_secs: 15 * 60,
        password_min_len: 6,
        password_max_len: 18,
        scan_page_size: 10,
        scan_max_pages: 100,
        call_timeout_secs: 5,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: Arc<InMemoryUsers>,
    pub refresh_tokens: Arc<InMemoryRefreshTokens>,
    pub cache: Arc<InMemoryCache>,
    pub clock: Arc<ManualClock>,
    pub tokens: Arc<TokenService>,
    pub mail_rx: mpsc::Receiver<MailJob>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_probe(true)
    }

    pub fn with_probe(ready: bool) -> Self {
        Self::build(ready, EmailTemplate::builtin().unwrap())
    }

    pub fn with_template(template: EmailTemplate) -> Self {
        Self::build(true, template)
    }

    fn build(ready: bool, template: EmailTemplate) -> Self {
        let users = Arc::new(InMemoryUsers::default());
        let refresh_tokens = Arc::new(InMemoryRefreshTokens::default());
        let cache = Arc::new(InMemoryCache::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tokens = Arc::new(
            TokenService::new(
                ACCESS_SECRET,
                REFRESH_SECRET,
                ACCESS_TTL_SECS,
                REFRESH_TTL_SECS,
                "passage",
            )
            .with_clock(clock.clone()),
        );
        let (mail, mail_rx) = MailQueue::new(16);

        let state = build_state(
            Dependencies {
                users: users.clone(),
                refresh_tokens: refresh_tokens.clone(),
                cache: cache.clone(),
                tokens: tokens.clone(),
                hasher: light_hasher(),
                template: Arc::new(template),
                mail,
                readiness: Arc::new(StaticProbe(ready)),
                metrics: None,
            },
            &registration_config(),
            Duration::from_secs(10),
        )
        .unwrap();

        Self {
            router: router(state.clone()),
            state,
            users,
            refresh_tokens,
            cache,
            clock,
            tokens,
            mail_rx,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// 取出已入队的邮件
    pub fn queued_mail(&mut self) -> Vec<MailJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.mail_rx.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    /// 唯一的待激活 token
    pub fn only_pending_token(&self) -> String {
        let tokens = self.cache.pending_tokens();
        assert_eq!(tokens.len(), 1, "expected exactly one pending registration");
        tokens[0].clone()
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Response<Body> {
        let body = serde_json::json!({
            "name": name,
            "email": email,
            "password": password,
            "confirmPassword": password,
        });
        self.send(json_request("POST", "/auth/signup", &body)).await
    }

    /// 注册并激活，返回激活响应体
    pub async fn activated_user(&self, name: &str, email: &str, password: &str) -> Value {
        let response = self.signup(name, email, password).await;
        assert_eq!(response.status(), 201);

        let token = self
            .cache
            .pending_tokens()
            .into_iter()
            .find(|t| {
                self.cache
                    .live(&format!("{}{}", PENDING_PREFIX, t))
                    .is_some_and(|v| v.contains(email))
            })
            .unwrap();

        let response = self.send(get(&format!("/auth/verify?token={}", token))).await;
        assert_eq!(response.status(), 200);
        body_json(response).await
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
