//! 应用装配
//!
//! main 与集成测试共用：存储实现由调用方注入，这里只负责组装服务与路由状态。

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use passage_adapter_email::EmailTemplate;
use passage_auth_core::{CredentialHasher, TokenService};
use passage_config::RegistrationConfig;
use passage_errors::AppResult;
use passage_ports::CachePort;

use crate::api::http::AppState;
use crate::api::http::cookie::RefreshCookie;
use crate::application::{
    AuthService, MailQueue, RegistrationService, RegistrationSettings, SessionService,
};
use crate::domain::validation::PasswordPolicy;
use crate::domain::{RefreshTokenRepository, UserRepository};
use crate::infrastructure::cache::PendingRegistrationStore;
use crate::infrastructure::health::ReadinessProbe;

/// 服务依赖
pub struct Dependencies {
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub cache: Arc<dyn CachePort>,
    pub tokens: Arc<TokenService>,
    pub hasher: CredentialHasher,
    pub template: Arc<EmailTemplate>,
    pub mail: MailQueue,
    pub readiness: Arc<dyn ReadinessProbe>,
    pub metrics: Option<PrometheusHandle>,
}

pub fn build_state(
    deps: Dependencies,
    registration: &RegistrationConfig,
    request_timeout: Duration,
) -> AppResult<AppState> {
    let call_timeout = Duration::from_secs(registration.call_timeout_secs);
    let refresh_max_age = deps.tokens.refresh_expires_in().num_seconds();

    let sessions = Arc::new(SessionService::new(
        deps.tokens,
        deps.refresh_tokens,
        call_timeout,
    ));

    let pending = PendingRegistrationStore::new(
        deps.cache,
        registration.scan_page_size,
        registration.scan_max_pages,
        call_timeout,
    );

    let settings = RegistrationSettings {
        frontend_url: registration.frontend_url.clone(),
        activation_ttl: Duration::from_secs(registration.activation_ttl_secs),
        password_policy: PasswordPolicy {
            min_len: registration.password_min_len,
            max_len: registration.password_max_len,
        },
        call_timeout,
    };

    let registration_service = Arc::new(RegistrationService::new(
        deps.users.clone(),
        pending,
        deps.hasher.clone(),
        deps.template,
        deps.mail,
        sessions.clone(),
        settings,
    ));

    let auth = Arc::new(AuthService::new(
        deps.users,
        deps.hasher,
        sessions.clone(),
        call_timeout,
    )?);

    Ok(AppState {
        registration: registration_service,
        auth,
        sessions,
        cookie: RefreshCookie::for_frontend(&registration.frontend_url, refresh_max_age),
        readiness: deps.readiness,
        metrics: deps.metrics,
        request_timeout,
    })
}
