//! IAM Auth Service - 注册激活与会话服务入口

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use iam_auth::api::http::router;
use iam_auth::app::{Dependencies, build_state};
use iam_auth::application::{MailQueue, spawn_mail_worker};
use iam_auth::domain::{RefreshTokenRepository, UserRepository};
use iam_auth::infrastructure::health::{ReadinessProbe, StoreProbe};
use iam_auth::infrastructure::persistence::{
    PostgresRefreshTokenRepository, PostgresUserRepository,
};
use passage_adapter_email::{EmailClient, EmailSender, EmailTemplate};
use passage_auth_core::{CredentialHasher, HasherParams};
use passage_bootstrap::{Infrastructure, init_runtime, shutdown_signal};
use passage_common::RetryPolicy;
use passage_config::AppConfig;
use passage_ports::CachePort;
use passage_telemetry::init_metrics;
use tracing::{info, warn};

/// 关闭时等待邮件队列清空的上限
const MAIL_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir).context("failed to load configuration")?;
    init_runtime(&config);

    let metrics = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    };

    let infra = Infrastructure::from_config(config)
        .await
        .context("failed to initialize infrastructure")?;
    let config = infra.config().clone();
    let pool = infra.postgres_pool();

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("Database migrations applied");

    // 邮件队列与后台 worker
    let email_sender: Arc<dyn EmailSender> =
        Arc::new(EmailClient::new(config.email.clone()).context("invalid email configuration")?);
    let (mail, mail_rx) = MailQueue::new(config.mail_queue.capacity);
    let mail_policy = RetryPolicy::new(
        config.mail_queue.max_attempts,
        Duration::from_millis(config.mail_queue.initial_delay_ms),
        Duration::from_millis(config.mail_queue.max_delay_ms),
    );
    let mail_worker = spawn_mail_worker(mail_rx, email_sender, mail_policy);

    // 组装 Repositories 与缓存
    let users: Arc<dyn UserRepository> = Arc::new(PostgresUserRepository::new(pool.clone()));
    let refresh_tokens: Arc<dyn RefreshTokenRepository> =
        Arc::new(PostgresRefreshTokenRepository::new(pool.clone()));
    let cache: Arc<dyn CachePort> = Arc::new(infra.redis_cache());
    let readiness: Arc<dyn ReadinessProbe> =
        Arc::new(StoreProbe::new(pool.clone(), infra.redis_cache()));

    let state = build_state(
        Dependencies {
            users,
            refresh_tokens,
            cache,
            tokens: infra.token_service(),
            hasher: CredentialHasher::new(HasherParams::default())?,
            template: Arc::new(EmailTemplate::builtin()?),
            mail,
            readiness,
            metrics,
        },
        &config.registration,
        Duration::from_secs(config.server.request_timeout_secs),
    )?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "IAM Auth service listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    // 路由释放后发送端全部关闭，worker 发完剩余邮件后退出
    if tokio::time::timeout(MAIL_DRAIN_TIMEOUT, mail_worker)
        .await
        .is_err()
    {
        warn!("Mail queue not drained before shutdown timeout");
    }

    info!("IAM Auth service stopped");
    Ok(())
}
