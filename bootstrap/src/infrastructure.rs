//! 基础设施资源管理
//!
//! 统一创建服务依赖的连接池与 TokenService，由 main 显式注入到各组件

use std::sync::Arc;
use std::time::Duration;

use passage_adapter_postgres::{PostgresConfig, check_connection, create_pool};
use passage_adapter_redis::{RedisCache, create_connection_manager};
use passage_auth_core::TokenService;
use passage_common::{RetryPolicy, with_retry};
use passage_config::AppConfig;
use passage_errors::AppResult;
use passage_telemetry::HealthStatus;
use redis::aio::ConnectionManager;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

/// 基础设施资源容器
pub struct Infrastructure {
    /// 应用配置
    config: AppConfig,
    /// PostgreSQL 连接池
    postgres_pool: PgPool,
    /// Redis 连接管理器
    redis_conn: ConnectionManager,
    /// Token 服务
    token_service: Arc<TokenService>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（带重试）
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let retry_policy = RetryPolicy::default();

        // 1. PostgreSQL
        let pg_config = PostgresConfig::new(config.database.url.expose_secret())
            .with_max_connections(config.database.max_connections)
            .with_connect_timeout(Duration::from_secs(config.database.connect_timeout_secs));
        let postgres_pool = with_retry(&retry_policy, "PostgreSQL connection", || {
            let cfg = pg_config.clone();
            async move { create_pool(&cfg).await }
        })
        .await?;

        // 2. Redis
        let redis_url = config.redis.url.clone();
        let redis_conn = with_retry(&retry_policy, "Redis connection", || {
            let url = redis_url.expose_secret().clone();
            async move { create_connection_manager(&url).await }
        })
        .await?;

        // 3. TokenService
        let token_service = Arc::new(TokenService::new(
            config.jwt.access_secret.expose_secret(),
            config.jwt.refresh_secret.expose_secret(),
            config.jwt.access_expires_in,
            config.jwt.refresh_expires_in,
            config.jwt.issuer.clone(),
        ));

        info!("Infrastructure initialized");

        Ok(Self {
            config,
            postgres_pool,
            redis_conn,
            token_service,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn postgres_pool(&self) -> PgPool {
        self.postgres_pool.clone()
    }

    pub fn redis_cache(&self) -> RedisCache {
        RedisCache::new(self.redis_conn.clone())
    }

    pub fn token_service(&self) -> Arc<TokenService> {
        self.token_service.clone()
    }

    /// 检查所有依赖
    pub async fn check_health(pool: &PgPool, redis: &RedisCache) -> HealthStatus {
        let mut status = HealthStatus::new();

        match check_connection(pool).await {
            Ok(()) => status.add_check("postgres", true, None),
            Err(e) => status.add_check("postgres", false, Some(e.to_string())),
        }

        let mut conn = redis.connection();
        match passage_adapter_redis::check_connection(&mut conn).await {
            Ok(()) => status.add_check("redis", true, None),
            Err(e) => status.add_check("redis", false, Some(e.to_string())),
        }

        status
    }
}
