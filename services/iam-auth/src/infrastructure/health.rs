//! 就绪检查

use async_trait::async_trait;
use passage_adapter_redis::RedisCache;
use passage_bootstrap::Infrastructure;
use passage_telemetry::HealthStatus;
use sqlx::PgPool;

#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn check(&self) -> HealthStatus;
}

/// 检查 PostgreSQL 与 Redis
pub struct StoreProbe {
    pool: PgPool,
    redis: RedisCache,
}

impl StoreProbe {
    pub fn new(pool: PgPool, redis: RedisCache) -> Self {
        Self { pool, redis }
    }
}

#[async_trait]
impl ReadinessProbe for StoreProbe {
    async fn check(&self) -> HealthStatus {
        Infrastructure::check_health(&self.pool, &self.redis).await
    }
}
