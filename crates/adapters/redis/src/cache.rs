//! Redis Cache 实现

use async_trait::async_trait;
use passage_errors::{AppError, AppResult};
use passage_ports::{CachePort, ScanPage};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Redis Cache
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// 底层连接（健康检查用）
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl CachePort for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| AppError::internal(format!("Redis get failed: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl.as_secs())
            .await
            .map_err(|e| AppError::internal(format!("Redis set failed: {}", e)))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del(key)
            .await
            .map_err(|e| AppError::internal(format!("Redis delete failed: {}", e)))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> AppResult<ScanPage> {
        let mut conn = self.conn.clone();

        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::internal(format!("Redis scan failed: {}", e)))?;

        Ok(ScanPage { cursor, keys })
    }
}
