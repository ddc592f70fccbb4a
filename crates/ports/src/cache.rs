//! Cache trait 定义

use async_trait::async_trait;
use passage_errors::AppResult;
use std::time::Duration;

/// SCAN 的一页结果，`cursor == 0` 表示遍历结束
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub cursor: u64,
    pub keys: Vec<String>,
}

/// 缓存 trait
#[async_trait]
pub trait CachePort: Send + Sync {
    /// 获取缓存值
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 设置缓存值，`ttl` 到期后自动删除
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// 删除缓存
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// 按模式分页遍历 key
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> AppResult<ScanPage>;
}
