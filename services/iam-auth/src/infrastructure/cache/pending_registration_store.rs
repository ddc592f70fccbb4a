//! 待激活注册存储
//!
//! 记录以 `verify:<token>` 为 key 存入缓存并带 TTL。缓存没有按邮箱的二级索引，
//! `find_by_email` 用 SCAN 分页遍历，最多扫描 `max_pages` 页。

use std::sync::Arc;
use std::time::Duration;

use passage_errors::{AppError, AppResult};
use passage_ports::{CachePort, within};
use tracing::{debug, warn};

use crate::domain::PendingRegistration;

pub const PENDING_PREFIX: &str = "verify:";

#[derive(Clone)]
pub struct PendingRegistrationStore {
    cache: Arc<dyn CachePort>,
    page_size: usize,
    max_pages: usize,
    call_timeout: Duration,
}

impl PendingRegistrationStore {
    pub fn new(
        cache: Arc<dyn CachePort>,
        page_size: usize,
        max_pages: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            page_size,
            max_pages,
            call_timeout,
        }
    }

    fn key(token: &str) -> String {
        format!("{}{}", PENDING_PREFIX, token)
    }

    pub async fn put(
        &self,
        token: &str,
        record: &PendingRegistration,
        ttl: Duration,
    ) -> AppResult<()> {
        let value = serde_json::to_string(record)
            .map_err(|e| AppError::internal(format!("Failed to encode pending record: {}", e)))?;

        within(
            self.call_timeout,
            "pending.put",
            self.cache.set(&Self::key(token), &value, ttl),
        )
        .await
    }

    /// 过期与不存在同样返回 None；无法解码的记录会被删除
    pub async fn get(&self, token: &str) -> AppResult<Option<PendingRegistration>> {
        let key = Self::key(token);
        let Some(value) = within(self.call_timeout, "pending.get", self.cache.get(&key)).await?
        else {
            return Ok(None);
        };

        match serde_json::from_str(&value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                if let Err(del) = self.delete(token).await {
                    warn!(error = %del, "Failed to delete corrupt pending record");
                }
                Err(AppError::internal(format!("Corrupt pending record: {}", e)))
            }
        }
    }

    pub async fn delete(&self, token: &str) -> AppResult<()> {
        within(
            self.call_timeout,
            "pending.delete",
            self.cache.delete(&Self::key(token)),
        )
        .await
    }

    /// 按邮箱查找激活 token
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<String>> {
        let pattern = format!("{}*", PENDING_PREFIX);
        let mut cursor = 0;

        for _ in 0..self.max_pages {
            let page = within(
                self.call_timeout,
                "pending.scan",
                self.cache.scan(cursor, &pattern, self.page_size),
            )
            .await?;

            for key in &page.keys {
                let Some(token) = key.strip_prefix(PENDING_PREFIX) else {
                    continue;
                };

                // 扫描期间 key 可能已过期
                let Some(value) =
                    within(self.call_timeout, "pending.get", self.cache.get(key)).await?
                else {
                    continue;
                };

                match serde_json::from_str::<PendingRegistration>(&value) {
                    Ok(record) if record.email == email => return Ok(Some(token.to_string())),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Skipping corrupt pending record"),
                }
            }

            cursor = page.cursor;
            if cursor == 0 {
                return Ok(None);
            }
        }

        warn!(max_pages = self.max_pages, "Pending registration scan hit page limit");
        debug!(email = %email, "Email not found within scan limit");
        Ok(None)
    }
}
