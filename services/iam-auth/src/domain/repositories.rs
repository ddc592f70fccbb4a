//! Repository trait

use async_trait::async_trait;
use passage_common::UserId;
use passage_errors::AppResult;

use super::entities::{RefreshTokenRecord, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>>;

    /// 根据邮箱查找用户
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// 检查邮箱是否存在
    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;

    /// 插入用户，邮箱冲突返回 `AppError::Duplicate("email")`
    async fn insert(&self, user: &User) -> AppResult<UserId>;
}

/// 刷新令牌审计记录，只追加
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn save(&self, record: &RefreshTokenRecord) -> AppResult<()>;

    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshTokenRecord>>;
}
