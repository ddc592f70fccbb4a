//! 实体

use chrono::{DateTime, Utc};
use passage_auth_core::Role;
use passage_common::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 已激活的用户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 由待激活注册生成，密码哈希原样沿用
    pub fn from_pending(pending: PendingRegistration, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::from_uuid(pending.id),
            name: pending.name,
            email: pending.email,
            password_hash: pending.password_hash,
            address: None,
            role: pending.role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 待激活注册，存于 Redis `verify:<token>`，过期即消失
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    pub role: Role,
}

/// 刷新令牌审计记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub token: String,
    pub ip_address: String,
    pub user_agent: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
