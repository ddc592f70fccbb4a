//! 登录与当前用户

use std::sync::Arc;
use std::time::Duration;

use passage_auth_core::{CredentialHasher, TokenPair};
use passage_common::{ClientInfo, UserId};
use passage_errors::{AppError, AppResult};
use passage_ports::within;
use tracing::info;

use crate::application::SessionService;
use crate::domain::validation::normalize_email;
use crate::domain::{User, UserRepository};

/// 用户不存在与密码错误返回同一条信息
pub const INVALID_CREDENTIALS: &str = "invalid email or password";

/// 用户不存在时用于比对的口令，使两条失败路径都付出一次哈希校验
const DUMMY_PASSWORD: &str = "passage-dummy-password";

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: CredentialHasher,
    sessions: Arc<SessionService>,
    call_timeout: Duration,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: CredentialHasher,
        sessions: Arc<SessionService>,
        call_timeout: Duration,
    ) -> AppResult<Self> {
        let dummy_hash = dummy_hash(&hasher)?;

        Ok(Self {
            users,
            hasher,
            sessions,
            call_timeout,
            dummy_hash,
        })
    }

    pub async fn signin(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> AppResult<(User, TokenPair)> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation("email and password are required"));
        }

        let user = within(
            self.call_timeout,
            "users.find_by_email",
            self.users.find_by_email(&email),
        )
        .await?;

        let Some(user) = user else {
            self.verify_blocking(password, &self.dummy_hash).await?;
            metrics::counter!("auth_signins_total", "result" => "failure").increment(1);
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !self.verify_blocking(password, &user.password_hash).await? {
            metrics::counter!("auth_signins_total", "result" => "failure").increment(1);
            info!(user_id = %user.id, "Signin rejected");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        let pair = self.sessions.issue_pair(&user.id, user.role, client).await?;

        metrics::counter!("auth_signins_total", "result" => "success").increment(1);
        info!(user_id = %user.id, ip = %client.ip_address, "Signin succeeded");
        Ok((user, pair))
    }

    pub async fn current_user(&self, user_id: &UserId) -> AppResult<User> {
        within(
            self.call_timeout,
            "users.find_by_id",
            self.users.find_by_id(user_id),
        )
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
    }

    async fn verify_blocking(&self, password: &str, hash: &str) -> AppResult<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Task join error: {}", e)))
    }
}

/// 与真实用户相同参数的占位哈希
fn dummy_hash(hasher: &CredentialHasher) -> AppResult<String> {
    hasher.hash(DUMMY_PASSWORD)
}
