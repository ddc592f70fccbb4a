//! 会话：签发、验证与轮换令牌对
//!
//! 每次签发都追加一条刷新令牌审计记录。轮换不会作废旧的刷新令牌，
//! 验证也不查询审计表。

use std::sync::Arc;
use std::time::Duration;

use passage_auth_core::{AccessClaims, RefreshClaims, Role, TokenPair, TokenService};
use passage_common::{ClientInfo, UserId, new_id};
use passage_errors::AppResult;
use passage_ports::within;
use tracing::{debug, info};

use crate::domain::{RefreshTokenRecord, RefreshTokenRepository};

pub struct SessionService {
    tokens: Arc<TokenService>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    call_timeout: Duration,
}

impl SessionService {
    pub fn new(
        tokens: Arc<TokenService>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            refresh_tokens,
            call_timeout,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// 签发令牌对并写入审计记录
    pub async fn issue_pair(
        &self,
        user_id: &UserId,
        role: Role,
        client: &ClientInfo,
    ) -> AppResult<TokenPair> {
        let pair = self
            .tokens
            .issue_pair(user_id, role, &client.ip_address, &client.user_agent)?;
        self.record(user_id, &pair, client).await?;

        debug!(user_id = %user_id, role = %role, "Token pair issued");
        Ok(pair)
    }

    /// 无状态验证访问令牌
    pub fn verify_access(&self, token: &str) -> AppResult<AccessClaims> {
        self.tokens.verify_access(token)
    }

    pub fn validate_refresh(&self, token: &str) -> AppResult<RefreshClaims> {
        self.tokens.validate_refresh(token)
    }

    /// 用刷新令牌换新令牌对
    pub async fn rotate(
        &self,
        refresh_token: &str,
        user_id: &UserId,
        client: &ClientInfo,
    ) -> AppResult<TokenPair> {
        let pair = self.tokens.rotate(
            refresh_token,
            user_id,
            &client.ip_address,
            &client.user_agent,
        )?;
        self.record(user_id, &pair, client).await?;

        metrics::counter!("auth_token_rotations_total").increment(1);
        info!(user_id = %user_id, ip = %client.ip_address, "Access token rotated");
        Ok(pair)
    }

    async fn record(&self, user_id: &UserId, pair: &TokenPair, client: &ClientInfo) -> AppResult<()> {
        let record = RefreshTokenRecord {
            id: new_id(),
            user_id: user_id.clone(),
            token: pair.refresh_token.clone(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            expires_at: pair.refresh_claims.expires_at(),
            created_at: self.tokens.now(),
        };

        within(
            self.call_timeout,
            "refresh_tokens.save",
            self.refresh_tokens.save(&record),
        )
        .await
    }
}
