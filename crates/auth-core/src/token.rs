//! 访问令牌与刷新令牌
//!
//! access 与 refresh 使用不同密钥签名；过期时间由注入的 [`Clock`] 判断，不允许偏差。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use passage_common::UserId;
use passage_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Clock, Role, SystemClock};

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

/// 访问令牌 Claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub role: Role,
    pub ip: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub iss: String,
    pub token_type: String,
}

/// 刷新令牌 Claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: String,
    pub role: Role,
    pub ip: String,
    pub user_agent: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub iss: String,
    pub token_type: String,
}

impl AccessClaims {
    pub fn user_id(&self) -> AppResult<UserId> {
        parse_subject(&self.sub)
    }
}

impl RefreshClaims {
    pub fn user_id(&self) -> AppResult<UserId> {
        parse_subject(&self.sub)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

fn parse_subject(sub: &str) -> AppResult<UserId> {
    Uuid::parse_str(sub)
        .map(UserId::from_uuid)
        .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
}

trait TypedClaims {
    fn token_type(&self) -> &str;
    fn exp(&self) -> i64;
}

impl TypedClaims for AccessClaims {
    fn token_type(&self) -> &str {
        &self.token_type
    }
    fn exp(&self) -> i64 {
        self.exp
    }
}

impl TypedClaims for RefreshClaims {
    fn token_type(&self) -> &str {
        &self.token_type
    }
    fn exp(&self) -> i64 {
        self.exp
    }
}

/// 一次签发的令牌对
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_claims: AccessClaims,
    pub refresh_claims: RefreshClaims,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Token 服务
#[derive(Clone)]
pub struct TokenService {
    access_keys: Arc<Keys>,
    refresh_keys: Arc<Keys>,
    access_expires_in: Duration,
    refresh_expires_in: Duration,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_expires_in_secs: i64,
        refresh_expires_in_secs: i64,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            access_keys: Arc::new(Keys::from_secret(access_secret)),
            refresh_keys: Arc::new(Keys::from_secret(refresh_secret)),
            access_expires_in: Duration::seconds(access_expires_in_secs),
            refresh_expires_in: Duration::seconds(refresh_expires_in_secs),
            issuer: issuer.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// 替换时钟
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn access_expires_in(&self) -> Duration {
        self.access_expires_in
    }

    pub fn refresh_expires_in(&self) -> Duration {
        self.refresh_expires_in
    }

    /// 签发令牌对
    pub fn issue_pair(
        &self,
        user_id: &UserId,
        role: Role,
        ip: &str,
        user_agent: &str,
    ) -> AppResult<TokenPair> {
        let now = self.clock.now();

        let access_claims = AccessClaims {
            sub: user_id.to_string(),
            role,
            ip: ip.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_expires_in).timestamp(),
            jti: Uuid::now_v7().to_string(),
            iss: self.issuer.clone(),
            token_type: ACCESS.to_string(),
        };
        let refresh_claims = RefreshClaims {
            sub: user_id.to_string(),
            role,
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh_expires_in).timestamp(),
            jti: Uuid::now_v7().to_string(),
            iss: self.issuer.clone(),
            token_type: REFRESH.to_string(),
        };

        let access_token = encode(&Header::default(), &access_claims, &self.access_keys.encoding)
            .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;
        let refresh_token =
            encode(&Header::default(), &refresh_claims, &self.refresh_keys.encoding).map_err(
                |e| AppError::internal(format!("Failed to generate refresh token: {}", e)),
            )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_claims,
            refresh_claims,
        })
    }

    /// 验证访问令牌，不访问存储
    pub fn verify_access(&self, token: &str) -> AppResult<AccessClaims> {
        self.decode_typed(token, &self.access_keys, ACCESS)
    }

    /// 验证刷新令牌，只检查签名与过期
    pub fn validate_refresh(&self, token: &str) -> AppResult<RefreshClaims> {
        self.decode_typed(token, &self.refresh_keys, REFRESH)
    }

    /// 用刷新令牌换一对新令牌；旧刷新令牌不作废
    pub fn rotate(
        &self,
        refresh_token: &str,
        user_id: &UserId,
        ip: &str,
        user_agent: &str,
    ) -> AppResult<TokenPair> {
        let claims = self
            .validate_refresh(refresh_token)
            .map_err(|_| AppError::unauthorized("invalid refresh token"))?;

        if claims.user_id()? != *user_id {
            return Err(AppError::unauthorized("refresh token does not belong to user"));
        }

        self.issue_pair(user_id, claims.role, ip, user_agent)
    }

    fn decode_typed<C>(&self, token: &str, keys: &Keys, expected_type: &str) -> AppResult<C>
    where
        C: DeserializeOwned + TypedClaims,
    {
        // exp 由注入的时钟判断，这里只验签名与 issuer
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let claims = decode::<C>(token, &keys.decoding, &validation)
            .map_err(|e| AppError::unauthorized(format!("Invalid token: {}", e)))?
            .claims;

        if claims.token_type() != expected_type {
            return Err(AppError::unauthorized(format!("Not an {} token", expected_type)));
        }

        if claims.exp() <= self.clock.now().timestamp() {
            return Err(AppError::unauthorized("Token expired"));
        }

        Ok(claims)
    }
}
