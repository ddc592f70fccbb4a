//! 请求与响应体

use axum::extract::{FromRequest, Json, Request, rejection::JsonRejection};
use passage_auth_core::TokenPair;
use passage_errors::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::User;
use crate::domain::validation::SignupInput;

/// JSON 请求体，解析失败统一返回 400
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            debug!(error = %e, "Rejected request body");
            AppError::validation("Invalid JSON body")
        })?;
        Ok(Self(value))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
    pub role: Option<String>,
}

impl From<SignupRequest> for SignupInput {
    fn from(req: SignupRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
            confirm_password: req.confirm_password,
            role: req.role,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResendRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub title: String,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            title: "Success".to_string(),
            message: message.into(),
        }
    }
}

/// 激活与登录的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub title: String,
    pub data: AuthData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthData {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    pub fn new(user: &User, pair: &TokenPair) -> Self {
        Self {
            title: "Success".to_string(),
            data: AuthData {
                id: user.id.to_string(),
                name: user.name.clone(),
                email: user.email.clone(),
                role: user.role.to_string(),
                access_token: pair.access_token.clone(),
                refresh_token: pair.refresh_token.clone(),
            },
        }
    }
}

/// 当前用户
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            address: user.address,
            role: user.role.to_string(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}
