//! passage-errors - 统一错误处理
//!
//! 错误在检测点完成分类，原样传递到 HTTP 边界后渲染为
//! `{title, message, messages?}`。5xx 只返回通用文案，细节仅记录在服务端日志。

mod response;

pub use response::ErrorBody;

use thiserror::Error;

/// 返回给客户端的 5xx 通用文案
pub const INTERNAL_MESSAGE: &str = "Something went wrong, try again later";

/// 应用错误类型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// 一个或多个字段校验失败
    #[error("Validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// 唯一约束冲突，携带字段名
    #[error("Duplicate value for field: {0}")]
    Duplicate(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    /// 聚合多条字段校验信息
    pub fn validations<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation(messages.into_iter().map(Into::into).collect())
    }

    pub fn duplicate(field: impl Into<String>) -> Self {
        Self::Duplicate(field.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Duplicate(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
            Self::Database(_) => 500,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Duplicate(_) => "Duplicate Value",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "Not Found",
            Self::Internal(_) | Self::Database(_) => "Internal Server Error",
        }
    }

    /// 面向客户端的文案
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(messages) => messages.join("; "),
            Self::Duplicate(field) => format!(
                "Duplicate value entered for {} field, please choose another value",
                field
            ),
            Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Internal(_) | Self::Database(_) => INTERNAL_MESSAGE.to_string(),
        }
    }

    /// 多条校验信息（仅 Validation 且多于一条时有值）
    pub fn public_messages(&self) -> Vec<String> {
        match self {
            Self::Validation(messages) if messages.len() > 1 => messages.clone(),
            _ => Vec::new(),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            title: self.title().to_string(),
            message: self.public_message(),
            messages: self.public_messages(),
        }
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
