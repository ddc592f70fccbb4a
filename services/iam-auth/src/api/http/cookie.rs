//! refresh_token cookie

use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
use chrono::{DateTime, Utc};
use passage_errors::{AppError, AppResult};

pub const REFRESH_COOKIE: &str = "refresh_token";

/// cookie 属性：HttpOnly、Path=/、SameSite=Lax，前端为 https 时带 Secure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshCookie {
    pub secure: bool,
    pub max_age_secs: i64,
}

impl RefreshCookie {
    pub fn for_frontend(frontend_url: &str, max_age_secs: i64) -> Self {
        Self {
            secure: frontend_url.starts_with("https"),
            max_age_secs,
        }
    }

    /// `Set-Cookie` 头的值
    pub fn header_value(&self, token: &str, expires_at: DateTime<Utc>) -> AppResult<HeaderValue> {
        let mut cookie = format!(
            "{}={}; Path=/; Expires={}; Max-Age={}; HttpOnly; SameSite=Lax",
            REFRESH_COOKIE,
            token,
            expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::internal(format!("Invalid cookie value: {}", e)))
    }
}

/// 从请求的 Cookie 头中读取指定 cookie
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
