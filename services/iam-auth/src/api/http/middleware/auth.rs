//! 认证中间件
//!
//! 访问令牌有效时直接放行；失效时用 `refresh_token` cookie 静默换发新令牌对，
//! 新访问令牌写入 `X-New-Access-Token` 响应头，新刷新令牌写入 cookie。

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use passage_auth_core::Role;
use passage_common::UserId;
use passage_errors::{AppError, AppResult};
use tracing::{debug, warn};

use super::client::client_info;
use crate::api::http::AppState;
use crate::api::http::cookie::{REFRESH_COOKIE, read_cookie};

pub const NEW_ACCESS_TOKEN_HEADER: &str = "x-new-access-token";

/// 已认证的调用方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub role: Role,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("user not authenticated"))
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| AppError::unauthorized("authorization header required"))?;

    let access_token = bearer_token(&header)
        .ok_or_else(|| AppError::unauthorized("invalid authorization header format"))?;

    match authenticate(&state, access_token) {
        Ok(user) => {
            debug!(user_id = %user.user_id, "Access token accepted");
            request.extensions_mut().insert(user);
            return Ok(next.run(request).await);
        }
        Err(e) => debug!(error = %e, "Access token rejected, trying refresh"),
    }

    let refresh_token = read_cookie(request.headers(), REFRESH_COOKIE)
        .ok_or_else(|| AppError::unauthorized("refresh token missing; please login again"))?;

    let claims = state
        .sessions
        .validate_refresh(&refresh_token)
        .inspect_err(|e| warn!(error = %e, "Refresh token rejected"))
        .map_err(|_| AppError::unauthorized("invalid refresh token; please login again"))?;
    let user_id = claims
        .user_id()
        .map_err(|_| AppError::unauthorized("invalid refresh token; please login again"))?;

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_info(request.headers(), peer);

    let pair = state
        .sessions
        .rotate(&refresh_token, &user_id, &client)
        .await
        .map_err(|e| {
            if e.is_server_error() {
                e
            } else {
                warn!(user_id = %user_id, error = %e, "Refresh rotation rejected");
                AppError::unauthorized("refresh token invalid or revoked; please login again")
            }
        })?;

    let bearer = HeaderValue::from_str(&format!("Bearer {}", pair.access_token))
        .map_err(|e| AppError::internal(format!("Invalid access token header: {}", e)))?;
    let new_access = HeaderValue::from_str(&pair.access_token)
        .map_err(|e| AppError::internal(format!("Invalid access token header: {}", e)))?;
    let cookie = state
        .cookie
        .header_value(&pair.refresh_token, pair.refresh_claims.expires_at())?;

    request.headers_mut().insert(AUTHORIZATION, bearer);
    request.extensions_mut().insert(AuthenticatedUser {
        user_id,
        role: pair.access_claims.role,
    });

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.append(SET_COOKIE, cookie);
    headers.insert(NEW_ACCESS_TOKEN_HEADER, new_access);
    Ok(response)
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme == "Bearer" && !token.is_empty() && !token.contains(' ')).then_some(token)
}

fn authenticate(state: &AppState, token: &str) -> AppResult<AuthenticatedUser> {
    let claims = state.sessions.verify_access(token)?;
    Ok(AuthenticatedUser {
        user_id: claims.user_id()?,
        role: claims.role,
    })
}
