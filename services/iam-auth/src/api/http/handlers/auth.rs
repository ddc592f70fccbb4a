//! 注册、激活、登录与重发激活邮件

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use passage_auth_core::TokenPair;
use passage_errors::AppResult;

use crate::api::http::AppState;
use crate::api::http::dto::{
    AuthResponse, JsonBody, MessageResponse, ResendRequest, SigninRequest, SignupRequest,
    VerifyQuery,
};
use crate::api::http::middleware::ClientContext;
use crate::domain::User;

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> AppResult<Response> {
    state.registration.register(req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::success(
            "Please check your email to verify your account",
        )),
    )
        .into_response())
}

pub async fn verify(
    State(state): State<AppState>,
    ClientContext(client): ClientContext,
    Query(query): Query<VerifyQuery>,
) -> AppResult<Response> {
    let (user, pair) = state.registration.activate(&query.token, &client).await?;
    session_response(&state, &user, &pair)
}

pub async fn signin(
    State(state): State<AppState>,
    ClientContext(client): ClientContext,
    JsonBody(req): JsonBody<SigninRequest>,
) -> AppResult<Response> {
    let (user, pair) = state.auth.signin(&req.email, &req.password, &client).await?;
    session_response(&state, &user, &pair)
}

pub async fn resend_verification(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResendRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.registration.resend(&req.email).await?;

    Ok(Json(MessageResponse::success(
        "Verification email re-sent, please check your inbox",
    )))
}

/// 200 + 令牌对，刷新令牌同时写入 cookie
fn session_response(state: &AppState, user: &User, pair: &TokenPair) -> AppResult<Response> {
    let cookie = state
        .cookie
        .header_value(&pair.refresh_token, pair.refresh_claims.expires_at())?;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(AuthResponse::new(user, pair)),
    )
        .into_response())
}
