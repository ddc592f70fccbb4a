//! 健康检查、指标与兜底路由

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use passage_errors::ErrorBody;

use crate::api::http::AppState;
use crate::api::http::dto::MessageResponse;

pub async fn healthcheck() -> Json<MessageResponse> {
    Json(MessageResponse::success("API is healthy and running"))
}

/// 依赖存储的就绪状态，任一检查失败返回 503
pub async fn ready(State(state): State<AppState>) -> Response {
    let status = state.readiness.check().await;
    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status)).into_response()
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn fallback() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new("Route Error", "Route does not exist")),
    )
}
