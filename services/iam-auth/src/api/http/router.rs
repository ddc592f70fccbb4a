//! 路由装配

use std::any::Any;

use axum::Router;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use passage_auth_core::Role;
use passage_errors::AppError;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::api::http::AppState;
use crate::api::http::handlers::{auth, health, user};
use crate::api::http::middleware::{RequiredRoles, auth_middleware, require_role};

const MAX_BODY_BYTES: usize = 64 * 1024;

const ADMIN_ONLY: RequiredRoles = RequiredRoles(&[Role::Admin]);

/// 全部路由，同时挂载在根路径与 `/api/v1` 下
pub fn router(state: AppState) -> Router {
    let api = api_routes(state.clone());
    let request_timeout = state.request_timeout;

    Router::new()
        .merge(api.clone())
        .nest("/api/v1", api)
        .route("/metrics", get(health::metrics))
        .fallback(health::fallback)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/user/admin", get(user::current_user))
        .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, require_role));

    let protected = Router::new()
        .route("/user", get(user::current_user))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/verify", get(auth::verify))
        .route("/auth/signin", post(auth::signin))
        .route("/auth/resend", post(auth::resend_verification))
        .route("/healthcheck", get(health::healthcheck))
        .route("/ready", get(health::ready))
        .merge(protected)
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Handler panicked");

    AppError::internal(format!("panic: {}", detail)).into_response()
}
