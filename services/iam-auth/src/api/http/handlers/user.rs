//! 当前用户

use axum::extract::State;
use axum::Json;
use passage_errors::AppResult;

use crate::api::http::AppState;
use crate::api::http::dto::UserResponse;
use crate::api::http::middleware::AuthenticatedUser;

pub async fn current_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> AppResult<Json<UserResponse>> {
    let user = state.auth.current_user(&caller.user_id).await?;
    Ok(Json(user.into()))
}
