//! 角色授权，须在 auth_middleware 之后执行

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use passage_auth_core::Role;
use passage_errors::AppError;
use tracing::warn;

use super::AuthenticatedUser;

/// 允许访问的角色集合
#[derive(Debug, Clone, Copy)]
pub struct RequiredRoles(pub &'static [Role]);

pub async fn require_role(
    State(RequiredRoles(allowed)): State<RequiredRoles>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::unauthorized("user not authenticated"))?;

    if !user.role.has_any(allowed) {
        warn!(user_id = %user.user_id, role = %user.role, "Role not permitted");
        return Err(AppError::forbidden("insufficient permissions for this resource"));
    }

    Ok(next.run(request).await)
}
