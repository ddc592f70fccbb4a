//! 中间件与提取器

mod auth;
mod client;
mod role;

pub use auth::{AuthenticatedUser, NEW_ACCESS_TOKEN_HEADER, auth_middleware};
pub use client::{ClientContext, client_ip};
pub use role::{RequiredRoles, require_role};
