//! HTTP 接口

pub mod cookie;
pub mod dto;
pub mod handlers;
pub mod middleware;
mod router;
pub mod state;

pub use router::router;
pub use state::AppState;
