//! iam-auth - 注册激活、登录与会话服务

pub mod api;
pub mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
