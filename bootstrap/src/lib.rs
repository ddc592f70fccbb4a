//! passage-bootstrap - 统一服务启动骨架
//!
//! 日志初始化、基础设施创建与关闭信号

mod infrastructure;
mod runtime;

pub use infrastructure::*;
pub use runtime::*;
