//! 外部调用的超时包装

use std::future::Future;
use std::time::Duration;

use passage_errors::{AppError, AppResult};
use tracing::warn;

/// 在 `timeout` 内完成 `fut`，超时视为 Internal
pub async fn within<T, F>(timeout: Duration, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = timeout.as_millis() as u64, "Operation timed out");
            Err(AppError::internal(format!(
                "{} timed out after {:?}",
                operation, timeout
            )))
        }
    }
}
