//! 数据库错误映射工具
//!
//! 提供统一的 SQLx 错误到 AppError 的转换

use passage_errors::AppError;
use sqlx::postgres::PgDatabaseError;

const UNIQUE_VIOLATION: &str = "23505";

/// 将 SQLx 错误转换为 AppError；唯一约束冲突映射为 Duplicate 并带上字段名
pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                let detail = db_err
                    .try_downcast_ref::<PgDatabaseError>()
                    .and_then(|pg| pg.detail());
                AppError::duplicate(duplicate_field(detail, db_err.constraint()))
            }
            Some(code) => AppError::database(format!("Database error ({}): {}", code, db_err)),
            None => AppError::database(db_err.to_string()),
        },
        sqlx::Error::PoolTimedOut => AppError::internal("Database connection pool timeout"),
        sqlx::Error::PoolClosed => AppError::internal("Database connection pool is closed"),
        _ => AppError::database(e.to_string()),
    }
}

/// 从 `Key (email)=(ada@x.com) already exists.` 或约束名 `users_email_key` 中取出字段名
pub fn duplicate_field(detail: Option<&str>, constraint: Option<&str>) -> String {
    if let Some(field) = detail
        .and_then(|d| d.strip_prefix("Key ("))
        .and_then(|rest| rest.split_once(")="))
        .map(|(field, _)| field)
        .filter(|field| !field.is_empty())
    {
        return field.to_string();
    }

    if let Some(field) = constraint.and_then(|c| {
        let trimmed = c.strip_suffix("_key")?;
        trimmed.rsplit_once('_').map(|(_, column)| column)
    }) {
        return field.to_string();
    }

    "unknown".to_string()
}
