//! Email 适配器
//!
//! 提供邮件发送功能，支持：
//! - SMTP 邮件发送
//! - 模板渲染

mod client;
mod template;

pub use client::{EmailClient, EmailMessage};
pub use passage_config::EmailConfig;
pub use template::{ACTIVATION_SUBJECT, EmailTemplate};

use passage_errors::AppResult;

/// 邮件发送接口
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    /// 发送 HTML 邮件
    async fn send_html_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: Option<&str>,
    ) -> AppResult<()>;
}
