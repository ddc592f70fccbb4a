//! 邮件客户端实现

use crate::{EmailConfig, EmailSender};
use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use passage_errors::{AppError, AppResult};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info};

/// 邮件消息
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// 邮件客户端
pub struct EmailClient {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailClient {
    /// 创建新的邮件客户端
    pub fn new(config: EmailConfig) -> AppResult<Self> {
        let transport = Self::build_transport(&config)?;
        Ok(Self { config, transport })
    }

    /// 构建 SMTP 传输
    fn build_transport(config: &EmailConfig) -> AppResult<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host).map_err(
                |e| AppError::internal(format!("Failed to create SMTP transport: {}", e)),
            )?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        // 本地开发的 SMTP 通常不需要认证
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().clone(),
            ));
        }

        Ok(builder.build())
    }

    /// 构建邮件消息
    fn build_message(&self, msg: &EmailMessage) -> AppResult<Message> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| AppError::internal(format!("Invalid from address: {}", e)))?;

        let to = msg
            .to
            .parse()
            .map_err(|e| AppError::validation(format!("Invalid to address: {}", e)))?;

        // HTML + 纯文本备用
        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_PLAIN)
                    .body(msg.text_body.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_HTML)
                    .body(msg.html_body.clone()),
            );

        Message::builder()
            .from(from)
            .to(to)
            .subject(&msg.subject)
            .multipart(body)
            .map_err(|e| AppError::internal(format!("Failed to build message: {}", e)))
    }
}

#[async_trait::async_trait]
impl EmailSender for EmailClient {
    async fn send_html_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: Option<&str>,
    ) -> AppResult<()> {
        debug!(to = %to, subject = %subject, "Sending HTML email");

        let msg = EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            text_body: text_body.unwrap_or_default().to_string(),
        };

        let message = self.build_message(&msg)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::internal(format!("Failed to send email: {}", e)))?;

        info!(to = %to, subject = %subject, "HTML email sent successfully");
        Ok(())
    }
}
