//! 注册、激活与重发激活邮件
//!
//! 注册只写入待激活记录，用户在激活时才落库。

use std::sync::Arc;
use std::time::Duration;

use passage_adapter_email::{ACTIVATION_SUBJECT, EmailTemplate};
use passage_auth_core::{CredentialHasher, TokenPair};
use passage_common::{ClientInfo, new_id, random_token};
use passage_errors::{AppError, AppResult};
use passage_ports::within;
use tracing::{info, warn};

use crate::application::{MailJob, MailQueue, SessionService};
use crate::domain::validation::{PasswordPolicy, SignupInput, normalize_email, validate_signup};
use crate::domain::{PendingRegistration, User, UserRepository};
use crate::infrastructure::cache::PendingRegistrationStore;

/// 激活 token 的熵（字节）
const ACTIVATION_TOKEN_BYTES: usize = 32;

pub const INVALID_ACTIVATION_TOKEN: &str = "invalid or expired token";

/// 注册流程参数
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    pub frontend_url: String,
    pub activation_ttl: Duration,
    pub password_policy: PasswordPolicy,
    pub call_timeout: Duration,
}

pub struct RegistrationService {
    users: Arc<dyn UserRepository>,
    pending: PendingRegistrationStore,
    hasher: CredentialHasher,
    template: Arc<EmailTemplate>,
    mail: MailQueue,
    sessions: Arc<SessionService>,
    settings: RegistrationSettings,
}

impl RegistrationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        pending: PendingRegistrationStore,
        hasher: CredentialHasher,
        template: Arc<EmailTemplate>,
        mail: MailQueue,
        sessions: Arc<SessionService>,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            users,
            pending,
            hasher,
            template,
            mail,
            sessions,
            settings,
        }
    }

    /// 提交注册：校验、查重、写入待激活记录并投递激活邮件
    pub async fn register(&self, input: SignupInput) -> AppResult<()> {
        let signup = validate_signup(&input, self.settings.password_policy)?;

        let exists = within(
            self.settings.call_timeout,
            "users.exists_by_email",
            self.users.exists_by_email(&signup.email),
        )
        .await?;
        if exists {
            return Err(AppError::duplicate("email"));
        }

        let password_hash = hash_blocking(&self.hasher, signup.password).await?;
        let token = random_token(ACTIVATION_TOKEN_BYTES);
        let pending = PendingRegistration {
            id: new_id(),
            name: signup.name,
            email: signup.email,
            password_hash,
            role: signup.role,
        };

        // 先渲染邮件，渲染失败时不留下孤立的待激活记录
        let job = self.activation_mail(&pending, &token)?;

        self.pending
            .put(&token, &pending, self.settings.activation_ttl)
            .await?;

        self.mail.enqueue(job);

        metrics::counter!("auth_signups_total").increment(1);
        info!(pending_id = %pending.id, email = %pending.email, "Registration pending verification");
        Ok(())
    }

    /// 激活：消费待激活记录、写入用户并签发令牌对
    pub async fn activate(&self, token: &str, client: &ClientInfo) -> AppResult<(User, TokenPair)> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::validation(INVALID_ACTIVATION_TOKEN));
        }

        let pending = self
            .pending
            .get(token)
            .await?
            .ok_or_else(|| AppError::validation(INVALID_ACTIVATION_TOKEN))?;

        let user = User::from_pending(pending, self.sessions.tokens().now());
        let inserted = within(
            self.settings.call_timeout,
            "users.insert",
            self.users.insert(&user),
        )
        .await;

        // 邮箱已落库说明该 token 已被消费过
        if matches!(inserted, Err(AppError::Duplicate(_))) {
            if let Err(e) = self.pending.delete(token).await {
                warn!(email = %user.email, error = %e, "Failed to delete stale pending record");
            }
            return Err(AppError::validation(INVALID_ACTIVATION_TOKEN));
        }
        inserted?;

        if let Err(e) = self.pending.delete(token).await {
            warn!(user_id = %user.id, error = %e, "Failed to delete consumed pending record");
        }

        let pair = self.sessions.issue_pair(&user.id, user.role, client).await?;

        metrics::counter!("auth_activations_total").increment(1);
        info!(user_id = %user.id, email = %user.email, "Account activated");
        Ok((user, pair))
    }

    /// 重发激活邮件，沿用原 token
    pub async fn resend(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::validation("email is required"));
        }

        let activated = within(
            self.settings.call_timeout,
            "users.exists_by_email",
            self.users.exists_by_email(&email),
        )
        .await?;
        if activated {
            return Err(AppError::validation("account already activated"));
        }

        let token = self
            .pending
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::validation("verification token not found or expired"))?;

        let pending = self
            .pending
            .get(&token)
            .await?
            .ok_or_else(|| AppError::validation("verification token not found or expired"))?;

        self.mail.enqueue(self.activation_mail(&pending, &token)?);

        info!(email = %email, "Activation email re-sent");
        Ok(())
    }

    /// 激活链接
    pub fn activation_url(&self, token: &str) -> String {
        format!(
            "{}/api/v1/auth/verify?token={}",
            self.settings.frontend_url.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }

    fn activation_mail(&self, pending: &PendingRegistration, token: &str) -> AppResult<MailJob> {
        let html = self.template.render_activation(
            &pending.name,
            &self.activation_url(token),
            self.settings.activation_ttl.as_secs() / 60,
        )?;

        Ok(MailJob {
            to: pending.email.clone(),
            subject: ACTIVATION_SUBJECT.to_string(),
            html,
        })
    }
}

async fn hash_blocking(hasher: &CredentialHasher, password: String) -> AppResult<String> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AppError::internal(format!("Task join error: {}", e)))?
}
