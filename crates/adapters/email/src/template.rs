//! 邮件模板系统

use passage_errors::{AppError, AppResult};
use std::collections::HashMap;
use tera::Tera;

pub const ACTIVATION_SUBJECT: &str = "Verify your email";

const ACTIVATION_TEMPLATE: &str = "activation.html";

/// 邮件模板管理器
pub struct EmailTemplate {
    tera: Tera,
}

impl EmailTemplate {
    /// 内置模板
    pub fn builtin() -> AppResult<Self> {
        Self::from_strings(HashMap::from([(
            ACTIVATION_TEMPLATE.to_string(),
            include_str!("../templates/activation.html").to_string(),
        )]))
    }

    /// 从内存中的模板字符串创建
    pub fn from_strings(templates: HashMap<String, String>) -> AppResult<Self> {
        let mut tera = Tera::default();

        for (name, content) in templates {
            tera.add_raw_template(&name, &content).map_err(|e| {
                AppError::internal(format!("Failed to add template {}: {}", name, e))
            })?;
        }

        Ok(Self { tera })
    }

    /// 渲染模板
    pub fn render(&self, template_name: &str, context: &serde_json::Value) -> AppResult<String> {
        let context = tera::Context::from_serialize(context)
            .map_err(|e| AppError::internal(format!("Failed to create template context: {}", e)))?;

        self.tera.render(template_name, &context).map_err(|e| {
            AppError::internal(format!(
                "Failed to render template {}: {}",
                template_name, e
            ))
        })
    }

    /// 渲染激活邮件
    pub fn render_activation(
        &self,
        name: &str,
        verify_url: &str,
        expires_in_minutes: u64,
    ) -> AppResult<String> {
        self.render(
            ACTIVATION_TEMPLATE,
            &serde_json::json!({
                "name": name,
                "verify_url": verify_url,
                "expires_in_minutes": expires_in_minutes,
            }),
        )
    }
}
