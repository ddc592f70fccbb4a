//! 注册输入校验
//!
//! 每个字段只报告第一条未通过的规则，所有字段的结果一起返回。

use email_address::EmailAddress;
use passage_auth_core::Role;
use passage_errors::{AppError, AppResult};

const NAME_MIN: usize = 3;
const NAME_MAX: usize = 50;
const SPECIAL_CHARS: &str = r#"!@#$%^&*()_+-=[]{};':"\|,.<>/?"#;

/// 密码长度策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_len: 6,
            max_len: 18,
        }
    }
}

/// 原始注册输入
#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Option<String>,
}

/// 校验通过的注册输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSignup {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// 邮箱统一小写并去掉首尾空白
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_signup(input: &SignupInput, policy: PasswordPolicy) -> AppResult<ValidSignup> {
    let mut errors = Vec::new();

    let name = input.name.trim();
    if let Some(msg) = check_length("name", name, NAME_MIN, NAME_MAX) {
        errors.push(msg);
    }

    let email = normalize_email(&input.email);
    if email.is_empty() {
        errors.push(required("email"));
    } else if !EmailAddress::is_valid(&email) {
        errors.push("email must be a valid email address".to_string());
    }

    if let Some(msg) = check_length("password", &input.password, policy.min_len, policy.max_len) {
        errors.push(msg);
    } else if !is_complex(&input.password) {
        errors.push(
            "password must contain at least one uppercase letter, one lowercase letter, one digit, and one special character"
                .to_string(),
        );
    }

    if input.confirm_password.is_empty() {
        errors.push(required("confirmPassword"));
    } else if input.confirm_password != input.password {
        errors.push("confirmPassword must match password".to_string());
    }

    let role = match input.role.as_deref().map(str::trim) {
        None | Some("") => Some(Role::default()),
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                errors.push("role can only either be user, admin or management".to_string());
                None
            }
        },
    };

    match role {
        Some(role) if errors.is_empty() => Ok(ValidSignup {
            name: name.to_string(),
            email,
            password: input.password.clone(),
            role,
        }),
        _ => Err(AppError::validations(errors)),
    }
}

fn required(field: &str) -> String {
    format!("{} is required", field)
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Option<String> {
    let len = value.chars().count();
    if len == 0 {
        Some(required(field))
    } else if len < min {
        Some(format!("{} must be at least {} characters", field, min))
    } else if len > max {
        Some(format!("{} must be at most {} characters", field, max))
    } else {
        None
    }
}

fn is_complex(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SPECIAL_CHARS.contains(c))
}
