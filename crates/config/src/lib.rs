//! passage-config - 配置加载库
//!
//! 加载顺序：`default.toml` → `<APP_ENV>.toml` → `APP_` 前缀环境变量（`__` 分隔嵌套层级）

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

use secrecy::{ExposeSecret, Secret};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    // 开发环境: 10, 生产环境: 50
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

fn default_connect_timeout_secs() -> u64 {
    5
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

/// JWT 配置，access 与 refresh 使用不同密钥
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: Secret<String>,
    pub refresh_secret: Secret<String>,
    #[serde(default = "default_access_expires_in")]
    pub access_expires_in: i64,
    #[serde(default = "default_refresh_expires_in")]
    pub refresh_expires_in: i64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

fn default_access_expires_in() -> i64 {
    15 * 60
}

fn default_refresh_expires_in() -> i64 {
    7 * 24 * 60 * 60
}

fn default_issuer() -> String {
    "passage".to_string()
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// 邮件配置
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: Secret<String>,
    pub from_email: String,
    pub from_name: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// 注册与激活配置
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationConfig {
    /// 激活链接的前缀；以 https 开头时 refresh cookie 带 Secure
    pub frontend_url: String,
    #[serde(default = "default_activation_ttl_secs")]
    pub activation_ttl_secs: u64,
    #[serde(default = "default_password_min_len")]
    pub password_min_len: usize,
    #[serde(default = "default_password_max_len")]
    pub password_max_len: usize,
    /// SCAN 每页的 COUNT
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
    /// 单次按邮箱查找最多扫描的页数
    #[serde(default = "default_scan_max_pages")]
    pub scan_max_pages: usize,
    /// 每次访问数据库/缓存的超时
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

fn default_activation_ttl_secs() -> u64 {
    15 * 60
}

fn default_password_min_len() -> usize {
    6
}

fn default_password_max_len() -> usize {
    18
}

fn default_scan_page_size() -> usize {
    100
}

fn default_scan_max_pages() -> usize {
    1000
}

fn default_call_timeout_secs() -> u64 {
    5
}

/// 邮件队列配置
#[derive(Debug, Clone, Deserialize)]
pub struct MailQueueConfig {
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for MailQueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    pub email: EmailConfig,
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub mail_queue: MailQueueConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let figment = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("APP_").split("__"));

        Self::from_figment(figment)
    }

    /// 从任意 figment 提取并校验
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let access = self.jwt.access_secret.expose_secret();
        let refresh = self.jwt.refresh_secret.expose_secret();

        if access.is_empty() || refresh.is_empty() {
            return Err(ConfigError::Invalid("JWT secrets must be set".to_string()));
        }
        if access == refresh {
            return Err(ConfigError::Invalid(
                "jwt.access_secret and jwt.refresh_secret must differ".to_string(),
            ));
        }
        if self.is_production() && (access.len() < 32 || refresh.len() < 32) {
            return Err(ConfigError::Invalid(
                "JWT secrets must be at least 32 characters long in production".to_string(),
            ));
        }

        let reg = &self.registration;
        if reg.password_min_len == 0 || reg.password_min_len > reg.password_max_len {
            return Err(ConfigError::Invalid(
                "registration.password_min_len must be in 1..=password_max_len".to_string(),
            ));
        }
        if reg.activation_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "registration.activation_ttl_secs must be positive".to_string(),
            ));
        }
        if reg.call_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "registration.call_timeout_secs must be positive".to_string(),
            ));
        }
        if reg.scan_page_size == 0 || reg.scan_max_pages == 0 {
            return Err(ConfigError::Invalid(
                "registration scan limits must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
