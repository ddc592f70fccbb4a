//! 应用层

pub mod auth_service;
pub mod mail_queue;
pub mod registration_service;
pub mod session_service;

pub use auth_service::AuthService;
pub use mail_queue::{MailJob, MailQueue, spawn_mail_worker};
pub use registration_service::{RegistrationService, RegistrationSettings};
pub use session_service::SessionService;
