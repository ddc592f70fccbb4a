//! passage-auth-core - 认证核心库
//!
//! 角色层级、双密钥 JWT 与 argon2id 密码哈希

mod clock;
mod password;
mod role;
mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use password::{CredentialHasher, HasherParams};
pub use role::Role;
pub use token::{AccessClaims, RefreshClaims, TokenPair, TokenService};

