//! 角色

use std::fmt;
use std::str::FromStr;

use passage_errors::AppError;
use serde::{Deserialize, Serialize};

/// 用户角色：admin ⊇ management ⊇ user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Management,
    Admin,
}

impl Role {
    pub const ALLOWED: [&'static str; 3] = ["user", "admin", "management"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Management => "management",
            Self::Admin => "admin",
        }
    }

    /// 当前角色是否满足 `required`
    pub fn has_permission(&self, required: Role) -> bool {
        match self {
            Self::Admin => true,
            Self::Management => matches!(required, Self::Management | Self::User),
            Self::User => required == Self::User,
        }
    }

    /// 满足任意一个即可
    pub fn has_any(&self, allowed: &[Role]) -> bool {
        allowed.iter().any(|r| self.has_permission(*r))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "management" => Ok(Self::Management),
            "admin" => Ok(Self::Admin),
            other => Err(AppError::validation(format!("unknown role: {}", other))),
        }
    }
}
