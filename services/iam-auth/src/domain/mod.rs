//! 领域层

pub mod entities;
pub mod repositories;
pub mod validation;

pub use entities::*;
pub use repositories::*;
