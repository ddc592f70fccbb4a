mod postgres_refresh_token_repository;
mod postgres_user_repository;

pub use postgres_refresh_token_repository::PostgresRefreshTokenRepository;
pub use postgres_user_repository::PostgresUserRepository;
