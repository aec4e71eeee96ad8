//! Startup and lifecycle errors
//!
//! Request-level failures are [`AppError`](crate::AppError); these only
//! stop the process.

use thiserror::Error;

use super::config::ConfigError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to seed user {username}: {reason}")]
    Seed { username: String, reason: String },
}

impl ServerError {
    pub(crate) fn seed(username: &str, reason: impl std::fmt::Display) -> Self {
        Self::Seed {
            username: username.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
