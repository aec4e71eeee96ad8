//! Identity store
//!
//! [`UserStore`] is the lookup the credential validator and the `me`
//! endpoint depend on. [`PgUserStore`] reads the `users` table,
//! [`MemoryUserStore`] backs tests and database-less development.

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared::client::UserProfile;

/// Row in the identity store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub department_id: Option<String>,
    pub level: Option<i32>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    /// Unix millis
    pub created_at: i64,
}

impl UserRecord {
    /// Profile fields not carried in token claims
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("duplicate username: {0}")]
    Duplicate(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, UserStoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, UserStoreError>;
}
