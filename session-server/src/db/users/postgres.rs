//! PostgreSQL identity store

use async_trait::async_trait;
use sqlx::PgPool;

use super::{UserRecord, UserStore, UserStoreError};

const USER_COLUMNS: &str = "id, username, password_hash, roles, permissions, department_id, \
                            level, display_name, email, is_active, created_at";

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user, failing on a duplicate username
    pub async fn create(&self, user: &UserRecord) -> Result<(), UserStoreError> {
        let result = sqlx::query(
            "INSERT INTO users (id, username, password_hash, roles, permissions, department_id, \
             level, display_name, email, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.roles)
        .bind(&user.permissions)
        .bind(&user.department_id)
        .bind(user.level)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(UserStoreError::Duplicate(user.username.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, UserStoreError> {
        let row: Option<UserRecord> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, UserStoreError> {
        let row: Option<UserRecord> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }
}
