//! PostgreSQL revocation store
//!
//! Shared by every instance; `add` commits before returning.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{RevocationError, RevocationRecord, RevocationStore};

#[derive(Debug, Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn add(&self, record: RevocationRecord) -> Result<bool, RevocationError> {
        let result = sqlx::query(
            "INSERT INTO revoked_tokens (token_id, revoked_at, expires_at, reason) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (token_id) DO NOTHING",
        )
        .bind(&record.token_id)
        .bind(record.revoked_at)
        .bind(record.expires_at)
        .bind(record.reason.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, RevocationError> {
        let revoked: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE token_id = $1)")
                .bind(token_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(revoked)
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, RevocationError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
