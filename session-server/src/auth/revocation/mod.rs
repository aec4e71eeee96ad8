//! Token revocation
//!
//! Session tokens are self-contained, so logging out has to be recorded
//! somewhere every instance can see. [`RevocationStore`] is that shared side
//! table; [`Revocations`] wraps it with identifier resolution, read and write
//! deadlines and the purge loop.
//!
//! # Guarantees
//!
//! - `add` is an idempotent upsert and is visible to `is_revoked` as soon as
//!   it returns
//! - records may be dropped once the token would have expired anyway
//! - any store error or a lookup past the deadline is
//!   [`RevocationError::Unavailable`]; callers must treat it as revoked
//! - only tokens this service signed are recorded

mod memory;
mod postgres;

pub use memory::MemoryRevocationStore;
pub use postgres::PgRevocationStore;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::auth::jwt::{JwtService, TokenIdentity};

/// Why a token was revoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    Logout,
    ForcedExpiry,
    Compromised,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logout => "logout",
            Self::ForcedExpiry => "forced_expiry",
            Self::Compromised => "compromised",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A revoked token (timestamps in unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub token_id: String,
    pub revoked_at: i64,
    /// Purgeable after this instant
    pub expires_at: i64,
    pub reason: RevocationReason,
}

#[derive(Debug, Error)]
pub enum RevocationError {
    #[error("revocation store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RevocationError {
    fn from(e: sqlx::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

/// Shared storage for revoked token identifiers
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record a revocation. Returns `false` when the token was already revoked.
    async fn add(&self, record: RevocationRecord) -> Result<bool, RevocationError>;

    /// Keyed lookup
    async fn is_revoked(&self, token_id: &str) -> Result<bool, RevocationError>;

    /// Drop records whose `expires_at` is at or before `now`
    async fn purge_expired(&self, now: i64) -> Result<u64, RevocationError>;

    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// Result of a successful revoke call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationOutcome {
    Revoked,
    AlreadyRevoked,
}

/// Revocation service used by logout and the claim extraction middleware
#[derive(Clone)]
pub struct Revocations {
    store: Arc<dyn RevocationStore>,
    jwt: Arc<JwtService>,
    lookup_timeout: Duration,
    write_timeout: Duration,
}

impl Revocations {
    pub fn new(
        store: Arc<dyn RevocationStore>,
        jwt: Arc<JwtService>,
        lookup_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        Self {
            store,
            jwt,
            lookup_timeout,
            write_timeout,
        }
    }

    /// Revoke a presented token string.
    ///
    /// Returns `Ok(None)` without touching the store when the token was not
    /// signed by this service.
    pub async fn revoke(
        &self,
        token: &str,
        reason: RevocationReason,
    ) -> Result<Option<RevocationOutcome>, RevocationError> {
        match self.jwt.token_id(token) {
            Some(identity) => self.revoke_identity(&identity, reason).await.map(Some),
            None => Ok(None),
        }
    }

    /// Revoke an already resolved identifier, bounded by the write deadline
    pub async fn revoke_identity(
        &self,
        identity: &TokenIdentity,
        reason: RevocationReason,
    ) -> Result<RevocationOutcome, RevocationError> {
        let record = RevocationRecord {
            token_id: identity.id.clone(),
            revoked_at: shared::util::now_secs(),
            expires_at: identity.expires_at,
            reason,
        };

        let inserted = match tokio::time::timeout(self.write_timeout, self.store.add(record)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(RevocationError::Unavailable(format!(
                    "write exceeded {}ms",
                    self.write_timeout.as_millis()
                )));
            }
        };

        Ok(if inserted {
            RevocationOutcome::Revoked
        } else {
            RevocationOutcome::AlreadyRevoked
        })
    }

    /// Hot-path lookup bounded by the configured deadline
    pub async fn is_revoked(&self, token_id: &str) -> Result<bool, RevocationError> {
        match tokio::time::timeout(self.lookup_timeout, self.store.is_revoked(token_id)).await {
            Ok(result) => result,
            Err(_) => Err(RevocationError::Unavailable(format!(
                "lookup exceeded {}ms",
                self.lookup_timeout.as_millis()
            ))),
        }
    }

    /// Drop records for tokens that have expired naturally
    pub async fn purge_expired(&self) -> Result<u64, RevocationError> {
        self.store.purge_expired(shared::util::now_secs()).await
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Run [`Self::purge_expired`] every `interval`
    pub fn spawn_purge_task(&self, interval: Duration) -> JoinHandle<()> {
        let revocations = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match revocations.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => tracing::info!(
                        purged,
                        backend = revocations.backend(),
                        "Purged expired revocations"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Revocation purge failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::auth::jwt::JwtConfig;

    struct SlowStore;

    #[async_trait]
    impl RevocationStore for SlowStore {
        async fn add(&self, _record: RevocationRecord) -> Result<bool, RevocationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(true)
        }

        async fn is_revoked(&self, _token_id: &str) -> Result<bool, RevocationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(false)
        }

        async fn purge_expired(&self, _now: i64) -> Result<u64, RevocationError> {
            Ok(0)
        }

        fn backend(&self) -> &'static str {
            "slow"
        }
    }

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new(JwtConfig {
            secret: "test-secret-key-with-at-least-32-bytes".into(),
            issuer: "session-server".into(),
            audience: "session-clients".into(),
            session_ttl_secs: 3600,
            remember_me_ttl_secs: 604_800,
        }))
    }

    fn principal() -> Principal {
        Principal {
            id: "u1".into(),
            username: "alice".into(),
            roles: vec![],
            permissions: vec![],
            department_id: None,
            level: None,
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn revocations(store: Arc<dyn RevocationStore>) -> Revocations {
        Revocations::new(
            store,
            jwt(),
            Duration::from_millis(50),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = Arc::new(MemoryRevocationStore::new());
        let revocations = revocations(store.clone());
        let issued = jwt().issue(&principal(), 3600).unwrap();

        assert_eq!(
            revocations.revoke(&issued.token, RevocationReason::Logout).await.unwrap(),
            Some(RevocationOutcome::Revoked)
        );
        assert_eq!(
            revocations.revoke(&issued.token, RevocationReason::Logout).await.unwrap(),
            Some(RevocationOutcome::AlreadyRevoked)
        );
        assert!(revocations.is_revoked(&issued.session_id).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_record_expires_with_token() {
        let store = Arc::new(MemoryRevocationStore::new());
        let revocations = revocations(store.clone());
        let issued = jwt().issue(&principal(), 3600).unwrap();

        revocations
            .revoke(&issued.token, RevocationReason::Logout)
            .await
            .unwrap();

        let record = store.get(&issued.session_id).unwrap();
        assert_eq!(record.expires_at, issued.expires_at);
        assert_eq!(record.reason, RevocationReason::Logout);
    }

    #[tokio::test]
    async fn test_unsigned_tokens_are_not_recorded() {
        let store = Arc::new(MemoryRevocationStore::new());
        let revocations = revocations(store.clone());

        for i in 0..20 {
            let outcome = revocations
                .revoke(&format!("junk-{i}"), RevocationReason::Logout)
                .await
                .unwrap();
            assert!(outcome.is_none());
        }
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_write_is_unavailable() {
        let revocations = revocations(Arc::new(SlowStore));
        let issued = jwt().issue(&principal(), 3600).unwrap();

        assert!(matches!(
            revocations.revoke(&issued.token, RevocationReason::Logout).await,
            Err(RevocationError::Unavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_is_unavailable() {
        let revocations = revocations(Arc::new(SlowStore));
        assert!(matches!(
            revocations.is_revoked("any").await,
            Err(RevocationError::Unavailable(_))
        ));
    }
}
