//! In-process revocation store
//!
//! Only correct for a single instance: other processes never see its writes.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{RevocationError, RevocationRecord, RevocationStore};

#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    records: DashMap<String, RevocationRecord>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token_id: &str) -> Option<RevocationRecord> {
        self.records.get(token_id).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn add(&self, record: RevocationRecord) -> Result<bool, RevocationError> {
        match self.records.entry(record.token_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, RevocationError> {
        Ok(self.records.contains_key(token_id))
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, RevocationError> {
        let before = self.records.len();
        self.records.retain(|_, record| record.expires_at > now);
        Ok(before.saturating_sub(self.records.len()) as u64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::revocation::RevocationReason;

    fn record(id: &str, expires_at: i64) -> RevocationRecord {
        RevocationRecord {
            token_id: id.into(),
            revoked_at: 0,
            expires_at,
            reason: RevocationReason::Logout,
        }
    }

    #[tokio::test]
    async fn test_add_is_monotonic() {
        let store = MemoryRevocationStore::new();
        assert!(store.add(record("t1", 100)).await.unwrap());
        assert!(!store.add(record("t1", 999)).await.unwrap());

        // First record wins
        assert_eq!(store.get("t1").unwrap().expires_at, 100);
        assert!(store.is_revoked("t1").await.unwrap());
        assert!(!store.is_revoked("t2").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let store = MemoryRevocationStore::new();
        store.add(record("old", 100)).await.unwrap();
        store.add(record("edge", 200)).await.unwrap();
        store.add(record("live", 300)).await.unwrap();

        assert_eq!(store.purge_expired(200).await.unwrap(), 2);
        assert!(!store.is_revoked("old").await.unwrap());
        assert!(!store.is_revoked("edge").await.unwrap());
        assert!(store.is_revoked("live").await.unwrap());
    }
}
