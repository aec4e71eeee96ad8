//! In-memory identity store

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{UserRecord, UserStore, UserStoreError};

/// DashMap-backed store keyed by username
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<String, UserRecord>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user, failing on a duplicate username
    pub fn insert(&self, user: UserRecord) -> Result<(), UserStoreError> {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(UserStoreError::Duplicate(user.username)),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }

    /// Enable or disable an account
    pub fn set_active(&self, username: &str, active: bool) -> bool {
        match self.users.get_mut(username) {
            Some(mut user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, UserStoreError> {
        Ok(self.users.get(username).map(|u| u.clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, UserStoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, username: &str) -> UserRecord {
        UserRecord {
            id: id.into(),
            username: username.into(),
            password_hash: "hash".into(),
            roles: vec![],
            permissions: vec![],
            department_id: None,
            level: None,
            display_name: None,
            email: None,
            is_active: true,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn test_lookup_by_username_and_id() {
        let store = MemoryUserStore::new();
        store.insert(record("u1", "alice")).unwrap();
        store.insert(record("u2", "bob")).unwrap();

        let alice = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(alice.id, "u1");
        let bob = store.find_by_id("u2").await.unwrap().unwrap();
        assert_eq!(bob.username, "bob");
        assert!(store.find_by_username("carol").await.unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let store = MemoryUserStore::new();
        store.insert(record("u1", "alice")).unwrap();
        assert!(matches!(
            store.insert(record("u9", "alice")),
            Err(UserStoreError::Duplicate(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_set_active() {
        let store = MemoryUserStore::new();
        store.insert(record("u1", "alice")).unwrap();
        assert!(store.set_active("alice", false));
        assert!(!store.find_by_username("alice").await.unwrap().unwrap().is_active);
        assert!(!store.set_active("nobody", false));
    }
}
