//! Process-local stores. Default backend when no database or Redis is configured.

use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Directory, StoreError, TokenStore};
use crate::models::{Identity, TokenRecord};

#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    identities: Arc<RwLock<HashMap<String, Identity>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_by_id(&self, identifier: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.read().await.get(identifier).cloned())
    }

    async fn insert_if_absent(&self, identity: Identity) -> Result<bool, StoreError> {
        let mut identities = self.identities.write().await;
        match identities.entry(identity.identifier.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(identity);
                Ok(true)
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, TokenRecord>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn put(&self, record: TokenRecord) -> Result<(), StoreError> {
        self.tokens.write().await.insert(record.digest.clone(), record);
        Ok(())
    }

    async fn get(&self, digest: &str) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.tokens.read().await.get(digest).cloned())
    }

    async fn mark_revoked(&self, digest: &str) -> Result<(), StoreError> {
        if let Some(record) = self.tokens.write().await.get_mut(digest) {
            record.revoked = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HashRecord;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn identity(identifier: &str, credential: &str) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            identifier: identifier.to_string(),
            credential: HashRecord::from_stored(credential),
            display_name: None,
            email: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_if_absent_never_overwrites() {
        let dir = InMemoryDirectory::new();
        assert!(dir.insert_if_absent(identity("alice", "first")).await.unwrap());
        assert!(!dir.insert_if_absent(identity("alice", "second")).await.unwrap());

        let stored = dir.find_by_id("alice").await.unwrap().unwrap();
        assert_eq!(stored.credential.as_str(), "first");
        assert_eq!(dir.len().await, 1);
    }

    #[tokio::test]
    async fn find_unknown_is_none() {
        let dir = InMemoryDirectory::new();
        assert!(dir.find_by_id("nobody").await.unwrap().is_none());
        assert!(dir.is_empty().await);
    }

    #[tokio::test]
    async fn revoke_unknown_digest_is_a_noop() {
        let store = InMemoryTokenStore::new();
        store.mark_revoked("missing").await.unwrap();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revoke_flags_the_record() {
        let store = InMemoryTokenStore::new();
        let now = Utc::now();
        store
            .put(TokenRecord {
                digest: "abc".to_string(),
                identity_id: Uuid::new_v4(),
                identifier: "alice".to_string(),
                issued_at: now,
                expires_at: now + Duration::hours(1),
                revoked: false,
            })
            .await
            .unwrap();
        store.mark_revoked("abc").await.unwrap();
        store.mark_revoked("abc").await.unwrap();
        assert!(store.get("abc").await.unwrap().unwrap().revoked);
    }
}
