//! In-memory record store.
//!
//! `MemoryStore` keeps every record in a map behind an async lock. It is used
//! by the tests and the console demo, and is a reference for what a durable
//! `RecordStore` has to provide.
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_survey::{MemoryStore, RecordStore, UserId};
//!
//! let store = MemoryStore::new().with_user(UserId(7), "registered");
//! assert!(store.get_user(UserId(7)).await?.is_some());
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{RecordStore, StoreError, ThresholdLedger, UserId, UserRecord};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
    /// Blocked recipients that never started the survey.
    blocked_strangers: RwLock<HashSet<UserId>>,
    notified: RwLock<BTreeSet<u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record in the given state.
    pub fn with_user(mut self, id: UserId, state: impl Into<String>) -> Self {
        self.users.get_mut().insert(id, UserRecord::new(id, state));
        self
    }

    /// Seed a record that is already marked as blocked.
    pub fn with_blocked_user(mut self, id: UserId, state: impl Into<String>) -> Self {
        let mut record = UserRecord::new(id, state);
        record.blocked = true;
        self.users.get_mut().insert(id, record);
        self
    }

    /// A copy of a record, for assertions.
    pub async fn snapshot(&self, id: UserId) -> Option<UserRecord> {
        self.users.read().await.get(&id).cloned()
    }

    async fn with_record<T>(
        &self,
        id: UserId,
        update: impl FnOnce(&mut UserRecord) -> T,
    ) -> Result<T, StoreError> {
        let mut users = self.users.write().await;
        let record = users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        Ok(update(record))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create_user(&self, id: UserId, initial_state: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&id) {
            users.insert(id, UserRecord::new(id, initial_state));
            self.blocked_strangers.write().await.remove(&id);
        }
        Ok(())
    }

    async fn update_field(&self, id: UserId, name: &str, value: &str) -> Result<(), StoreError> {
        self.with_record(id, |record| record.values.insert(name, value))
            .await
    }

    async fn clear_field(&self, id: UserId, name: &str) -> Result<(), StoreError> {
        self.with_record(id, |record| {
            record.values.remove(name);
        })
        .await
    }

    async fn update_state(&self, id: UserId, state: &str) -> Result<(), StoreError> {
        self.with_record(id, |record| record.state = state.to_string())
            .await
    }

    async fn all_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        let mut ids: Vec<UserId> = self.users.read().await.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    async fn is_blocked(&self, id: UserId) -> Result<bool, StoreError> {
        match self.users.read().await.get(&id) {
            Some(record) => Ok(record.blocked),
            None => Ok(self.blocked_strangers.read().await.contains(&id)),
        }
    }

    async fn set_blocked(&self, id: UserId, blocked: bool) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(record) = users.get_mut(&id) {
            record.blocked = blocked;
            return Ok(());
        }
        let mut strangers = self.blocked_strangers.write().await;
        if blocked {
            strangers.insert(id);
        } else {
            strangers.remove(&id);
        }
        Ok(())
    }
}

#[async_trait]
impl ThresholdLedger for MemoryStore {
    async fn is_notified(&self, threshold: u64) -> Result<bool, StoreError> {
        Ok(self.notified.read().await.contains(&threshold))
    }

    async fn mark_notified(&self, threshold: u64) -> Result<(), StoreError> {
        self.notified.write().await.insert(threshold);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_is_idempotent() {
        let store = MemoryStore::new();
        store.create_user(UserId(1), "name").await.unwrap();
        store.update_state(UserId(1), "phone").await.unwrap();
        store.create_user(UserId(1), "name").await.unwrap();

        let record = store.get_user(UserId(1)).await.unwrap().unwrap();
        assert_eq!(record.state, "phone");
    }

    #[tokio::test]
    async fn updates_on_unknown_users_fail() {
        let store = MemoryStore::new();
        let result = store.update_field(UserId(9), "name", "x").await;
        assert!(matches!(result, Err(StoreError::NotFound(UserId(9)))));
        assert!(!store.is_blocked(UserId(9)).await.unwrap());
    }

    #[tokio::test]
    async fn fields_and_blocked_flag() {
        let store = MemoryStore::new().with_user(UserId(1), "name");
        store.update_field(UserId(1), "name", "Alice").await.unwrap();
        store.set_blocked(UserId(1), true).await.unwrap();
        assert!(store.is_blocked(UserId(1)).await.unwrap());

        store.clear_field(UserId(1), "name").await.unwrap();
        let record = store.snapshot(UserId(1)).await.unwrap();
        assert!(!record.values.contains("name"));
        assert!(record.blocked);
    }

    #[tokio::test]
    async fn blocked_flag_of_unknown_user_is_kept_until_they_start() {
        let store = MemoryStore::new();
        store.set_blocked(UserId(3), true).await.unwrap();
        assert!(store.is_blocked(UserId(3)).await.unwrap());
        assert!(store.get_user(UserId(3)).await.unwrap().is_none());
        assert!(store.all_user_ids().await.unwrap().is_empty());

        store.create_user(UserId(3), "name").await.unwrap();
        assert!(!store.is_blocked(UserId(3)).await.unwrap());
    }

    #[tokio::test]
    async fn ledger_remembers_thresholds() {
        let store = MemoryStore::new();
        assert!(!store.is_notified(100).await.unwrap());
        store.mark_notified(100).await.unwrap();
        assert!(store.is_notified(100).await.unwrap());
    }
}
