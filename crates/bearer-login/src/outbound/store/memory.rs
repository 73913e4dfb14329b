//! In-process user store.
//!
//! Records live in a `HashMap` behind a mutex with a secondary unique index
//! on `services.lea.id`. Suitable for the probe binary and tests; nothing is
//! persisted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{UserStore, UserStoreError};
use crate::domain::{NewUserRecord, UserId, UserRecord, UserUpdate};

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<UserId, UserRecord>,
    by_external_id: HashMap<String, UserId>,
}

/// `UserStore` adapter holding records in memory.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    state: Mutex<StoreState>,
}

impl InMemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::Query`] when the store lock is poisoned.
    pub fn len(&self) -> Result<usize, UserStoreError> {
        Ok(self.lock()?.records.len())
    }

    /// Whether the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::Query`] when the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, UserStoreError> {
        Ok(self.lock()?.records.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, UserStoreError> {
        self.state
            .lock()
            .map_err(|_| UserStoreError::query("user store lock poisoned"))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserRecord>, UserStoreError> {
        let state = self.lock()?;
        Ok(state
            .by_external_id
            .get(external_id)
            .and_then(|id| state.records.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, UserStoreError> {
        Ok(self.lock()?.records.get(id).cloned())
    }

    async fn insert(&self, record: NewUserRecord) -> Result<UserId, UserStoreError> {
        let mut state = self.lock()?;
        let external_id = record.external_id().map(str::to_owned);
        if let Some(taken) = external_id
            .as_deref()
            .filter(|candidate| state.by_external_id.contains_key(*candidate))
        {
            return Err(UserStoreError::conflict(taken));
        }

        let id = UserId::random();
        if let Some(key) = external_id {
            state.by_external_id.insert(key, id.clone());
        }
        state.records.insert(id.clone(), record.into_record(id.clone()));
        Ok(id)
    }

    async fn update(&self, id: &UserId, update: &UserUpdate) -> Result<(), UserStoreError> {
        let mut state = self.lock()?;
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| UserStoreError::not_found(id.to_string()))?;
        update.apply_to(record);
        Ok(())
    }
}
