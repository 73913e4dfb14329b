//! Port abstraction for user record persistence and its errors.
use async_trait::async_trait;

use crate::domain::{NewUserRecord, UserId, UserRecord, UserUpdate};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user store adapters.
    pub enum UserStoreError {
        /// Store connection could not be established.
        Connection {
            /// Adapter error description.
            message: String,
        } => "user store connection failed: {message}"; retryable = true,
        /// Query or mutation failed during execution.
        Query {
            /// Adapter error description.
            message: String,
        } => "user store query failed: {message}",
        /// A record for this external identity already exists.
        Conflict {
            /// External identity id that collided.
            external_id: String,
        } => "user record for external id {external_id} already exists"; retryable = true,
        /// The targeted record does not exist.
        NotFound {
            /// Identifier that matched no record.
            user_id: String,
        } => "user record {user_id} not found",
    }
}

/// Persistence port for user records keyed by external identity.
///
/// Adapters must enforce uniqueness of `services.lea.id`: inserting a second
/// record for the same external id fails with [`UserStoreError::Conflict`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the record whose `services.lea.id` equals `external_id`.
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserRecord>, UserStoreError>;

    /// Fetch a record by its store-assigned identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, UserStoreError>;

    /// Insert a new record and return the identifier assigned to it.
    async fn insert(&self, record: NewUserRecord) -> Result<UserId, UserStoreError>;

    /// Apply an update set to an existing record.
    async fn update(&self, id: &UserId, update: &UserUpdate) -> Result<(), UserStoreError>;
}
