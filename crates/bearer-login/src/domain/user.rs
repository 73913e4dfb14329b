//! User record model as seen by the login handler.
//!
//! The store owns these records; the handler only reads them and produces
//! insert documents and update sets. Serialisation mirrors the stored
//! document shape (`_id`, `createdAt`, `services.lea.accessToken`, ...).

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Dotted path of the external identity id inside a user document.
pub const EXTERNAL_ID_PATH: &str = "services.lea.id";
/// Dotted path of the last-seen access token.
pub const ACCESS_TOKEN_PATH: &str = "services.lea.accessToken";
/// Dotted path of the last-seen username.
pub const USERNAME_PATH: &str = "services.lea.username";
/// Document key of the last mutation timestamp.
pub const UPDATED_AT_KEY: &str = "updatedAt";

/// Opaque store-assigned user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identifier issued by a store.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random identifier for stores that assign their own ids.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// External identity data stored under `services.lea`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaService {
    /// Stable identifier issued by the identity provider.
    pub id: String,
    /// Last-seen bearer token.
    pub access_token: String,
    /// Last-seen username.
    pub username: String,
}

impl fmt::Debug for LeaService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaService")
            .field("id", &self.id)
            .field("access_token", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

/// Login services attached to a user record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserServices {
    /// Identity linked through the bearer-token handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lea: Option<LeaService>,
}

/// Persistent user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Store-assigned identifier.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Linked login services.
    #[serde(default)]
    pub services: UserServices,
    /// Set once when the record is created.
    pub created_at: DateTime<Utc>,
    /// Set on every reconciliation that touches the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// External identity id, if this record is linked.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.services.lea.as_ref().map(|lea| lea.id.as_str())
    }
}

/// Insert document for a first-seen external identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserRecord {
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Linked external identity.
    pub services: UserServices,
}

impl NewUserRecord {
    /// Build an insert document linking `lea` at `created_at`.
    #[must_use]
    pub const fn linked(lea: LeaService, created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            services: UserServices { lea: Some(lea) },
        }
    }

    /// External identity id carried by this document.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.services.lea.as_ref().map(|lea| lea.id.as_str())
    }

    /// Materialise the stored record once the store has assigned `id`.
    #[must_use]
    pub fn into_record(self, id: UserId) -> UserRecord {
        UserRecord {
            id,
            services: self.services,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

/// Update set applied to an existing record (`$set` semantics).
///
/// ## Invariants
/// - `updated_at` is always present.
/// - `access_token` and `username` are present only when they differ from the
///   stored values.
///
/// # Examples
/// ```
/// use bearer_login::domain::{LeaService, UserUpdate};
/// use chrono::Utc;
///
/// let stored = LeaService {
///     id: "X".to_owned(),
///     access_token: "old".to_owned(),
///     username: "bob".to_owned(),
/// };
/// let update = UserUpdate::diff(Some(&stored), "new", "bob", Utc::now());
/// assert_eq!(update.access_token.as_deref(), Some("new"));
/// assert!(update.username.is_none());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct UserUpdate {
    /// Timestamp of this reconciliation.
    pub updated_at: DateTime<Utc>,
    /// Replacement access token, when it changed.
    pub access_token: Option<String>,
    /// Replacement username, when it changed.
    pub username: Option<String>,
}

impl UserUpdate {
    /// Compute the update set for freshly resolved values against `stored`.
    #[must_use]
    pub fn diff(
        stored: Option<&LeaService>,
        access_token: &str,
        username: &str,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let token_changed = stored.is_none_or(|lea| lea.access_token != access_token);
        let username_changed = stored.is_none_or(|lea| lea.username != username);
        Self {
            updated_at,
            access_token: token_changed.then(|| access_token.to_owned()),
            username: username_changed.then(|| username.to_owned()),
        }
    }

    /// Whether the update only refreshes `updatedAt`.
    #[must_use]
    pub const fn touches_only_timestamp(&self) -> bool {
        self.access_token.is_none() && self.username.is_none()
    }

    /// Render the update as a dotted-path `$set` document.
    #[must_use]
    pub fn to_set_document(&self) -> Map<String, Value> {
        let mut set = Map::new();
        set.insert(
            UPDATED_AT_KEY.to_owned(),
            Value::String(self.updated_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        if let Some(token) = &self.access_token {
            set.insert(ACCESS_TOKEN_PATH.to_owned(), Value::String(token.clone()));
        }
        if let Some(username) = &self.username {
            set.insert(USERNAME_PATH.to_owned(), Value::String(username.clone()));
        }
        set
    }

    /// Apply the update to a stored record in place.
    ///
    /// Records without a `services.lea` entry only get their timestamp
    /// refreshed.
    pub fn apply_to(&self, record: &mut UserRecord) {
        record.updated_at = Some(self.updated_at);
        if let Some(lea) = record.services.lea.as_mut() {
            if let Some(token) = &self.access_token {
                lea.access_token.clone_from(token);
            }
            if let Some(username) = &self.username {
                lea.username.clone_from(username);
            }
        }
    }
}

impl fmt::Debug for UserUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserUpdate")
            .field("updated_at", &self.updated_at)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .finish()
    }
}
