//! Login attempt payloads and the relevance gate.
//!
//! A dispatcher hands every registered handler the same free-form payload.
//! This handler reads exactly two attributes from it: the relevance flag and
//! the bearer token. Everything else belongs to other handlers.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use zeroize::Zeroizing;

/// Payload could not be interpreted as a login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Login attempts must be JSON objects.
    #[error("login attempt must be an object")]
    NotAnObject,
}

/// Free-form login attempt payload.
///
/// # Examples
/// ```
/// use bearer_login::domain::LoginAttempt;
/// use serde_json::json;
///
/// let attempt = LoginAttempt::from_value(json!({ "lea": true, "accessToken": "T" }))
///     .expect("object payload");
/// assert!(attempt.is_relevant("lea", "accessToken"));
/// assert!(!attempt.is_relevant("password", "accessToken"));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct LoginAttempt(Map<String, Value>);

impl LoginAttempt {
    /// Wrap an already-parsed attribute map.
    #[must_use]
    pub const fn new(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    /// Interpret a JSON value as an attempt.
    ///
    /// # Errors
    ///
    /// Returns [`AttemptError::NotAnObject`] for non-object values.
    pub fn from_value(value: Value) -> Result<Self, AttemptError> {
        match value {
            Value::Object(attributes) => Ok(Self(attributes)),
            _ => Err(AttemptError::NotAnObject),
        }
    }

    /// Read one attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Relevance gate: both attributes must be present on the payload.
    ///
    /// Presence is what routes the attempt; the attribute values are not
    /// inspected here.
    #[must_use]
    pub fn is_relevant(&self, service_name: &str, token_name: &str) -> bool {
        self.0.contains_key(service_name) && self.0.contains_key(token_name)
    }

    /// Read the bearer token, if the attribute holds a non-empty string.
    #[must_use]
    pub fn access_token(&self, token_name: &str) -> Option<AccessToken> {
        match self.0.get(token_name) {
            Some(Value::String(token)) if !token.is_empty() => Some(AccessToken::new(token)),
            _ => None,
        }
    }
}

impl TryFrom<Value> for LoginAttempt {
    type Error = AttemptError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Bearer token taken from a login attempt.
///
/// The buffer is zeroed on drop and `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    /// Token text.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// `Authorization` header value for this token.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.expose())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}
