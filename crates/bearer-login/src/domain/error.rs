//! Error taxonomy of the login handler.
//!
//! Construction problems surface as [`ConfigurationError`] and never reach a
//! login. Once an attempt has passed the relevance gate every failure becomes
//! a [`LoginError`]; skipped attempts are not errors at all.

use thiserror::Error;

use super::ports::{IdentityTransportError, UserStoreError};

/// Handler options failed validation.
///
/// The message names the first offending field together with the expected
/// and the actual type, for example
/// `Expected string, got undefined in field identityUrl`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Expected {expected}, got {actual} in field {field}")]
pub struct ConfigurationError {
    field: String,
    expected: String,
    actual: String,
}

impl ConfigurationError {
    /// Build an error for `field`.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Name of the offending option.
    #[must_use]
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Expected type or shape.
    #[must_use]
    pub fn expected(&self) -> &str {
        self.expected.as_str()
    }

    /// Observed type or value.
    #[must_use]
    pub fn actual(&self) -> &str {
        self.actual.as_str()
    }
}

/// The identity response did not match the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataShapeError {
    /// `data.id` was missing or not a string.
    #[error("Invalid data result. Expected id, got <{actual}> value.")]
    MissingId {
        /// Rendered value found in place of the id.
        actual: String,
    },
    /// None of the username candidates yielded a string.
    #[error(
        "Invalid data result. Expected one of {data_field}, username or email, got <{actual}> value."
    )]
    MissingUsername {
        /// Configured preferred username field.
        data_field: String,
        /// Rendered value of the first truthy candidate, or of `email` when
        /// none is truthy.
        actual: String,
    },
}

/// Failure of an accepted login attempt.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The identity fetch failed; the transport's error is passed through.
    #[error(transparent)]
    Transport(#[from] IdentityTransportError),
    /// The identity response could not be interpreted.
    #[error(transparent)]
    DataShape(#[from] DataShapeError),
    /// The user store failed during reconciliation.
    #[error(transparent)]
    Store(#[from] UserStoreError),
}

impl LoginError {
    /// Whether repeating the attempt may succeed.
    ///
    /// Shape errors are permanent for a given token; transport and store
    /// errors defer to their port's classification.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(error) => error.is_retryable(),
            Self::DataShape(_) => false,
            Self::Store(error) => error.is_retryable(),
        }
    }
}
