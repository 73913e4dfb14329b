//! Named login handler registry.
//!
//! Every registered handler sees every attempt, in registration order. A
//! handler that does not recognise the payload returns `Ok(None)` and the next
//! one is consulted; the first handler that claims the attempt decides it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::attempt::LoginAttempt;
use super::error::LoginError;
use super::reconciler::LoginOutcome;
use super::user::UserId;

/// Registration name used for the bearer-token handler.
pub const DEFAULT_LOGIN_NAME: &str = "loginWithLea";

/// A pluggable login handler.
#[async_trait]
pub trait LoginHandler: Send + Sync {
    /// Try to authenticate `attempt`.
    ///
    /// `Ok(None)` means the attempt is meant for another handler.
    async fn try_login(
        &self,
        attempt: Option<&LoginAttempt>,
    ) -> Result<Option<LoginOutcome>, LoginError>;
}

/// Failures reported by [`LoginDispatcher`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Handler names must be non-empty.
    #[error("login handler name must not be empty")]
    EmptyName,
    /// A handler with this name is already registered.
    #[error("login handler {name} is already registered")]
    DuplicateName {
        /// Name that was registered twice.
        name: String,
    },
    /// No registered handler claimed the attempt.
    #[error("unrecognized login attempt")]
    Unrecognized,
    /// The handler that claimed the attempt rejected it.
    #[error("login handler {handler} rejected the attempt")]
    Rejected {
        /// Name of the rejecting handler.
        handler: String,
        /// Underlying failure.
        #[source]
        source: LoginError,
    },
    /// The handler claimed the attempt but produced no user.
    #[error("login handler {handler} did not produce a user id")]
    MissingUserId {
        /// Name of the offending handler.
        handler: String,
    },
}

/// Successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedLogin {
    /// Name of the handler that authenticated the attempt.
    pub handler: String,
    /// Local user the attempt authenticated as.
    pub user_id: UserId,
}

/// Ordered registry of named login handlers.
#[derive(Default)]
pub struct LoginDispatcher {
    handlers: Vec<(String, Arc<dyn LoginHandler>)>,
}

impl LoginDispatcher {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register `handler` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::EmptyName`] or
    /// [`DispatchError::DuplicateName`]; the registry is unchanged then.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn LoginHandler>,
    ) -> Result<(), DispatchError> {
        let handler_name = name.into();
        if handler_name.is_empty() {
            return Err(DispatchError::EmptyName);
        }
        if self
            .handlers
            .iter()
            .any(|(existing, _)| *existing == handler_name)
        {
            return Err(DispatchError::DuplicateName { name: handler_name });
        }
        debug!(name = %handler_name, "login handler registered");
        self.handlers.push((handler_name, handler));
        Ok(())
    }

    /// Register `handler` under [`DEFAULT_LOGIN_NAME`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DuplicateName`] when called twice.
    pub fn register_default(&mut self, handler: Arc<dyn LoginHandler>) -> Result<(), DispatchError> {
        self.register(DEFAULT_LOGIN_NAME, handler)
    }

    /// Registered handler names in consultation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(name, _)| name.as_str())
    }

    /// Route `attempt` to the first handler that claims it.
    ///
    /// # Errors
    ///
    /// See [`DispatchError`] for the rejection cases.
    pub async fn dispatch(
        &self,
        attempt: &LoginAttempt,
    ) -> Result<AuthenticatedLogin, DispatchError> {
        for (name, handler) in &self.handlers {
            let outcome = match handler.try_login(Some(attempt)).await {
                Ok(Some(outcome)) => outcome,
                Ok(None) => continue,
                Err(source) => {
                    warn!(handler = %name, error = %source, retryable = source.is_retryable(), "login rejected");
                    return Err(DispatchError::Rejected {
                        handler: name.clone(),
                        source,
                    });
                }
            };
            let Some(user_id) = outcome.user_id else {
                warn!(handler = %name, "login accepted without a user id");
                return Err(DispatchError::MissingUserId {
                    handler: name.clone(),
                });
            };
            info!(handler = %name, %user_id, "login authenticated");
            return Ok(AuthenticatedLogin {
                handler: name.clone(),
                user_id,
            });
        }
        debug!("no login handler claimed the attempt");
        Err(DispatchError::Unrecognized)
    }
}

impl fmt::Debug for LoginDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginDispatcher")
            .field("handlers", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
