//! Login handler domain.
//!
//! Purpose: recognise bearer-token login attempts, resolve the external
//! identity behind the token and map it onto a local user record. Everything
//! outside this module reaches the domain through the traits in [`ports`].
//!
//! Public surface:
//! - `HandlerOptions` / `HandlerConfig`: raw and validated handler settings.
//! - `LoginAttempt`: payload handed over by the dispatcher.
//! - `LoginReconciler`: the handler itself.
//! - `LoginDispatcher`: named handler registry.
//! - `LoginError`: failures surfaced once an attempt has been accepted.

pub mod attempt;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod ports;
pub mod reconciler;
pub mod user;

pub use self::attempt::{AccessToken, AttemptError, LoginAttempt};
pub use self::config::{
    DEFAULT_DATA_FIELD, DEFAULT_SERVICE_NAME, DEFAULT_TOKEN_NAME, DEFAULT_USER_AGENT,
    HandlerConfig, HandlerOptions,
};
pub use self::dispatcher::{
    AuthenticatedLogin, DEFAULT_LOGIN_NAME, DispatchError, LoginDispatcher, LoginHandler,
};
pub use self::error::{ConfigurationError, DataShapeError, LoginError};
pub use self::identity::ResolvedIdentity;
pub use self::reconciler::{LoginOutcome, LoginReconciler};
pub use self::user::{LeaService, NewUserRecord, UserId, UserRecord, UserServices, UserUpdate};
