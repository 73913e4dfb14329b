//! Bearer-token login handler.
//!
//! Recognises login attempts that carry an access token issued by an external
//! OAuth identity provider, resolves the token against the provider's identity
//! endpoint and reconciles the external identity with a local user record.
//!
//! The crate follows a hexagonal layout:
//! - [`domain`] owns the handler logic and the ports it depends on;
//! - [`outbound`] provides reference adapters for those ports;
//! - [`settings`] loads handler and transport configuration with OrthoConfig.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bearer_login::domain::{HandlerOptions, LoginAttempt, LoginReconciler};
//! use bearer_login::outbound::identity::ReqwestIdentityTransport;
//! use bearer_login::outbound::store::InMemoryUserStore;
//! use mockable::DefaultClock;
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ReqwestIdentityTransport::new(std::time::Duration::from_secs(5))?;
//! let options = HandlerOptions::new()
//!     .identity_url("https://id.example.test/api/user")
//!     .http_get(Arc::new(transport));
//! let handler = LoginReconciler::new(
//!     options,
//!     Arc::new(InMemoryUserStore::default()),
//!     Arc::new(DefaultClock),
//! )?;
//!
//! let attempt = LoginAttempt::from_value(json!({ "lea": true, "accessToken": "token" }))?;
//! let outcome = handler.handle(Some(&attempt)).await?;
//! assert!(outcome.is_some());
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod outbound;
pub mod settings;
