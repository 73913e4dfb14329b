//! Handler and identity client settings loaded via OrthoConfig.
//!
//! Values are layered from configuration files, environment variables and
//! command-line flags. Every value is optional here: loaded settings are
//! turned into [`HandlerOptions`] and pass through the same validation as
//! programmatic options.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::HandlerOptions;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Settings for the bearer-token login handler.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LEA_LOGIN")]
pub struct LoginHandlerSettings {
    /// Identity endpoint queried with the bearer token.
    pub identity_url: Option<String>,
    /// Attempt attribute that marks an attempt as ours.
    pub service_name: Option<String>,
    /// Attempt attribute carrying the bearer token.
    pub token_name: Option<String>,
    /// Preferred identity response field holding the username.
    pub data_field: Option<String>,
    /// `User-Agent` header sent to the identity endpoint.
    pub user_agent: Option<String>,
}

impl LoginHandlerSettings {
    /// Convert the loaded values into unvalidated handler options.
    ///
    /// Unset values are left out so the handler defaults apply. The caller
    /// still has to supply the transport.
    #[must_use]
    pub fn to_options(&self) -> HandlerOptions {
        let mut options = HandlerOptions::new();
        if let Some(url) = &self.identity_url {
            options = options.identity_url(url.as_str());
        }
        if let Some(name) = &self.service_name {
            options = options.service_name(name.as_str());
        }
        if let Some(name) = &self.token_name {
            options = options.token_name(name.as_str());
        }
        if let Some(field) = &self.data_field {
            options = options.data_field(field.as_str());
        }
        if let Some(agent) = &self.user_agent {
            options = options.user_agent(agent.as_str());
        }
        options
    }
}

/// Settings for the outbound identity HTTP client.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "IDENTITY_CLIENT")]
pub struct IdentityClientSettings {
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl IdentityClientSettings {
    /// Return the configured request timeout, falling back to the default.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }
}
