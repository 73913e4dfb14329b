//! Handler construction options and their validation.
//!
//! String options arrive untyped (JSON values from code, files or the
//! environment) so that wrong types are reported with the same message shape
//! regardless of their source. Collaborators are injected as trait objects.
//! Validation runs once, when a handler is built, and never per login.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::error::ConfigurationError;
use super::ports::{DebugSink, IdentityTransport, NoopDebugSink};

/// Payload attribute that marks an attempt as ours unless configured otherwise.
pub const DEFAULT_SERVICE_NAME: &str = "lea";
/// Payload attribute carrying the bearer token unless configured otherwise.
pub const DEFAULT_TOKEN_NAME: &str = "accessToken";
/// Preferred identity-response attribute holding the username.
pub const DEFAULT_DATA_FIELD: &str = "login";
/// Client identifier sent in the `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("bearer-login/", env!("CARGO_PKG_VERSION"));

const IDENTITY_URL_KEY: &str = "identityUrl";
const HTTP_GET_KEY: &str = "httpGet";
const SERVICE_NAME_KEY: &str = "serviceName";
const TOKEN_NAME_KEY: &str = "tokenName";
const DATA_FIELD_KEY: &str = "dataField";
const USER_AGENT_KEY: &str = "userAgent";
const OPTIONS_KEY: &str = "options";

/// Raw, unvalidated handler options.
///
/// # Examples
/// ```
/// use bearer_login::domain::HandlerOptions;
///
/// let err = HandlerOptions::new().validate().expect_err("identityUrl is required");
/// assert_eq!(
///     err.to_string(),
///     "Expected string, got undefined in field identityUrl"
/// );
/// ```
#[derive(Clone)]
pub struct HandlerOptions {
    settings: Value,
    http_get: Option<Arc<dyn IdentityTransport>>,
    debug: Option<Arc<dyn DebugSink>>,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerOptions {
    /// Start from an empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::from_value(Value::Object(Map::new()))
    }

    /// Start from raw JSON options such as `{"identityUrl": "..."}`.
    #[must_use]
    pub const fn from_value(settings: Value) -> Self {
        Self {
            settings,
            http_get: None,
            debug: None,
        }
    }

    /// Set a raw option. Ignored when the options are not a JSON object;
    /// validation reports that case.
    #[must_use]
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Value::Object(map) = &mut self.settings {
            map.insert(key.to_owned(), value.into());
        }
        self
    }

    /// Identity endpoint queried for every accepted attempt.
    #[must_use]
    pub fn identity_url(self, url: impl Into<String>) -> Self {
        self.set(IDENTITY_URL_KEY, url.into())
    }

    /// Payload attribute marking attempts for this handler.
    #[must_use]
    pub fn service_name(self, name: impl Into<String>) -> Self {
        self.set(SERVICE_NAME_KEY, name.into())
    }

    /// Payload attribute carrying the bearer token.
    #[must_use]
    pub fn token_name(self, name: impl Into<String>) -> Self {
        self.set(TOKEN_NAME_KEY, name.into())
    }

    /// Preferred identity-response attribute holding the username.
    #[must_use]
    pub fn data_field(self, field: impl Into<String>) -> Self {
        self.set(DATA_FIELD_KEY, field.into())
    }

    /// Client identifier sent as `User-Agent`.
    #[must_use]
    pub fn user_agent(self, agent: impl Into<String>) -> Self {
        self.set(USER_AGENT_KEY, agent.into())
    }

    /// Transport used to reach the identity endpoint.
    #[must_use]
    pub fn http_get(mut self, transport: Arc<dyn IdentityTransport>) -> Self {
        self.http_get = Some(transport);
        self
    }

    /// Diagnostic sink. Defaults to [`NoopDebugSink`].
    #[must_use]
    pub fn debug(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug = Some(sink);
        self
    }

    /// Apply defaults and check every recognised option.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] naming the first offending field.
    pub fn validate(self) -> Result<HandlerConfig, ConfigurationError> {
        let Value::Object(settings) = &self.settings else {
            return Err(ConfigurationError::new(
                OPTIONS_KEY,
                "object",
                type_name(&self.settings),
            ));
        };

        let identity_url = required_string(settings, IDENTITY_URL_KEY)?;
        let http_get = self
            .http_get
            .ok_or_else(|| ConfigurationError::new(HTTP_GET_KEY, "function", "undefined"))?;
        let service_name = optional_string(settings, SERVICE_NAME_KEY, DEFAULT_SERVICE_NAME)?;
        let token_name = optional_string(settings, TOKEN_NAME_KEY, DEFAULT_TOKEN_NAME)?;
        let data_field = optional_string(settings, DATA_FIELD_KEY, DEFAULT_DATA_FIELD)?;
        let debug = self.debug.unwrap_or_else(|| Arc::new(NoopDebugSink));
        let user_agent = optional_string(settings, USER_AGENT_KEY, DEFAULT_USER_AGENT)?;

        Ok(HandlerConfig {
            identity_url,
            service_name,
            token_name,
            data_field,
            user_agent,
            http_get,
            debug,
        })
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("settings", &self.settings)
            .field("http_get", &self.http_get.is_some())
            .field("debug", &self.debug.is_some())
            .finish()
    }
}

fn required_string(settings: &Map<String, Value>, key: &str) -> Result<String, ConfigurationError> {
    settings.get(key).map_or_else(
        || Err(ConfigurationError::new(key, "string", "undefined")),
        |value| non_empty_string(key, value),
    )
}

fn optional_string(
    settings: &Map<String, Value>,
    key: &str,
    default: &str,
) -> Result<String, ConfigurationError> {
    settings
        .get(key)
        .map_or_else(|| Ok(default.to_owned()), |value| non_empty_string(key, value))
}

fn non_empty_string(key: &str, value: &Value) -> Result<String, ConfigurationError> {
    match value {
        Value::String(text) if text.is_empty() => Err(ConfigurationError::new(
            key,
            "non-empty string",
            "empty string",
        )),
        Value::String(text) => Ok(text.clone()),
        other => Err(ConfigurationError::new(key, "string", type_name(other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validated, immutable handler configuration.
#[derive(Clone)]
pub struct HandlerConfig {
    identity_url: String,
    service_name: String,
    token_name: String,
    data_field: String,
    user_agent: String,
    http_get: Arc<dyn IdentityTransport>,
    debug: Arc<dyn DebugSink>,
}

impl HandlerConfig {
    /// Identity endpoint URL.
    #[must_use]
    pub fn identity_url(&self) -> &str {
        self.identity_url.as_str()
    }

    /// Relevance attribute name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        self.service_name.as_str()
    }

    /// Token attribute name.
    #[must_use]
    pub fn token_name(&self) -> &str {
        self.token_name.as_str()
    }

    /// Preferred username attribute of the identity response.
    #[must_use]
    pub fn data_field(&self) -> &str {
        self.data_field.as_str()
    }

    /// `User-Agent` header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_str()
    }

    /// Identity transport.
    #[must_use]
    pub fn http_get(&self) -> &dyn IdentityTransport {
        &*self.http_get
    }

    /// Diagnostic sink.
    #[must_use]
    pub fn debug_sink(&self) -> &dyn DebugSink {
        &*self.debug
    }
}

impl TryFrom<HandlerOptions> for HandlerConfig {
    type Error = ConfigurationError;

    fn try_from(options: HandlerOptions) -> Result<Self, Self::Error> {
        options.validate()
    }
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("identity_url", &self.identity_url)
            .field("service_name", &self.service_name)
            .field("token_name", &self.token_name)
            .field("data_field", &self.data_field)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}
