//! Driven port for querying the identity endpoint.
//!
//! The domain owns the request shape (URL plus headers) and the response
//! envelope so the reconciler stays independent of the HTTP client in use.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;

/// Request options handed to the transport alongside the URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestOptions {
    /// Header name to value map sent with the request.
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    /// Look up a header by exact name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Response envelope returned by the transport.
///
/// `data` holds the decoded JSON body. It is `None` when the endpoint
/// answered with an empty body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentityHttpResponse {
    /// Decoded response body.
    pub data: Option<Value>,
}

impl IdentityHttpResponse {
    /// Wrap a decoded body.
    #[must_use]
    pub const fn with_data(data: Value) -> Self {
        Self { data: Some(data) }
    }
}

define_port_error! {
    /// Errors surfaced while calling the identity endpoint.
    pub enum IdentityTransportError {
        /// Network transport failed before a response arrived.
        Transport {
            /// Client error description.
            message: String,
        } => "identity transport failed: {message}"; retryable = true,
        /// The call exceeded the client timeout.
        Timeout {
            /// Client error description.
            message: String,
        } => "identity request timed out: {message}"; retryable = true,
        /// The endpoint answered with a non-success status.
        Status {
            /// HTTP status code returned by the endpoint.
            status: u16,
            /// Truncated response body or reason phrase.
            message: String,
        } => "identity endpoint rejected the request with status {status}: {message}",
        /// The response body could not be decoded.
        Decode {
            /// Decoder error description.
            message: String,
        } => "identity response decode failed: {message}",
        /// The adapter rejected the request before sending it.
        InvalidRequest {
            /// Why the request was refused.
            message: String,
        } => "identity request invalid: {message}",
    }
}

/// Port for the `httpGet` collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityTransport: Send + Sync {
    /// Issue a GET against `url` with the supplied headers.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use async_trait::async_trait;
    /// use bearer_login::domain::ports::{
    ///     IdentityHttpResponse, IdentityTransport, IdentityTransportError, RequestOptions,
    /// };
    /// use serde_json::json;
    ///
    /// struct StaticIdentity;
    ///
    /// #[async_trait]
    /// impl IdentityTransport for StaticIdentity {
    ///     async fn get(
    ///         &self,
    ///         _url: &str,
    ///         _options: &RequestOptions,
    ///     ) -> Result<IdentityHttpResponse, IdentityTransportError> {
    ///         Ok(IdentityHttpResponse::with_data(json!({ "id": "42", "login": "ada" })))
    ///     }
    /// }
    /// ```
    async fn get(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<IdentityHttpResponse, IdentityTransportError>;
}
