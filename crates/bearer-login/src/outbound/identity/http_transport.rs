//! Reqwest-backed identity transport adapter.
//!
//! This adapter owns transport details only: header conversion, timeout and
//! HTTP error mapping, and JSON decoding of the response body. Interpreting
//! the identity is left to the domain.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use crate::domain::ports::{
    IdentityHttpResponse, IdentityTransport, IdentityTransportError, RequestOptions,
};
use crate::settings::IdentityClientSettings;

/// Identity transport that performs HTTP GET requests with reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestIdentityTransport {
    client: Client,
}

impl ReqwestIdentityTransport {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Build an adapter from loaded client settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn from_settings(settings: &IdentityClientSettings) -> Result<Self, reqwest::Error> {
        Self::new(settings.timeout())
    }
}

#[async_trait]
impl IdentityTransport for ReqwestIdentityTransport {
    async fn get(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<IdentityHttpResponse, IdentityTransportError> {
        let endpoint = parse_url(url)?;
        let headers = build_headers(options)?;
        let response = self
            .client
            .get(endpoint)
            .headers(headers)
            .send()
            .await
            .map_err(|error| map_transport_error(&error))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| map_transport_error(&error))?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        Ok(IdentityHttpResponse {
            data: parse_body(body.as_ref())?,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, IdentityTransportError> {
    let url = Url::parse(raw).map_err(|error| {
        IdentityTransportError::invalid_request(format!(
            "identity URL must be absolute: {error}"
        ))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(IdentityTransportError::invalid_request(format!(
            "unsupported identity URL scheme {scheme}"
        ))),
    }
}

fn build_headers(options: &RequestOptions) -> Result<HeaderMap, IdentityTransportError> {
    let mut headers = HeaderMap::with_capacity(options.headers.len());
    for (name, value) in &options.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            IdentityTransportError::invalid_request(format!("invalid header name {name}"))
        })?;
        // The value may carry the bearer token; keep it out of the message.
        let mut header_value = HeaderValue::from_str(value).map_err(|_| {
            IdentityTransportError::invalid_request(format!("invalid value for header {name}"))
        })?;
        if header_name == reqwest::header::AUTHORIZATION {
            header_value.set_sensitive(true);
        }
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

fn parse_body(body: &[u8]) -> Result<Option<Value>, IdentityTransportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|error| {
        IdentityTransportError::decode(format!("invalid identity JSON payload: {error}"))
    })
}

fn map_transport_error(error: &reqwest::Error) -> IdentityTransportError {
    if error.is_timeout() {
        IdentityTransportError::timeout(error.to_string())
    } else if error.is_decode() {
        IdentityTransportError::decode(error.to_string())
    } else {
        IdentityTransportError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> IdentityTransportError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            IdentityTransportError::timeout(message)
        }
        _ => IdentityTransportError::status(status.as_u16(), message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
