//! Structural contract of the identity endpoint response.
//!
//! Providers disagree on where the username lives, so it is resolved from a
//! fixed priority list: the configured field, then `username`, then `email`.
//! The first truthy candidate wins and must be a string. When none is truthy
//! the error reports the `email` value, the last candidate consulted.

use serde_json::Value;

use super::error::DataShapeError;
use super::ports::IdentityHttpResponse;

const USERNAME_FIELD: &str = "username";
const EMAIL_FIELD: &str = "email";
const UNDEFINED: &str = "undefined";

/// External identity extracted from a validated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Stable external identifier.
    pub id: String,
    /// Username resolved from the candidate fields.
    pub username: String,
}

impl ResolvedIdentity {
    /// Validate `response` and extract the identity.
    ///
    /// A missing response body is treated as an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`DataShapeError::MissingId`] when `id` is not a string and
    /// [`DataShapeError::MissingUsername`] when no candidate yields a string.
    ///
    /// # Examples
    /// ```
    /// use bearer_login::domain::ResolvedIdentity;
    /// use bearer_login::domain::ports::IdentityHttpResponse;
    /// use serde_json::json;
    ///
    /// let response = IdentityHttpResponse::with_data(json!({
    ///     "id": "X",
    ///     "login": "",
    ///     "email": "bob@example.test",
    /// }));
    /// let identity = ResolvedIdentity::from_response(&response, "login").expect("valid shape");
    /// assert_eq!(identity.username, "bob@example.test");
    /// ```
    pub fn from_response(
        response: &IdentityHttpResponse,
        data_field: &str,
    ) -> Result<Self, DataShapeError> {
        let data = response.data.as_ref();
        let field = |name: &str| data.and_then(|value| value.get(name));

        let id = match field("id") {
            Some(Value::String(id)) => id.clone(),
            other => {
                return Err(DataShapeError::MissingId {
                    actual: render(other),
                });
            }
        };

        let candidate = [data_field, USERNAME_FIELD, EMAIL_FIELD]
            .into_iter()
            .filter_map(|name| field(name))
            .find(|value| is_truthy(value));
        let username = match candidate {
            Some(Value::String(username)) => username.clone(),
            other => {
                return Err(DataShapeError::MissingUsername {
                    data_field: data_field.to_owned(),
                    actual: render(other.or_else(|| field(EMAIL_FIELD))),
                });
            }
        };

        Ok(Self { id, username })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn render(value: Option<&Value>) -> String {
    match value {
        None => UNDEFINED.to_owned(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
