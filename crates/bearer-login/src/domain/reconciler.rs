//! Login reconciliation service.
//!
//! Per invocation the handler moves through
//! `GATE_CHECK → (SKIPPED | FETCHING → VALIDATING → (FAILED | RECONCILING → DONE))`:
//! - the relevance gate decides whether the attempt belongs to this handler;
//! - the identity endpoint resolves the bearer token;
//! - the response shape is validated before anything is written;
//! - the user store is reconciled by external identity id.
//!
//! No state survives an invocation apart from what the store persists.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::attempt::{AccessToken, LoginAttempt};
use super::config::{HandlerConfig, HandlerOptions};
use super::dispatcher::LoginHandler;
use super::error::{ConfigurationError, LoginError};
use super::identity::ResolvedIdentity;
use super::ports::{IdentityHttpResponse, RequestOptions, UserStore, UserStoreError};
use super::user::{EXTERNAL_ID_PATH, LeaService, NewUserRecord, UserId, UserRecord, UserUpdate};

const ACCEPT_HEADER: &str = "Accept";
const USER_AGENT_HEADER: &str = "User-Agent";
const AUTHORIZATION_HEADER: &str = "Authorization";
const JSON_MEDIA_TYPE: &str = "application/json";

/// Result handed back to the dispatcher for an accepted attempt.
///
/// `user_id` is `None` only if the store lost the record between writing and
/// reading it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    /// Local user the attempt authenticated as.
    pub user_id: Option<UserId>,
}

/// Bearer-token login handler backed by a user store.
#[derive(Clone)]
pub struct LoginReconciler<S> {
    config: Arc<HandlerConfig>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> LoginReconciler<S> {
    /// Validate `options` and build a handler.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the options are incomplete or
    /// mistyped; no handler is produced in that case.
    pub fn new(
        options: HandlerOptions,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self::from_config(options.validate()?, store, clock))
    }

    /// Build a handler from an already validated configuration.
    #[must_use]
    pub fn from_config(config: HandlerConfig, store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            clock,
        }
    }

    /// Validated configuration in use.
    #[must_use]
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }
}

impl<S> fmt::Debug for LoginReconciler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginReconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: UserStore> LoginReconciler<S> {
    /// Process one login attempt.
    ///
    /// Returns `Ok(None)` when the attempt is not meant for this handler,
    /// so the dispatcher can try the next one.
    ///
    /// # Errors
    ///
    /// Transport, response-shape and store failures of accepted attempts are
    /// returned as [`LoginError`]. Shape validation happens before any store
    /// access, so a rejected response never mutates a record.
    pub async fn handle(
        &self,
        attempt: Option<&LoginAttempt>,
    ) -> Result<Option<LoginOutcome>, LoginError> {
        let Some(token) = self.gate(attempt) else {
            return Ok(None);
        };

        let identity = self.fetch_identity(&token).await?;
        let user_id = self.reconcile(&identity, &token).await?;
        Ok(Some(LoginOutcome { user_id }))
    }

    fn gate(&self, attempt: Option<&LoginAttempt>) -> Option<AccessToken> {
        let config = &self.config;
        let submitted = attempt?;
        if !submitted.is_relevant(config.service_name(), config.token_name()) {
            debug!(
                service_name = config.service_name(),
                "login attempt skipped: relevance attributes absent"
            );
            return None;
        }
        let token = submitted.access_token(config.token_name());
        if token.is_none() {
            debug!(
                token_name = config.token_name(),
                "login attempt skipped: token is not a non-empty string"
            );
        }
        token
    }

    async fn fetch_identity(&self, token: &AccessToken) -> Result<ResolvedIdentity, LoginError> {
        let config = &self.config;
        let options = self.request_options(token);
        config.debug_sink().debug(
            "requesting identity",
            &json!({ "url": config.identity_url() }),
        );

        let response = config
            .http_get()
            .get(config.identity_url(), &options)
            .await?;
        config.debug_sink().debug(
            "identity response received",
            &json!({ "url": config.identity_url(), "fields": response_fields(&response) }),
        );

        Ok(ResolvedIdentity::from_response(&response, config.data_field())?)
    }

    fn request_options(&self, token: &AccessToken) -> RequestOptions {
        let mut options = RequestOptions::default();
        options
            .headers
            .insert(ACCEPT_HEADER.to_owned(), JSON_MEDIA_TYPE.to_owned());
        options.headers.insert(
            USER_AGENT_HEADER.to_owned(),
            self.config.user_agent().to_owned(),
        );
        options
            .headers
            .insert(AUTHORIZATION_HEADER.to_owned(), token.bearer_header());
        options
    }

    async fn reconcile(
        &self,
        identity: &ResolvedIdentity,
        token: &AccessToken,
    ) -> Result<Option<UserId>, LoginError> {
        if let Some(existing) = self.store.find_by_external_id(&identity.id).await? {
            return self.refresh(existing, identity, token).await.map(Some);
        }

        match self.create(identity, token).await {
            Ok(user_id) => Ok(user_id),
            Err(UserStoreError::Conflict { external_id }) => {
                warn!(
                    %external_id,
                    "concurrent first login detected; reconciling against the winning record"
                );
                let existing = self
                    .store
                    .find_by_external_id(&identity.id)
                    .await?
                    .ok_or(UserStoreError::Conflict { external_id })?;
                self.refresh(existing, identity, token).await.map(Some)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn create(
        &self,
        identity: &ResolvedIdentity,
        token: &AccessToken,
    ) -> Result<Option<UserId>, UserStoreError> {
        self.config.debug_sink().debug(
            "inserting user",
            &json!({ EXTERNAL_ID_PATH: identity.id, "username": identity.username }),
        );
        let lea = LeaService {
            id: identity.id.clone(),
            access_token: token.expose().to_owned(),
            username: identity.username.clone(),
        };
        let user_id = self
            .store
            .insert(NewUserRecord::linked(lea, self.clock.utc()))
            .await?;
        debug!(%user_id, "user record created");

        let record = self.store.find_by_id(&user_id).await?;
        Ok(record.map(|stored| stored.id))
    }

    async fn refresh(
        &self,
        existing: UserRecord,
        identity: &ResolvedIdentity,
        token: &AccessToken,
    ) -> Result<UserId, LoginError> {
        let update = UserUpdate::diff(
            existing.services.lea.as_ref(),
            token.expose(),
            &identity.username,
            self.clock.utc(),
        );
        let fields: Vec<String> = update.to_set_document().keys().cloned().collect();
        self.config.debug_sink().debug(
            "updating user",
            &json!({
                "userId": existing.id,
                "fields": fields,
                "timestampOnly": update.touches_only_timestamp(),
            }),
        );
        self.store.update(&existing.id, &update).await?;
        debug!(user_id = %existing.id, "user record refreshed");
        Ok(existing.id)
    }
}

/// Top-level field names of the identity body; values may carry credentials.
fn response_fields(response: &IdentityHttpResponse) -> Option<Vec<&str>> {
    response
        .data
        .as_ref()
        .and_then(Value::as_object)
        .map(|body| body.keys().map(String::as_str).collect())
}

#[async_trait]
impl<S: UserStore> LoginHandler for LoginReconciler<S> {
    async fn try_login(
        &self,
        attempt: Option<&LoginAttempt>,
    ) -> Result<Option<LoginOutcome>, LoginError> {
        self.handle(attempt).await
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
