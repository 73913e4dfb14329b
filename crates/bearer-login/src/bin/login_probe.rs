//! Run bearer-token login attempts against a live identity endpoint.
//!
//! Handler and client settings come from `LEA_LOGIN_*` / `IDENTITY_CLIENT_*`
//! environment variables or configuration files. Records are kept in memory,
//! so repeated attempts within one run exercise the update path.

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::num::NonZeroU32;
use std::sync::Arc;

use bearer_login::domain::ports::TracingDebugSink;
use bearer_login::domain::{LoginAttempt, LoginDispatcher, LoginReconciler};
use bearer_login::outbound::identity::ReqwestIdentityTransport;
use bearer_login::outbound::store::InMemoryUserStore;
use bearer_login::settings::{IdentityClientSettings, LoginHandlerSettings};
use clap::Parser;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use serde_json::{Map, Value};
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
use zeroize::Zeroizing;

const PROGRAM_NAME: &str = "login-probe";

/// `login-probe` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "login-probe",
    about = "Authenticate a bearer access token and reconcile it into an in-memory user store",
    version
)]
struct CliArgs {
    /// Bearer token to authenticate. Read from the first line of stdin when
    /// omitted.
    #[arg(long = "access-token", value_name = "token")]
    access_token: Option<String>,
    /// Identity endpoint override for this run.
    #[arg(long = "identity-url", value_name = "url")]
    identity_url: Option<String>,
    /// Number of consecutive attempts to run with the same token.
    #[arg(long = "repeat", value_name = "count", default_value = "1")]
    repeat: NonZeroU32,
}

fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let token = resolve_access_token(args.access_token)?;

    let handler_settings = LoginHandlerSettings::load_from_iter([OsString::from(PROGRAM_NAME)])
        .map_err(|error| io::Error::other(format!("load handler settings: {error}")))?;
    let client_settings = IdentityClientSettings::load_from_iter([OsString::from(PROGRAM_NAME)])
        .map_err(|error| io::Error::other(format!("load identity client settings: {error}")))?;

    let transport = ReqwestIdentityTransport::from_settings(&client_settings)
        .map_err(|error| io::Error::other(format!("create identity client: {error}")))?;
    let mut options = handler_settings
        .to_options()
        .http_get(Arc::new(transport))
        .debug(Arc::new(TracingDebugSink));
    if let Some(url) = args.identity_url {
        options = options.identity_url(url);
    }

    let store = Arc::new(InMemoryUserStore::new());
    let handler = LoginReconciler::new(options, Arc::clone(&store), Arc::new(DefaultClock))
        .map_err(|error| io::Error::other(format!("invalid handler settings: {error}")))?;
    let attempt = build_attempt(&handler, &token);

    let mut dispatcher = LoginDispatcher::new();
    dispatcher
        .register_default(Arc::new(handler))
        .map_err(io::Error::other)?;

    let mut out = io::stdout().lock();
    for round in 1..=args.repeat.get() {
        let login = dispatcher
            .dispatch(&attempt)
            .await
            .map_err(|error| io::Error::other(format!("login attempt {round} failed: {error}")))?;
        writeln!(out, "attempt={round}")?;
        writeln!(out, "handler={}", login.handler)?;
        writeln!(out, "user_id={}", login.user_id)?;
    }
    writeln!(
        out,
        "stored_users={}",
        store.len().map_err(io::Error::other)?
    )?;

    Ok(())
}

fn build_attempt<S>(handler: &LoginReconciler<S>, token: &str) -> LoginAttempt {
    let config = handler.config();
    let mut attributes = Map::new();
    attributes.insert(config.service_name().to_owned(), Value::Bool(true));
    attributes.insert(config.token_name().to_owned(), Value::String(token.to_owned()));
    LoginAttempt::new(attributes)
}

fn resolve_access_token(explicit: Option<String>) -> io::Result<Zeroizing<String>> {
    let raw = match explicit {
        Some(value) => Zeroizing::new(value),
        None => {
            let mut line = Zeroizing::new(String::new());
            io::stdin().lock().read_line(&mut line)?;
            line
        }
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "an access token is required via --access-token or stdin",
        ));
    }
    Ok(Zeroizing::new(trimmed.to_owned()))
}
