//! Behavioural coverage for the login reconciliation flow.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use mockall::Sequence;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{
    IdentityHttpResponse, IdentityTransportError, MockIdentityTransport, MockUserStore,
    RecordingDebugSink,
};
use crate::domain::{DataShapeError, UserServices};

const IDENTITY_URL: &str = "https://id.example.test/api/user";
const USER_AGENT: &str = "bearer-login-tests/1.0";

fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 8, 15, 0)
        .single()
        .expect("valid fixture timestamp")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

#[fixture]
fn sink() -> Arc<RecordingDebugSink> {
    Arc::new(RecordingDebugSink::default())
}

fn options(transport: MockIdentityTransport, sink: Arc<RecordingDebugSink>) -> HandlerOptions {
    HandlerOptions::new()
        .identity_url(IDENTITY_URL)
        .user_agent(USER_AGENT)
        .http_get(Arc::new(transport))
        .debug(sink)
}

fn make_handler(
    options: HandlerOptions,
    store: MockUserStore,
) -> LoginReconciler<MockUserStore> {
    let clock = Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    });
    LoginReconciler::new(options, Arc::new(store), clock).expect("valid options")
}

fn attempt(value: Value) -> LoginAttempt {
    LoginAttempt::from_value(value).expect("object payload")
}

fn lea_attempt(token: &str) -> LoginAttempt {
    attempt(json!({ "lea": true, "accessToken": token }))
}

fn transport_returning(data: Value) -> MockIdentityTransport {
    let mut transport = MockIdentityTransport::new();
    transport
        .expect_get()
        .times(1)
        .return_once(move |_, _| Ok(IdentityHttpResponse::with_data(data)));
    transport
}

/// Sorted `fields` array of the last trace recorded under `label`.
fn traced_fields(sink: &RecordingDebugSink, label: &str) -> Vec<String> {
    let data = sink
        .traces()
        .into_iter()
        .rev()
        .find(|(traced, _)| traced == label)
        .map(|(_, data)| data)
        .expect("trace recorded");
    let mut fields: Vec<String> = data
        .get("fields")
        .and_then(Value::as_array)
        .expect("fields array")
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect();
    fields.sort();
    fields
}

fn stored_record(id: &str, external_id: &str, token: &str, username: &str) -> UserRecord {
    UserRecord {
        id: UserId::new(id),
        services: UserServices {
            lea: Some(LeaService {
                id: external_id.to_owned(),
                access_token: token.to_owned(),
                username: username.to_owned(),
            }),
        },
        created_at: fixture_timestamp() - chrono::Duration::days(30),
        updated_at: None,
    }
}

#[rstest]
#[case::no_attempt(None)]
#[case::empty(Some(json!({})))]
#[case::flag_only(Some(json!({ "lea": true })))]
#[case::token_only(Some(json!({ "accessToken": "T" })))]
#[case::other_service(Some(json!({ "password": "secret", "user": { "username": "bob" } })))]
#[case::empty_token(Some(json!({ "lea": true, "accessToken": "" })))]
#[case::numeric_token(Some(json!({ "lea": true, "accessToken": 7 })))]
#[tokio::test]
async fn skips_attempts_meant_for_other_handlers(
    sink: Arc<RecordingDebugSink>,
    #[case] payload: Option<Value>,
) {
    let mut transport = MockIdentityTransport::new();
    transport.expect_get().times(0);
    let handler = make_handler(options(transport, Arc::clone(&sink)), MockUserStore::new());

    let submitted = payload.map(attempt);
    let outcome = handler
        .handle(submitted.as_ref())
        .await
        .expect("skips are not errors");

    assert_eq!(outcome, None);
    assert!(sink.labels().is_empty(), "skips must not emit traces");
}

#[rstest]
#[tokio::test]
async fn fails_when_identity_has_no_id(sink: Arc<RecordingDebugSink>) {
    let handler = make_handler(
        options(transport_returning(json!({})), sink),
        MockUserStore::new(),
    );

    let err = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect_err("missing id must fail");

    assert_eq!(
        err.to_string(),
        "Invalid data result. Expected id, got <undefined> value."
    );
}

#[rstest]
#[tokio::test]
async fn fails_when_identity_response_has_no_body(sink: Arc<RecordingDebugSink>) {
    let mut transport = MockIdentityTransport::new();
    transport
        .expect_get()
        .times(1)
        .return_once(|_, _| Ok(IdentityHttpResponse::default()));
    let handler = make_handler(options(transport, sink), MockUserStore::new());

    let err = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect_err("missing body must fail");

    assert!(matches!(
        err,
        LoginError::DataShape(DataShapeError::MissingId { .. })
    ));
}

#[rstest]
#[tokio::test]
async fn fails_when_identity_has_no_username(sink: Arc<RecordingDebugSink>) {
    let handler = make_handler(
        options(transport_returning(json!({ "id": "X" })), Arc::clone(&sink)),
        MockUserStore::new(),
    );

    let err = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect_err("missing username must fail");

    assert_eq!(
        err.to_string(),
        "Invalid data result. Expected one of login, username or email, got <undefined> value."
    );
    assert!(!err.is_retryable());
    assert_eq!(
        sink.labels(),
        vec![
            "requesting identity".to_owned(),
            "identity response received".to_owned(),
        ]
    );
    assert_eq!(
        traced_fields(&sink, "identity response received"),
        vec!["id".to_owned()]
    );
}

#[rstest]
#[tokio::test]
async fn transport_failures_propagate_unmodified(sink: Arc<RecordingDebugSink>) {
    let mut transport = MockIdentityTransport::new();
    transport
        .expect_get()
        .times(1)
        .return_once(|_, _| Err(IdentityTransportError::status(401_u16, "token expired")));
    let handler = make_handler(options(transport, Arc::clone(&sink)), MockUserStore::new());

    let err = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect_err("transport failure must fail the login");

    match err {
        LoginError::Transport(source) => {
            assert_eq!(source, IdentityTransportError::status(401_u16, "token expired"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(sink.labels(), vec!["requesting identity".to_owned()]);
}

#[rstest]
#[tokio::test]
async fn inserts_a_record_for_an_unseen_identity(sink: Arc<RecordingDebugSink>) {
    let mut transport = MockIdentityTransport::new();
    transport
        .expect_get()
        .times(1)
        .withf(|url, options| {
            url == IDENTITY_URL
                && options.header("Accept") == Some("application/json")
                && options.header("User-Agent") == Some(USER_AGENT)
                && options.header("Authorization") == Some("Bearer T")
                && options.headers.len() == 3
        })
        .return_once(|_, _| {
            Ok(IdentityHttpResponse::with_data(
                json!({ "id": "X", "login": "bob", "email": "bob@example.test" }),
            ))
        });

    let mut store = MockUserStore::new();
    let mut seq = Sequence::new();
    store
        .expect_find_by_external_id()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|external_id| external_id == "X")
        .return_once(|_| Ok(None));
    store
        .expect_insert()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|record| {
            record.created_at == fixture_timestamp()
                && record.services.lea
                    == Some(LeaService {
                        id: "X".to_owned(),
                        access_token: "T".to_owned(),
                        username: "bob".to_owned(),
                    })
        })
        .return_once(|_| Ok(UserId::new("u-new")));
    store
        .expect_find_by_id()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|id| *id == UserId::new("u-new"))
        .return_once(|_| Ok(Some(stored_record("u-new", "X", "T", "bob"))));
    store.expect_update().times(0);

    let handler = make_handler(options(transport, Arc::clone(&sink)), store);
    let outcome = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect("login should succeed");

    assert_eq!(
        outcome,
        Some(LoginOutcome {
            user_id: Some(UserId::new("u-new"))
        })
    );
    assert_eq!(
        sink.labels(),
        vec![
            "requesting identity".to_owned(),
            "identity response received".to_owned(),
            "inserting user".to_owned(),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn returns_no_user_id_when_inserted_record_cannot_be_read_back(
    sink: Arc<RecordingDebugSink>,
) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_external_id()
        .times(1)
        .return_once(|_| Ok(None));
    store
        .expect_insert()
        .times(1)
        .return_once(|_| Ok(UserId::new("u-lost")));
    store.expect_find_by_id().times(1).return_once(|_| Ok(None));

    let handler = make_handler(
        options(transport_returning(json!({ "id": "X", "login": "bob" })), sink),
        store,
    );
    let outcome = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect("missing read-back is not an error");

    assert_eq!(outcome, Some(LoginOutcome { user_id: None }));
}

#[rstest]
#[tokio::test]
async fn refreshes_stale_values_on_an_existing_record(sink: Arc<RecordingDebugSink>) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_external_id()
        .times(1)
        .withf(|external_id| external_id == "X")
        .return_once(|_| Ok(Some(stored_record("u-1", "X", "stale-token", "old-name"))));
    store.expect_insert().times(0);
    store
        .expect_update()
        .times(1)
        .withf(|id, update| {
            *id == UserId::new("u-1")
                && update.updated_at == fixture_timestamp()
                && update.access_token.as_deref() == Some("T")
                && update.username.as_deref() == Some("bob")
        })
        .return_once(|_, _| Ok(()));

    let handler = make_handler(
        options(
            transport_returning(json!({ "id": "X", "login": "bob" })),
            Arc::clone(&sink),
        ),
        store,
    );
    let outcome = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect("login should succeed");

    assert_eq!(
        outcome,
        Some(LoginOutcome {
            user_id: Some(UserId::new("u-1"))
        })
    );
    assert_eq!(
        sink.labels().last().map(String::as_str),
        Some("updating user")
    );
    assert_eq!(
        traced_fields(&sink, "updating user"),
        vec![
            "services.lea.accessToken".to_owned(),
            "services.lea.username".to_owned(),
            "updatedAt".to_owned(),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn unchanged_identity_only_refreshes_the_timestamp(sink: Arc<RecordingDebugSink>) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_external_id()
        .times(1)
        .return_once(|_| Ok(Some(stored_record("u-1", "X", "T", "bob"))));
    store
        .expect_update()
        .times(1)
        .withf(|_, update| {
            update.touches_only_timestamp() && update.updated_at == fixture_timestamp()
        })
        .return_once(|_, _| Ok(()));

    let handler = make_handler(
        options(
            transport_returning(json!({ "id": "X", "login": "bob" })),
            Arc::clone(&sink),
        ),
        store,
    );
    let outcome = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect("login should succeed");

    assert_eq!(
        outcome.and_then(|outcome| outcome.user_id),
        Some(UserId::new("u-1"))
    );
    let (_, data) = sink.traces().pop().expect("update trace");
    assert_eq!(data.get("timestampOnly"), Some(&Value::Bool(true)));
    assert_eq!(
        traced_fields(&sink, "updating user"),
        vec!["updatedAt".to_owned()]
    );
}

#[rstest]
#[case("lea", "accessToken", "login", json!({ "lea": 1, "accessToken": "abc" }), "abc")]
#[case("acme", "token", "nickname", json!({ "acme": true, "token": "xyz" }), "xyz")]
#[case("sso", "bearer", "login", json!({ "sso": null, "bearer": "T 1" }), "T 1")]
#[tokio::test]
async fn authorization_header_carries_the_attempt_token(
    sink: Arc<RecordingDebugSink>,
    #[case] service_name: &str,
    #[case] token_name: &str,
    #[case] data_field: &str,
    #[case] payload: Value,
    #[case] token: &str,
) {
    let expected = format!("Bearer {token}");
    let mut transport = MockIdentityTransport::new();
    transport
        .expect_get()
        .times(1)
        .withf(move |_, options| options.header("Authorization") == Some(expected.as_str()))
        .return_once(|_, _| {
            Ok(IdentityHttpResponse::with_data(
                json!({ "id": "X", "username": "bob" }),
            ))
        });
    let mut store = MockUserStore::new();
    store
        .expect_find_by_external_id()
        .return_once(|_| Ok(Some(stored_record("u-1", "X", "old", "bob"))));
    store.expect_update().return_once(|_, _| Ok(()));

    let handler = make_handler(
        options(transport, sink)
            .service_name(service_name)
            .token_name(token_name)
            .data_field(data_field),
        store,
    );
    let outcome = handler
        .handle(Some(&attempt(payload)))
        .await
        .expect("login should succeed");

    assert!(outcome.is_some());
}

#[rstest]
#[tokio::test]
async fn recovers_from_a_concurrent_first_login(sink: Arc<RecordingDebugSink>) {
    let mut store = MockUserStore::new();
    let mut seq = Sequence::new();
    store
        .expect_find_by_external_id()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_| Ok(None));
    store
        .expect_insert()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_| Err(UserStoreError::conflict("X")));
    store
        .expect_find_by_external_id()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_| Ok(Some(stored_record("u-winner", "X", "T", "bob"))));
    store
        .expect_update()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|id, update| *id == UserId::new("u-winner") && update.touches_only_timestamp())
        .return_once(|_, _| Ok(()));
    store.expect_find_by_id().times(0);

    let handler = make_handler(
        options(transport_returning(json!({ "id": "X", "login": "bob" })), sink),
        store,
    );
    let outcome = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect("conflict should be reconciled");

    assert_eq!(
        outcome.and_then(|outcome| outcome.user_id),
        Some(UserId::new("u-winner"))
    );
}

#[rstest]
#[tokio::test]
async fn unresolved_conflicts_surface_as_retryable_store_errors(sink: Arc<RecordingDebugSink>) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_external_id()
        .times(2)
        .returning(|_| Ok(None));
    store
        .expect_insert()
        .times(1)
        .return_once(|_| Err(UserStoreError::conflict("X")));

    let handler = make_handler(
        options(transport_returning(json!({ "id": "X", "login": "bob" })), sink),
        store,
    );
    let err = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect_err("conflict without a winner must fail");

    assert!(matches!(
        err,
        LoginError::Store(UserStoreError::Conflict { .. })
    ));
    assert!(err.is_retryable());
}

#[rstest]
#[tokio::test]
async fn store_failures_reject_the_login(sink: Arc<RecordingDebugSink>) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_external_id()
        .times(1)
        .return_once(|_| Err(UserStoreError::connection("store offline")));
    store.expect_insert().times(0);

    let handler = make_handler(
        options(transport_returning(json!({ "id": "X", "login": "bob" })), sink),
        store,
    );
    let err = handler
        .handle(Some(&lea_attempt("T")))
        .await
        .expect_err("store failure must fail");

    assert_eq!(
        err.to_string(),
        "user store connection failed: store offline"
    );
}

#[rstest]
#[tokio::test]
async fn debug_traces_never_contain_the_token(sink: Arc<RecordingDebugSink>) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_external_id()
        .return_once(|_| Ok(Some(stored_record("u-1", "X", "old", "bob"))));
    store.expect_update().return_once(|_, _| Ok(()));
    let handler = make_handler(
        options(
            transport_returning(json!({
                "id": "X",
                "login": "bob",
                "accessToken": "very-secret-token",
            })),
            Arc::clone(&sink),
        ),
        store,
    );

    handler
        .handle(Some(&lea_attempt("very-secret-token")))
        .await
        .expect("login should succeed");

    let traces = sink.traces();
    assert_eq!(traces.len(), 3);
    for (label, data) in traces {
        assert!(
            !data.to_string().contains("very-secret-token"),
            "trace {label} leaked the token"
        );
    }
    assert_eq!(
        traced_fields(&sink, "identity response received"),
        vec!["accessToken".to_owned(), "id".to_owned(), "login".to_owned()]
    );
    assert_eq!(
        traced_fields(&sink, "updating user"),
        vec!["services.lea.accessToken".to_owned(), "updatedAt".to_owned()]
    );
}

#[test]
fn outcome_serialises_with_camel_case_user_id() {
    let outcome = LoginOutcome {
        user_id: Some(UserId::new("u-1")),
    };
    assert_eq!(
        serde_json::to_value(&outcome).expect("serialise"),
        json!({ "userId": "u-1" })
    );
    assert_eq!(
        serde_json::to_value(LoginOutcome { user_id: None }).expect("serialise"),
        json!({ "userId": null })
    );
}
