//! Integration tests for the cookie-backed session lifecycle.
//!
//! These run against the jar-backed credential store the library wires by
//! default, verifying the full journey: login sets the cookie, subsequent
//! requests carry the bearer credential, and a server-side rejection tears
//! the session down.

mod support;

use std::sync::Arc;

use cert_client_core::{
    ApiClient, ApiError, AuthResponse, CookieSessionStore, Navigator, SessionStore,
};
use serde_json::json;
use support::{RecordingNavigator, test_config};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct CookieFixture {
    client: ApiClient,
    store: Arc<CookieSessionStore>,
    navigator: Arc<RecordingNavigator>,
}

/// Builds a client whose credential store reads the transport's cookie jar,
/// as `ApiClient::new` does, but with a recording navigator.
fn cookie_client(base_url: &str) -> CookieFixture {
    let config = test_config(base_url);
    let parsed = Url::parse(base_url).expect("mock server URL parses");
    let jar = Arc::new(reqwest::cookie::Jar::default());
    let store = Arc::new(CookieSessionStore::new(Arc::clone(&jar), &parsed));
    let navigator = Arc::new(RecordingNavigator::default());

    let client = ApiClient::with_session(
        &config,
        jar,
        Arc::clone(&store) as Arc<dyn SessionStore>,
        Arc::clone(&navigator) as Arc<dyn Navigator>,
    )
    .expect("test client should build");

    CookieFixture {
        client,
        store,
        navigator,
    }
}

#[tokio::test]
async fn test_login_cookie_flows_into_bearer_header_until_401() {
    let server = MockServer::start().await;

    // Login sets the session cookie the way the backend's success handler does.
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "auth-token=jwt-777; Path=/")
                .set_body_json(json!({"userId": 7, "email": "user@example.com", "role": "USER"})),
        )
        .mount(&server)
        .await;

    // First identity check succeeds, the second is rejected.
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer jwt-777"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"userId": 7, "email": "user@example.com", "role": "USER"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let fixture = cookie_client(&server.uri());
    assert!(!fixture.client.is_authenticated());

    let _: AuthResponse = fixture
        .client
        .post(
            "/api/auth/login",
            &json!({"email": "user@example.com", "password": "hunter2"}),
        )
        .await
        .expect("login should succeed");

    // The Set-Cookie landed in the jar, so the store sees the credential.
    assert_eq!(fixture.store.get().as_deref(), Some("jwt-777"));
    assert!(fixture.client.is_authenticated());

    let me: AuthResponse = fixture
        .client
        .get("/api/auth/me")
        .await
        .expect("identity check should carry the credential");
    assert_eq!(me.user_id, 7);

    // Session invalidated server-side: credential cleared, redirect fired.
    let rejected: Result<AuthResponse, ApiError> = fixture.client.get("/api/auth/me").await;
    assert!(matches!(rejected, Err(ApiError::Unauthorized { .. })));
    assert_eq!(fixture.store.get(), None);
    assert!(!fixture.client.is_authenticated());
    assert_eq!(fixture.navigator.redirect_count(), 1);
}

#[tokio::test]
async fn test_unauthenticated_certificate_issue_stays_inline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/certificates/issue"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let fixture = cookie_client(&server.uri());
    let result: Result<serde_json::Value, ApiError> = fixture
        .client
        .post("/api/certificates/issue", &json!({"vin": "KMH123"}))
        .await;

    // The caller gets a typed error to render inline; nobody is evicted.
    match result {
        Err(ApiError::Unauthorized { message }) => {
            assert_eq!(message, "Authentication is required.");
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
    assert_eq!(fixture.navigator.redirect_count(), 0);
    assert_eq!(fixture.store.get(), None);
}

#[tokio::test]
async fn test_cleared_session_sends_next_request_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let fixture = cookie_client(&server.uri());
    fixture.store.set("jwt-777");

    let _: Result<AuthResponse, ApiError> = fixture.client.get("/api/auth/me").await;
    let _: Result<AuthResponse, ApiError> = fixture.client.get("/api/auth/me").await;

    let requests = server
        .received_requests()
        .await
        .expect("requests should be recorded");
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("authorization").is_some());
    assert!(
        requests[1].headers.get("authorization").is_none(),
        "after the 401 teardown the retry goes out unauthenticated"
    );
}
