//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cert_client_core::{
    ApiClient, ClientConfig, MemorySessionStore, Navigator, ProgressCallback, SessionStore,
};
use reqwest::cookie::Jar;

/// Navigator that counts login redirects instead of navigating.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: AtomicUsize,
}

impl RecordingNavigator {
    pub fn redirect_count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// A client bundled with its injected session parts for assertions.
pub struct TestClient {
    pub client: ApiClient,
    pub store: Arc<MemorySessionStore>,
    pub navigator: Arc<RecordingNavigator>,
}

/// Configuration pointed at a mock server, with deadlines short enough for
/// timeout tests.
pub fn test_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::with_base_url(base_url);
    config.request_timeout_secs = 1;
    config.download_timeout_secs = 1;
    config
}

/// Builds a client over an in-memory store and a recording navigator.
pub fn client_for(config: &ClientConfig) -> TestClient {
    let store = Arc::new(MemorySessionStore::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let client = ApiClient::with_session(
        config,
        Arc::new(Jar::default()),
        Arc::clone(&store) as Arc<dyn SessionStore>,
        Arc::clone(&navigator) as Arc<dyn Navigator>,
    )
    .expect("test client should build");
    TestClient {
        client,
        store,
        navigator,
    }
}

/// Builds a client that already holds a credential.
pub fn authenticated_client(base_url: &str, token: &str) -> TestClient {
    let fixture = client_for(&test_config(base_url));
    fixture.store.set(token);
    fixture
}

/// A progress callback that records every reported percentage.
pub fn recording_progress() -> (ProgressCallback, Arc<std::sync::Mutex<Vec<u8>>>) {
    let reported: Arc<std::sync::Mutex<Vec<u8>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&reported);
    let callback: ProgressCallback = Arc::new(move |percent| {
        sink.lock().expect("progress sink lock").push(percent);
    });
    (callback, reported)
}
