//! Pre-send and post-receive hooks wrapped around every exchange.
//!
//! The pre-send hook attaches the bearer credential when one is stored; the
//! post-receive hook reacts to authentication failure by tearing down the
//! session and, unless the request path is exempt, handing control to the
//! [`Navigator`] so the host application can send the user back to login.

use std::fmt;
use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, warn};

use crate::session::SessionStore;

/// Host-supplied handler for the "send the user to login" side effect.
///
/// In a browser this would be a full-page navigation; other hosts decide for
/// themselves what leaving the current flow means.
pub trait Navigator: Send + Sync + fmt::Debug {
    /// Invoked at most once per failed exchange, after the credential has
    /// been cleared.
    fn redirect_to_login(&self);
}

/// Default navigator: records the eviction in the log and nothing else.
///
/// Library consumers that embed the client in an interactive host should
/// install their own [`Navigator`].
#[derive(Debug, Default)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn redirect_to_login(&self) {
        warn!("session rejected by server; sign in again to continue");
    }
}

/// Ordered hook pair applied implicitly to every client operation.
#[derive(Debug, Clone)]
pub struct Pipeline {
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    redirect_exempt_paths: Vec<String>,
}

impl Pipeline {
    /// Creates a pipeline over a credential store and navigator.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        redirect_exempt_paths: Vec<String>,
    ) -> Self {
        Self {
            store,
            navigator,
            redirect_exempt_paths,
        }
    }

    /// Pre-send hook: attaches the bearer credential when one is present.
    ///
    /// Requests without a stored credential go out unauthenticated; signup
    /// and login legitimately need that.
    #[must_use]
    pub fn attach_credential(&self, request: RequestBuilder) -> RequestBuilder {
        match self.store.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Post-receive hook for failed exchanges.
    ///
    /// Only a 401 mutates shared state: the credential is cleared first, then
    /// the redirect fires unless the path is exempt. All other statuses (and
    /// transport faults, which arrive with no status) pass through untouched
    /// for the caller's error classification.
    pub fn handle_failure(&self, status: Option<StatusCode>, path: &str) {
        if status != Some(StatusCode::UNAUTHORIZED) {
            return;
        }

        self.store.clear();

        if self.is_redirect_exempt(path) {
            debug!(path, "401 on redirect-exempt path; surfacing to caller without redirect");
        } else {
            self.navigator.redirect_to_login();
        }
    }

    /// Whether a stored credential is currently present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.store.get().is_some()
    }

    /// Clears the credential and fires the login redirect unconditionally.
    ///
    /// Used for explicit logout, where eviction is the point.
    pub fn end_session(&self) {
        self.store.clear();
        self.navigator.redirect_to_login();
    }

    /// Returns the credential store this pipeline owns.
    #[must_use]
    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    fn is_redirect_exempt(&self, path: &str) -> bool {
        self.redirect_exempt_paths
            .iter()
            .any(|exempt| path.contains(exempt.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use std::sync::Mutex;

    /// Records session events in order so hook sequencing can be asserted.
    #[derive(Debug, Default)]
    struct EventLog {
        events: Mutex<Vec<&'static str>>,
    }

    impl EventLog {
        fn push(&self, event: &'static str) {
            self.events
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(event);
        }

        fn events(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }
    }

    #[derive(Debug)]
    struct LoggedStore {
        inner: MemorySessionStore,
        log: Arc<EventLog>,
    }

    impl SessionStore for LoggedStore {
        fn get(&self) -> Option<String> {
            self.inner.get()
        }

        fn set(&self, token: &str) {
            self.inner.set(token);
        }

        fn clear(&self) {
            self.log.push("clear");
            self.inner.clear();
        }
    }

    #[derive(Debug)]
    struct LoggedNavigator {
        log: Arc<EventLog>,
    }

    impl Navigator for LoggedNavigator {
        fn redirect_to_login(&self) {
            self.log.push("redirect");
        }
    }

    fn logged_pipeline(token: Option<&str>, exempt: Vec<String>) -> (Pipeline, Arc<EventLog>) {
        let log = Arc::new(EventLog::default());
        let inner = match token {
            Some(token) => MemorySessionStore::with_token(token),
            None => MemorySessionStore::new(),
        };
        let store = Arc::new(LoggedStore {
            inner,
            log: Arc::clone(&log),
        });
        let navigator = Arc::new(LoggedNavigator {
            log: Arc::clone(&log),
        });
        (Pipeline::new(store, navigator, exempt), log)
    }

    fn default_exempt() -> Vec<String> {
        vec!["/api/certificates/issue".to_string()]
    }

    #[tokio::test]
    async fn test_attach_credential_adds_bearer_header() {
        let (pipeline, _) = logged_pipeline(Some("jwt-123"), default_exempt());
        let client = reqwest::Client::new();

        let request = pipeline
            .attach_credential(client.get("http://localhost/api/auth/me"))
            .build()
            .expect("request should build");

        let header = request
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .expect("authorization header should be set");
        assert_eq!(header.to_str().expect("ascii header"), "Bearer jwt-123");
    }

    #[tokio::test]
    async fn test_attach_credential_absent_sends_unauthenticated() {
        let (pipeline, _) = logged_pipeline(None, default_exempt());
        let client = reqwest::Client::new();

        let request = pipeline
            .attach_credential(client.post("http://localhost/api/auth/login"))
            .build()
            .expect("request should build");

        assert!(
            request
                .headers()
                .get(reqwest::header::AUTHORIZATION)
                .is_none()
        );
    }

    #[test]
    fn test_401_clears_credential_then_redirects() {
        let (pipeline, log) = logged_pipeline(Some("jwt-123"), default_exempt());

        pipeline.handle_failure(Some(StatusCode::UNAUTHORIZED), "/api/auth/me");

        assert_eq!(log.events(), vec!["clear", "redirect"]);
        assert!(!pipeline.is_authenticated());
    }

    #[test]
    fn test_401_on_exempt_path_clears_without_redirect() {
        let (pipeline, log) = logged_pipeline(Some("jwt-123"), default_exempt());

        pipeline.handle_failure(Some(StatusCode::UNAUTHORIZED), "/api/certificates/issue");

        assert_eq!(log.events(), vec!["clear"]);
        assert!(!pipeline.is_authenticated());
    }

    #[test]
    fn test_exempt_match_is_substring_based() {
        let (pipeline, log) = logged_pipeline(Some("jwt-123"), default_exempt());

        pipeline.handle_failure(
            Some(StatusCode::UNAUTHORIZED),
            "http://localhost:8080/api/certificates/issue?draft=true",
        );

        assert_eq!(log.events(), vec!["clear"]);
    }

    #[test]
    fn test_custom_exempt_set_is_honored() {
        let (pipeline, log) =
            logged_pipeline(Some("jwt-123"), vec!["/api/probe".to_string()]);

        pipeline.handle_failure(Some(StatusCode::UNAUTHORIZED), "/api/probe/session");
        assert_eq!(log.events(), vec!["clear"]);

        pipeline.handle_failure(Some(StatusCode::UNAUTHORIZED), "/api/certificates/issue");
        assert_eq!(log.events(), vec!["clear", "clear", "redirect"]);
    }

    #[test]
    fn test_non_401_failure_leaves_credential_untouched() {
        let (pipeline, log) = logged_pipeline(Some("jwt-123"), default_exempt());

        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            pipeline.handle_failure(Some(status), "/api/auth/me");
        }

        assert!(log.events().is_empty());
        assert!(pipeline.is_authenticated());
    }

    #[test]
    fn test_transport_fault_without_status_is_ignored() {
        let (pipeline, log) = logged_pipeline(Some("jwt-123"), default_exempt());

        pipeline.handle_failure(None, "/api/auth/me");

        assert!(log.events().is_empty());
        assert!(pipeline.is_authenticated());
    }

    #[test]
    fn test_end_session_clears_and_redirects() {
        let (pipeline, log) = logged_pipeline(Some("jwt-123"), default_exempt());

        pipeline.end_session();

        assert_eq!(log.events(), vec!["clear", "redirect"]);
        assert!(!pipeline.is_authenticated());
    }
}
