//! Cookie-jar-backed credential store.
//!
//! The server establishes a session by setting an `auth-token` cookie on the
//! login response. Because the jar here is the same one installed as the HTTP
//! client's cookie provider, that `Set-Cookie` lands in this store without any
//! extra plumbing, and clearing works the same way a browser clears a cookie:
//! by inserting an already-expired replacement on path `/`.

use std::fmt;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, warn};
use url::Url;

use super::SessionStore;

/// Name of the session cookie set by the server on successful login.
pub const AUTH_COOKIE_NAME: &str = "auth-token";

/// Credential store backed by a shared `reqwest` cookie jar.
pub struct CookieSessionStore {
    jar: Arc<Jar>,
    /// Origin used for jar lookups: the base URL with its path reset to `/`,
    /// matching the cookie's scope.
    origin: Url,
}

impl CookieSessionStore {
    /// Creates a store over the given jar, scoped to the base URL's origin.
    #[must_use]
    pub fn new(jar: Arc<Jar>, base_url: &Url) -> Self {
        let mut origin = base_url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        Self { jar, origin }
    }

    /// Extracts the auth-token value from a `Cookie` header string.
    ///
    /// Returns `None` for malformed entries rather than failing.
    fn token_from_cookie_header(header: &str) -> Option<String> {
        header.split(';').find_map(|entry| {
            let (name, value) = entry.trim().split_once('=')?;
            (name == AUTH_COOKIE_NAME && !value.is_empty()).then(|| value.to_string())
        })
    }
}

impl SessionStore for CookieSessionStore {
    fn get(&self) -> Option<String> {
        let header = self.jar.cookies(&self.origin)?;
        let Ok(header) = header.to_str() else {
            warn!("cookie header contained non-UTF-8 data; treating session as absent");
            return None;
        };
        Self::token_from_cookie_header(header)
    }

    fn set(&self, token: &str) {
        self.jar.add_cookie_str(
            &format!("{AUTH_COOKIE_NAME}={token}; Path=/"),
            &self.origin,
        );
        debug!("session cookie stored");
    }

    fn clear(&self) {
        // An expired replacement removes the cookie from the jar. Idempotent:
        // inserting it again when nothing is stored changes nothing.
        let expired = httpdate::fmt_http_date(UNIX_EPOCH);
        self.jar.add_cookie_str(
            &format!("{AUTH_COOKIE_NAME}=; Path=/; Max-Age=0; Expires={expired}"),
            &self.origin,
        );
        debug!("session cookie cleared");
    }
}

// Custom Debug impl that never exposes the token value.
impl fmt::Debug for CookieSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSessionStore")
            .field("origin", &self.origin.as_str())
            .field("token", &self.get().map(|_| "[REDACTED]"))
            .finish()
    }
}
