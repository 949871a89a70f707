//! Credential session storage.
//!
//! The bearer credential is owned by exactly one [`SessionStore`] per client.
//! Stores are infallible by contract: a missing or unreadable credential is
//! "absent", never an error, and clearing an absent credential is a no-op.
//!
//! Three implementations are provided:
//! - [`CookieSessionStore`] reads and clears the `auth-token` cookie in the
//!   client's shared cookie jar, mirroring how the server manages the session.
//! - [`FileSessionStore`] persists the token to disk so a CLI session
//!   survives across invocations.
//! - [`MemorySessionStore`] is an in-memory store for tests and composition.

use std::fmt;
use std::sync::Mutex;

mod cookie;
mod file;

pub use cookie::{AUTH_COOKIE_NAME, CookieSessionStore};
pub use file::{FileSessionStore, MirroredSessionStore};

/// Storage for the bearer credential.
///
/// Implementations never fail: absence is a valid state and `clear` is
/// idempotent. Tokens are sensitive and must not appear in logs or Debug
/// output.
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// Returns the current credential, or `None` when unauthenticated.
    fn get(&self) -> Option<String>;

    /// Replaces the stored credential.
    fn set(&self, token: &str);

    /// Removes the stored credential. A no-op when none is present.
    fn clear(&self);
}

/// In-memory credential store.
#[derive(Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with a token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<String> {
        self.lock().clone()
    }

    fn set(&self, token: &str) {
        *self.lock() = Some(token.to_string());
    }

    fn clear(&self) {
        *self.lock() = None;
    }
}

// Custom Debug impl that redacts the token value.
impl fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("token", &self.lock().as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
