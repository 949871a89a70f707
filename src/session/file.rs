//! File-backed credential persistence for CLI sessions.
//!
//! A browser keeps the session cookie between page loads; a CLI process does
//! not. [`FileSessionStore`] writes the token to a file so the next invocation
//! can resume the session, and [`MirroredSessionStore`] layers it under the
//! jar-backed store so the in-process jar stays the source of truth while the
//! file mirrors it.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use super::SessionStore;

/// Credential store persisted to a single file.
///
/// IO failures are logged and degrade to "absent"; they never propagate.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store persisting to the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<String> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let token = contents.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    fn set(&self, token: &str) {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(error) = fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), %error, "failed to create session directory");
            return;
        }
        match fs::write(&self.path, token) {
            Ok(()) => debug!(path = %self.path.display(), "session token persisted"),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "failed to persist session token");
            }
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "session token file removed"),
            // Already absent: clearing twice must behave like clearing once.
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %self.path.display(), %error, "failed to remove session token file");
            }
        }
    }
}

impl fmt::Debug for FileSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSessionStore")
            .field("path", &self.path)
            .finish()
    }
}

/// Primary store mirrored to a persistent one.
///
/// Reads prefer the primary (the live cookie jar) and fall back to the
/// mirror, rehydrating the primary so subsequent requests also send the
/// session cookie. Writes and clears go to both.
#[derive(Debug)]
pub struct MirroredSessionStore {
    primary: Arc<dyn SessionStore>,
    mirror: Arc<dyn SessionStore>,
}

impl MirroredSessionStore {
    /// Creates a mirrored store.
    #[must_use]
    pub fn new(primary: Arc<dyn SessionStore>, mirror: Arc<dyn SessionStore>) -> Self {
        Self { primary, mirror }
    }
}

impl SessionStore for MirroredSessionStore {
    fn get(&self) -> Option<String> {
        if let Some(token) = self.primary.get() {
            return Some(token);
        }
        let token = self.mirror.get()?;
        debug!("restoring session from mirror store");
        self.primary.set(&token);
        Some(token)
    }

    fn set(&self, token: &str) {
        self.primary.set(token);
        self.mirror.set(token);
    }

    fn clear(&self) {
        self.primary.clear();
        self.mirror.clear();
    }
}
