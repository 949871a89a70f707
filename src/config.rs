//! Client configuration: base address, timeouts, and redirect policy.
//!
//! All values have defaults matching the backend's development setup and can
//! be overridden per instance. The base address additionally honors the
//! `CERT_API_URL` environment variable so deployments can repoint the client
//! without code changes.

/// Default API origin used when no override is supplied.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const BASE_URL_ENV_VAR: &str = "CERT_API_URL";

/// Connect timeout for the shared HTTP transport, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total request timeout for standard JSON calls, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Total request timeout for binary downloads, in seconds.
///
/// PDF generation on the server side can be slow, so downloads get a longer
/// window than standard calls.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Paths exempt from the global 401 login redirect by default.
///
/// Certificate issuance may legitimately probe authentication state while the
/// user is mid-form; evicting them to the login page would lose their input.
pub const DEFAULT_REDIRECT_EXEMPT_PATHS: &[&str] = &["/api/certificates/issue"];

/// Configuration for [`ApiClient`](crate::client::ApiClient) construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Total timeout for standard JSON calls in seconds.
    pub request_timeout_secs: u64,
    /// Total timeout for binary downloads in seconds.
    pub download_timeout_secs: u64,
    /// Request paths whose 401 responses must not trigger a login redirect.
    ///
    /// A path matches when it contains an entry as a substring.
    pub redirect_exempt_paths: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            redirect_exempt_paths: DEFAULT_REDIRECT_EXEMPT_PATHS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with the given base URL and default timeouts.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration from the environment.
    ///
    /// Reads [`BASE_URL_ENV_VAR`] for the base address and falls back to
    /// [`DEFAULT_BASE_URL`] when unset or empty.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_base_url_override(std::env::var(BASE_URL_ENV_VAR).ok())
    }

    /// Applies an optional base-URL override on top of the defaults.
    ///
    /// Blank overrides are treated as absent.
    #[must_use]
    pub fn from_base_url_override(base_url: Option<String>) -> Self {
        match base_url
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            Some(base_url) => Self::with_base_url(base_url),
            None => Self::default(),
        }
    }
}
