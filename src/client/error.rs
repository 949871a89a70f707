//! Error taxonomy for API exchanges.
//!
//! Every failure an [`ApiClient`](super::ApiClient) operation can encounter
//! terminates in exactly one [`ApiError`] variant; no transport error type
//! leaks to callers. Classification is total: unknown shapes fall through to
//! [`ApiError::Unknown`] with a generic message rather than failing the
//! normalization itself.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Fallback message when no server message or table entry applies.
pub const GENERIC_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Message for requests that exceeded their deadline.
pub const TIMEOUT_ERROR_MESSAGE: &str = "The request timed out.";

/// Message for transport-level connectivity failures.
pub const NETWORK_ERROR_MESSAGE: &str = "A network error occurred.";

/// Message when a successful response body cannot be decoded.
pub const DECODE_ERROR_MESSAGE: &str = "Failed to decode the server response.";

/// Message when a download succeeded but the body is not binary.
pub const NOT_BINARY_MESSAGE: &str = "The server did not return a valid file.";

/// Caller-visible failure for every API operation.
///
/// Variants carry a human-readable message drawn, in order of preference,
/// from the server's `{message}` body field, the status-keyed default table,
/// or a generic fallback.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401: the session is missing, expired, or invalid.
    #[error("{message}")]
    Unauthorized {
        /// Human-readable description.
        message: String,
    },

    /// HTTP 403: the session is valid but lacks permission.
    #[error("{message}")]
    Forbidden {
        /// Human-readable description.
        message: String,
    },

    /// HTTP 404: the resource does not exist.
    #[error("{message}")]
    NotFound {
        /// Human-readable description.
        message: String,
    },

    /// HTTP 5xx: the server failed to process the request.
    #[error("{message}")]
    ServerFault {
        /// The HTTP status code (500..=599).
        status: u16,
        /// Human-readable description.
        message: String,
    },

    /// The exchange exceeded its deadline.
    #[error("{message}")]
    Timeout {
        /// Human-readable description.
        message: String,
    },

    /// No response was received (DNS, connect, TLS, or connectivity failure).
    #[error("{message}")]
    NetworkUnavailable {
        /// Human-readable description.
        message: String,
    },

    /// A 4xx rejection carrying a server-supplied explanation.
    #[error("{message}")]
    ValidationFailed {
        /// The server's explanation of what was invalid.
        message: String,
    },

    /// Any failure not covered by a more specific variant.
    #[error("{message}")]
    Unknown {
        /// Human-readable description.
        message: String,
    },
}

/// Strict decode target for server error bodies.
///
/// Anything beyond a `{message}` field is ignored; a body that does not
/// decode into this shape contributes no message and classification falls
/// back to the default table.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Creates a timeout error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout {
            message: TIMEOUT_ERROR_MESSAGE.to_string(),
        }
    }

    /// Creates a connectivity error.
    #[must_use]
    pub fn network_unavailable() -> Self {
        Self::NetworkUnavailable {
            message: NETWORK_ERROR_MESSAGE.to_string(),
        }
    }

    /// Creates an unknown-failure error with a specific message.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Classifies a transport-level fault.
    ///
    /// Timeout takes priority over connectivity: a request that expired maps
    /// to [`ApiError::Timeout`] even though no response arrived.
    #[must_use]
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::timeout();
        }
        debug!(%error, "transport fault");
        Self::network_unavailable()
    }

    /// Classifies a failure status with an optional server-supplied message.
    ///
    /// The produced message prefers the server's wording, then the default
    /// table, then the generic fallback.
    #[must_use]
    pub fn from_status(status: u16, server_message: Option<String>) -> Self {
        let has_server_message = server_message.is_some();
        let message = server_message
            .or_else(|| default_status_message(status).map(str::to_string))
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());

        match status {
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            500..=599 => Self::ServerFault { status, message },
            400..=499 if has_server_message => Self::ValidationFailed { message },
            _ => Self::Unknown { message },
        }
    }

    /// Classifies a failure response, reading its JSON body for a message.
    ///
    /// Body read or decode failures are swallowed; they only mean no server
    /// message is available.
    pub async fn from_failure_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.bytes().await.ok();
        let message = body.as_deref().and_then(recover_message);
        Self::from_status(status, message)
    }

    /// Classifies a failed binary exchange, recovering a message from the
    /// non-binary error body the server substituted for the file.
    ///
    /// The recovery chain (UTF-8 decode, then JSON decode, then `{message}`
    /// extraction) short-circuits on the first success and swallows failures
    /// at every stage; the terminal fallback always produces a message.
    #[must_use]
    pub fn from_failure_blob(status: u16, body: &[u8]) -> Self {
        Self::from_status(status, recover_message(body))
    }
}

/// Attempts to recover a server message from raw body bytes.
///
/// Each step is fallible and falls through silently: non-UTF-8 bytes, bodies
/// that are not JSON, and JSON without a `message` field all yield `None`.
fn recover_message(body: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(body).ok()?;
    let decoded: ErrorBody = serde_json::from_str(text).ok()?;
    decoded.message.filter(|message| !message.is_empty())
}

/// Default user-facing message for a failure status.
///
/// Covers every status the backend is known to produce; other statuses fall
/// back to the generic message at the call site.
fn default_status_message(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("The request was invalid."),
        401 => Some("Authentication is required."),
        403 => Some("You do not have permission to access this resource."),
        404 => Some("The requested resource could not be found."),
        500 => Some("An internal server error occurred."),
        502 => Some("The server is temporarily unreachable."),
        503 => Some("The service is temporarily unavailable."),
        _ => None,
    }
}
