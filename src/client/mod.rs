//! Shared HTTP access layer for the certificate API.
//!
//! [`ApiClient`] wraps a single `reqwest::Client` configured once per
//! instance: connect/read timeouts, gzip, and a cookie jar shared with the
//! credential store. Every operation runs through the interceptor pipeline
//! implicitly; callers never attach or clear credentials themselves and never
//! see a transport error type, only [`ApiError`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::session::{CookieSessionStore, SessionStore};

pub mod error;
mod interceptor;
mod progress;

pub use error::{
    ApiError, DECODE_ERROR_MESSAGE, GENERIC_ERROR_MESSAGE, NETWORK_ERROR_MESSAGE,
    NOT_BINARY_MESSAGE, TIMEOUT_ERROR_MESSAGE,
};
pub use interceptor::{LoggingNavigator, Navigator, Pipeline};
pub use progress::ProgressCallback;

use progress::{TransferProgress, tracked_body};

/// Multipart field name for single-file uploads.
const SINGLE_UPLOAD_FIELD: &str = "file";

/// Multipart field name for multi-file uploads (repeated per file).
const MULTI_UPLOAD_FIELD: &str = "files";

/// Errors constructing an [`ApiClient`].
///
/// Distinct from [`ApiError`]: these are configuration faults surfaced once
/// at startup, not per-exchange failures.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The configured base URL does not parse.
    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        /// The offending URL string.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// The HTTP transport could not be initialized.
    #[error("failed to initialize HTTP transport: {source}")]
    Transport {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

/// A file payload for multipart upload.
#[derive(Clone)]
pub struct UploadFile {
    /// Name reported in the multipart `filename` attribute.
    pub file_name: String,
    /// Optional MIME type; `multipart/form-data` defaults apply when absent.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Creates a payload from in-memory bytes.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    /// Sets the MIME type for the part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Reads a payload from disk, using the file's name as the part name.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the file cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self, std::io::Error> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
        Ok(Self::new(file_name, bytes))
    }
}

// Debug shows the size, not the contents.
impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .finish()
    }
}

/// A successfully downloaded binary body.
#[derive(Clone)]
pub struct BinaryPayload {
    /// The raw body bytes.
    pub bytes: Vec<u8>,
    /// The response `Content-Type`, when present.
    pub content_type: Option<String>,
}

impl fmt::Debug for BinaryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryPayload")
            .field("content_type", &self.content_type)
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .finish()
    }
}

/// Outcome of one HTTP exchange before error normalization.
enum ExchangeFailure {
    /// The request never produced a response.
    Transport(reqwest::Error),
    /// The server answered with a failure status.
    Failure(Response),
}

/// Shared client for all certificate API traffic.
///
/// Cheap to clone: clones share the connection pool, the credential store,
/// and the pipeline configuration.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    pipeline: Pipeline,
    download_timeout: Duration,
}

impl ApiClient {
    /// Creates a client with the default session wiring: a fresh cookie jar
    /// backing both the transport and the credential store, and a logging
    /// navigator.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the base URL is invalid or the
    /// transport cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientBuildError> {
        let base_url = parse_base_url(&config.base_url)?;
        let jar = Arc::new(Jar::default());
        let store: Arc<dyn SessionStore> =
            Arc::new(CookieSessionStore::new(Arc::clone(&jar), &base_url));
        Self::with_session(config, jar, store, Arc::new(LoggingNavigator))
    }

    /// Creates a client with injected session parts.
    ///
    /// The jar must be the one the credential store reads when the store is
    /// cookie-backed, so the server's `Set-Cookie` on login is visible to
    /// both the transport and the store.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the base URL is invalid or the
    /// transport cannot be built.
    pub fn with_session(
        config: &ClientConfig,
        cookie_jar: Arc<Jar>,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientBuildError> {
        let base_url = parse_base_url(&config.base_url)?;
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .cookie_provider(cookie_jar)
            .build()
            .map_err(|source| ClientBuildError::Transport { source })?;

        Ok(Self {
            http,
            base_url,
            pipeline: Pipeline::new(store, navigator, config.redirect_exempt_paths.clone()),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        })
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a credential is currently stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.pipeline.is_authenticated()
    }

    /// Returns the credential store shared with this client.
    #[must_use]
    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        self.pipeline.store()
    }

    /// Clears the credential and fires the login redirect.
    ///
    /// This is the explicit-logout teardown; server communication is the
    /// caller's concern.
    pub fn end_session(&self) {
        self.pipeline.end_session();
    }

    /// Sends a GET request and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for any transport fault, failure status, or
    /// undecodable response body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .dispatch_json::<()>(Method::GET, path, None, None)
            .await?;
        decode_json(response).await
    }

    /// Sends a GET request with a per-request timeout override.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`get`](Self::get); expiry of the override
    /// maps to [`ApiError::Timeout`].
    pub async fn get_with_timeout<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let response = self
            .dispatch_json::<()>(Method::GET, path, None, Some(timeout))
            .await?;
        decode_json(response).await
    }

    /// Sends a POST request with a JSON body and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for any transport fault, failure status, or
    /// undecodable response body.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .dispatch_json(Method::POST, path, Some(body), None)
            .await?;
        decode_json(response).await
    }

    /// Sends a body-less POST request and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`post`](Self::post).
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .dispatch_json::<()>(Method::POST, path, None, None)
            .await?;
        decode_json(response).await
    }

    /// Sends a PUT request with a JSON body and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`post`](Self::post).
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .dispatch_json(Method::PUT, path, Some(body), None)
            .await?;
        decode_json(response).await
    }

    /// Sends a PATCH request with a JSON body and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`post`](Self::post).
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .dispatch_json(Method::PATCH, path, Some(body), None)
            .await?;
        decode_json(response).await
    }

    /// Sends a DELETE request and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`get`](Self::get).
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .dispatch_json::<()>(Method::DELETE, path, None, None)
            .await?;
        decode_json(response).await
    }

    /// Sends a DELETE request carrying a JSON body.
    ///
    /// The account-deletion endpoint requires password confirmation in the
    /// request body.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`post`](Self::post).
    pub async fn delete_with_body<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .dispatch_json(Method::DELETE, path, Some(body), None)
            .await?;
        decode_json(response).await
    }

    /// Uploads a single file as `multipart/form-data` under the `file` field.
    ///
    /// When `on_progress` is supplied it receives `floor(loaded * 100 /
    /// total)` as the transport sends the body, once per distinct value.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for any transport fault, failure status, or
    /// undecodable response body.
    #[instrument(level = "debug", skip(self, file, on_progress), fields(file = %file.file_name))]
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file: UploadFile,
        on_progress: Option<ProgressCallback>,
    ) -> Result<T, ApiError> {
        let progress = TransferProgress::for_total(file.bytes.len() as u64, on_progress);
        let form = Form::new().part(SINGLE_UPLOAD_FIELD, multipart_part(file, progress)?);
        let response = self.dispatch_multipart(path, form).await?;
        decode_json(response).await
    }

    /// Uploads several files under the repeated `files` field.
    ///
    /// The progress callback covers the whole request: percentages are
    /// computed against the summed size of all files.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`upload`](Self::upload).
    #[instrument(level = "debug", skip(self, files, on_progress), fields(files = files.len()))]
    pub async fn upload_multiple<T: DeserializeOwned>(
        &self,
        path: &str,
        files: Vec<UploadFile>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<T, ApiError> {
        let total: u64 = files.iter().map(|file| file.bytes.len() as u64).sum();
        let progress = TransferProgress::for_total(total, on_progress);

        let mut form = Form::new();
        for file in files {
            form = form.part(MULTI_UPLOAD_FIELD, multipart_part(file, progress.clone())?);
        }

        let response = self.dispatch_multipart(path, form).await?;
        decode_json(response).await
    }

    /// Downloads a binary body, e.g. a generated certificate PDF.
    ///
    /// Uses the longer download timeout. On success the body must actually be
    /// binary: a JSON or text body behind a 2xx status means the endpoint is
    /// misconfigured and yields [`ApiError::Unknown`]. On failure the error
    /// body replaced the expected file, so its bytes run through the ordered
    /// message-recovery chain before classification.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for any transport fault, failure status, or a
    /// non-binary success body.
    #[instrument(level = "debug", skip(self))]
    pub async fn download(&self, path: &str) -> Result<BinaryPayload, ApiError> {
        let request = self
            .http
            .get(self.url_for(path)?)
            .timeout(self.download_timeout);

        let response = match self.exchange(request, path).await {
            Ok(response) => response,
            Err(ExchangeFailure::Transport(error)) => return Err(ApiError::from_transport(&error)),
            Err(ExchangeFailure::Failure(response)) => {
                let status = response.status().as_u16();
                let body = response
                    .bytes()
                    .await
                    .map(|bytes| bytes.to_vec())
                    .unwrap_or_default();
                return Err(ApiError::from_failure_blob(status, &body));
            }
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ApiError::from_transport(&error))?
            .to_vec();

        if !is_binary_content_type(content_type.as_deref()) {
            warn!(
                path,
                content_type = content_type.as_deref().unwrap_or("<none>"),
                "successful download returned a non-binary body"
            );
            return Err(ApiError::unknown(NOT_BINARY_MESSAGE));
        }

        debug!(path, bytes = bytes.len(), "download complete");
        Ok(BinaryPayload {
            bytes,
            content_type,
        })
    }

    /// Builds and runs a JSON request through the pipeline.
    async fn dispatch_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        timeout: Option<Duration>,
    ) -> Result<Response, ApiError> {
        let mut request = self.http.request(method, self.url_for(path)?);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        match self.exchange(request, path).await {
            Ok(response) => Ok(response),
            Err(ExchangeFailure::Transport(error)) => Err(ApiError::from_transport(&error)),
            Err(ExchangeFailure::Failure(response)) => {
                Err(ApiError::from_failure_response(response).await)
            }
        }
    }

    /// Builds and runs a multipart request through the pipeline.
    async fn dispatch_multipart(&self, path: &str, form: Form) -> Result<Response, ApiError> {
        let request = self.http.post(self.url_for(path)?).multipart(form);

        match self.exchange(request, path).await {
            Ok(response) => Ok(response),
            Err(ExchangeFailure::Transport(error)) => Err(ApiError::from_transport(&error)),
            Err(ExchangeFailure::Failure(response)) => {
                Err(ApiError::from_failure_response(response).await)
            }
        }
    }

    /// Runs one exchange: pre-send hook, transport, post-receive hook.
    async fn exchange(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Response, ExchangeFailure> {
        let request = self.pipeline.attach_credential(request);

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                // Transport faults reach the post-receive hook with no
                // status; only authentication failures mutate state there.
                self.pipeline.handle_failure(None, path);
                return Err(ExchangeFailure::Transport(error));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(path, status = status.as_u16(), "exchange succeeded");
            return Ok(response);
        }

        warn!(path, status = status.as_u16(), "exchange failed");
        self.pipeline.handle_failure(Some(status), path);
        Err(ExchangeFailure::Failure(response))
    }

    /// Resolves a request path against the base URL.
    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let absolute = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&absolute).map_err(|_| ApiError::unknown(format!("invalid request path: {path}")))
    }
}

/// Decodes a successful response body as JSON.
///
/// Empty bodies decode as JSON `null` so unit and `Option` payload targets
/// still succeed for endpoints that return no content.
async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|error| ApiError::from_transport(&error))?;
    let slice: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    serde_json::from_slice(slice).map_err(|error| {
        debug!(%error, "failed to decode success response body");
        ApiError::unknown(DECODE_ERROR_MESSAGE)
    })
}

/// Builds one multipart part, streaming with optional shared progress.
fn multipart_part(file: UploadFile, progress: Option<TransferProgress>) -> Result<Part, ApiError> {
    let UploadFile {
        file_name,
        content_type,
        bytes,
    } = file;

    let length = bytes.len() as u64;
    let mut part = Part::stream_with_length(tracked_body(bytes, progress), length)
        .file_name(file_name);
    if let Some(content_type) = content_type {
        part = part
            .mime_str(&content_type)
            .map_err(|_| ApiError::unknown("invalid upload content type"))?;
    }
    Ok(part)
}

/// Whether a response content type is an acceptable binary payload.
///
/// Absent content types are accepted; JSON and text bodies are what a
/// misconfigured endpoint substitutes for the file.
fn is_binary_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => {
            let value = value.to_ascii_lowercase();
            !(value.starts_with("application/json") || value.starts_with("text/"))
        }
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, ClientBuildError> {
    Url::parse(base_url).map_err(|source| ClientBuildError::InvalidBaseUrl {
        url: base_url.to_string(),
        source,
    })
}
