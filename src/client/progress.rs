//! Transfer-progress reporting for multipart uploads.
//!
//! Upload payloads are chunked into a byte stream the transport pulls as it
//! writes to the wire, so progress reflects actual transfer, not buffering.
//! Percentages are `floor(loaded * 100 / total)`; the callback is invoked
//! once per distinct value and never when the total size is unknown.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use futures_util::Stream;

/// Callback receiving an integer transfer percentage in `0..=100`.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Chunk size for upload body streams.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Shared progress accounting across the parts of one multipart request.
///
/// A multi-file upload reports a single percentage for the whole request, so
/// every part's stream feeds the same counter.
#[derive(Clone)]
pub(crate) struct TransferProgress {
    loaded: Arc<Mutex<ProgressState>>,
    total: u64,
    callback: ProgressCallback,
}

struct ProgressState {
    loaded: u64,
    last_reported: Option<u8>,
}

impl TransferProgress {
    /// Creates a tracker for `total` bytes, or `None` when the total is
    /// unknown or zero (no percentage can be computed).
    pub(crate) fn for_total(total: u64, callback: Option<ProgressCallback>) -> Option<Self> {
        let callback = callback?;
        if total == 0 {
            return None;
        }
        Some(Self {
            loaded: Arc::new(Mutex::new(ProgressState {
                loaded: 0,
                last_reported: None,
            })),
            total,
            callback,
        })
    }

    /// Records `bytes` transferred and reports the new percentage when it
    /// differs from the last reported one.
    fn record(&self, bytes: u64) {
        let mut state = self
            .loaded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state.loaded = state.loaded.saturating_add(bytes);

        // Integer floor; loaded never exceeds total, so this caps at 100.
        let percent = u8::try_from(state.loaded.saturating_mul(100) / self.total).unwrap_or(100);
        if state.last_reported != Some(percent) {
            state.last_reported = Some(percent);
            (self.callback)(percent);
        }
    }
}

/// Splits a payload into chunks that report progress as they are pulled.
pub(crate) fn chunked_with_progress(
    payload: Vec<u8>,
    progress: Option<TransferProgress>,
) -> impl Stream<Item = Result<Vec<u8>, Infallible>> {
    let chunks: Vec<Vec<u8>> = payload
        .chunks(UPLOAD_CHUNK_SIZE)
        .map(<[u8]>::to_vec)
        .collect();

    // The map closure runs as the transport polls each chunk off the stream.
    futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        if let Some(progress) = &progress {
            progress.record(chunk.len() as u64);
        }
        Ok(chunk)
    }))
}

/// Builds a request body for `payload`, tracked by `progress` when present.
pub(crate) fn tracked_body(payload: Vec<u8>, progress: Option<TransferProgress>) -> reqwest::Body {
    match progress {
        Some(progress) => reqwest::Body::wrap_stream(chunked_with_progress(payload, Some(progress))),
        None => reqwest::Body::from(payload),
    }
}
