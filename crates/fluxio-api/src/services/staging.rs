//! Upload staging service
//!
//! Stores a client-uploaded file under the chosen cloud's temp bucket,
//! keyed by session id, and returns the resulting cloud path for use as a
//! task source. Creates no task record; the temp area's 7-day expiry is
//! bucket policy, not application code.

use bytes::Bytes;
use fluxio_core::{AppError, CloudProvider};
use fluxio_storage::ObjectStorage;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::state::AppState;

/// Characters that must not appear raw in an object key segment.
const UNSAFE_KEY_CHARS: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'\\')
    .add(b'?')
    .add(b'#')
    .add(b'%');

fn sanitize_filename(name: &str) -> String {
    // Client filenames may carry directory components; keep the basename.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    utf8_percent_encode(base, UNSAFE_KEY_CHARS).to_string()
}

#[tracing::instrument(skip(state, data), fields(provider = %provider, session_id = %session_id, size_bytes = data.len()))]
pub async fn stage_upload(
    state: &AppState,
    provider: CloudProvider,
    session_id: &str,
    filename: &str,
    data: Bytes,
) -> Result<String, AppError> {
    let bucket = state
        .config
        .endpoints(provider)
        .temp_bucket
        .as_ref()
        .ok_or(AppError::CloudNotConfigured(provider))?;

    let key = format!("uploads/{}/{}", session_id, sanitize_filename(filename));
    let storage = state.storage.for_provider(provider);
    storage
        .put(bucket, &key, data)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    let path = format!("{}://{}/{}", provider.scheme(), bucket, key);
    tracing::info!(path = %path, "Upload staged");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_basename() {
        assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("dir/clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("C:\\Videos\\clip.mp4"), "clip.mp4");
    }

    #[test]
    fn test_sanitize_escapes_unsafe_characters() {
        assert_eq!(sanitize_filename("my clip.mp4"), "my%20clip.mp4");
        assert_eq!(sanitize_filename("a#b?c.mp4"), "a%23b%3Fc.mp4");
    }
}
