//! Local/dev stand-ins for the collaborators §1 places out of scope
//! (cloud object storage, the LLM extraction call, PDF/thumbnail
//! rendering internals). Swapping these for real implementations is the
//! only thing a production deployment needs to do to this crate.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use turna_errors::{TurnaError, TurnaResult};
use turna_schedule::{BlobStore, DemandExtractor, PdfRenderer, ThumbnailRenderer};

/// An in-process blob store keyed the same way the real `BlobStore`
/// would be, backed by a `Mutex<HashMap>` — the `turna-jobs::InMemoryBroker`
/// pattern applied to blob storage. Fine for a single-process deployment
/// or local development; data does not survive a restart.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait::async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> TurnaResult<()> {
        self.blobs.lock().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> TurnaResult<Vec<u8>> {
        self.blobs
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| TurnaError::not_found("NoSuchKey", format!("no blob stored under {key}")))
    }

    async fn exists(&self, key: &str) -> TurnaResult<bool> {
        Ok(self.blobs.lock().contains_key(key))
    }

    async fn delete(&self, key: &str) -> TurnaResult<()> {
        self.blobs.lock().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl_seconds: u64) -> TurnaResult<String> {
        Ok(format!("memory://blobs/{key}?ttl={ttl_seconds}"))
    }
}

/// The LLM-backed extraction call is a Non-goal (§1); this refuses every
/// call with `ServiceUnavailable` rather than silently returning empty
/// demands, so a `generateSchedule(from_extract)` run fails loudly
/// instead of materializing a schedule with no demands on it.
pub struct UnconfiguredExtractor;

#[async_trait::async_trait]
impl DemandExtractor for UnconfiguredExtractor {
    async fn extract(&self, _path: &Path, _prompt: Option<&str>) -> TurnaResult<JsonValue> {
        Err(TurnaError::service_unavailable(
            "ExtractorNotConfigured",
            "no DemandExtractor is wired into this deployment",
        ))
    }
}

/// PDF rendering internals are a Non-goal (§1); same refusal shape as
/// [`UnconfiguredExtractor`].
pub struct UnconfiguredPdfRenderer;

#[async_trait::async_trait]
impl PdfRenderer for UnconfiguredPdfRenderer {
    async fn render(&self, _schedule_model: &JsonValue) -> TurnaResult<Vec<u8>> {
        Err(TurnaError::service_unavailable(
            "PdfRendererNotConfigured",
            "no PdfRenderer is wired into this deployment",
        ))
    }
}

/// Thumbnail rasterization internals are a Non-goal (§1); same refusal
/// shape as [`UnconfiguredExtractor`].
pub struct UnconfiguredThumbnailRenderer;

#[async_trait::async_trait]
impl ThumbnailRenderer for UnconfiguredThumbnailRenderer {
    async fn render(&self, _source_path: &Path, _source_ext: &str) -> TurnaResult<Vec<u8>> {
        Err(TurnaError::service_unavailable(
            "ThumbnailRendererNotConfigured",
            "no ThumbnailRenderer is wired into this deployment",
        ))
    }
}
