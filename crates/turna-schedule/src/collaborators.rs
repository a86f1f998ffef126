use serde_json::Value as JsonValue;
use turna_errors::TurnaResult;

/// Opaque blob storage (§6). Keys are generated by the core in the shape
/// `"<tenantId>/<kind>/<uuid>_<filename>"` (see [`turna_domain::File::blob_key_for`]);
/// this trait never constructs keys itself.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> TurnaResult<()>;
    async fn get(&self, key: &str) -> TurnaResult<Vec<u8>>;
    async fn exists(&self, key: &str) -> TurnaResult<bool>;
    async fn delete(&self, key: &str) -> TurnaResult<()>;
    async fn presign_get(&self, key: &str, ttl_seconds: u64) -> TurnaResult<String>;
}

/// The LLM-backed demand extraction call (§6, explicitly out of scope to
/// implement — a Non-goal). `path` is a local filesystem path to the
/// downloaded blob; `prompt` is the hospital's extractor template.
#[async_trait::async_trait]
pub trait DemandExtractor: Send + Sync {
    async fn extract(&self, path: &std::path::Path, prompt: Option<&str>) -> TurnaResult<JsonValue>;
}

/// PDF rendering of a materialized schedule (§6, Non-goal: rendering
/// internals). `schedule_model` is the `per_day` JSON this crate
/// reconstructs from `Demand.schedule_result_data`.
#[async_trait::async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, schedule_model: &JsonValue) -> TurnaResult<Vec<u8>>;
}

/// Thumbnail rasterization (§6, Non-goal: rendering internals). `source_path`
/// is a local copy of the original file; `source_ext` is its lowercased
/// extension without the dot, used by the implementation to pick an image,
/// PDF, or spreadsheet rendering path. Returns WebP bytes.
#[async_trait::async_trait]
pub trait ThumbnailRenderer: Send + Sync {
    async fn render(&self, source_path: &std::path::Path, source_ext: &str) -> TurnaResult<Vec<u8>>;
}
