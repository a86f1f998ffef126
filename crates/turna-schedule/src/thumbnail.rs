use std::sync::Arc;

use serde_json::Value as JsonValue;
use turna_domain::{File, Job};
use turna_errors::{TurnaError, TurnaResult};
use turna_jobs::JobHandler;
use turna_store::DomainStore;

use crate::collaborators::{BlobStore, ThumbnailRenderer};
use crate::input::ThumbnailInput;

const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg"];
const EXCEL_EXTS: &[&str] = &["xls", "xlsx"];
const EXCEL_MIME_TYPES: &[&str] = &[
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/excel",
    "application/x-excel",
    "application/x-msexcel",
];

fn extension_of(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

fn is_supported(content_type: &str, ext: &str) -> bool {
    content_type.starts_with("image/")
        || content_type == "application/pdf"
        || EXCEL_MIME_TYPES.contains(&content_type)
        || IMAGE_EXTS.contains(&ext)
        || ext == "pdf"
        || EXCEL_EXTS.contains(&ext)
}

/// `generateThumbnail` (§6), registered against
/// [`turna_domain::JobKind::GenerateThumbnail`]. A thin orchestration
/// wrapper: the 500x500 WebP render itself is delegated to a
/// [`ThumbnailRenderer`], which is a Non-goal of this core.
pub struct ThumbnailHandler {
    store: Arc<dyn DomainStore>,
    blobs: Arc<dyn BlobStore>,
    renderer: Arc<dyn ThumbnailRenderer>,
}

impl ThumbnailHandler {
    pub fn new(store: Arc<dyn DomainStore>, blobs: Arc<dyn BlobStore>, renderer: Arc<dyn ThumbnailRenderer>) -> Self {
        Self { store, blobs, renderer }
    }
}

#[async_trait::async_trait]
impl JobHandler for ThumbnailHandler {
    async fn handle(&self, job: &Job) -> TurnaResult<JsonValue> {
        let input: ThumbnailInput = serde_json::from_value(job.input.clone())
            .map_err(|e| TurnaError::bad_request("InvalidThumbnailInput", e.to_string()))?;

        let file = self.store.get_file(input.file_id).await?;
        if file.tenant_id != job.tenant_id {
            return Err(TurnaError::forbidden("TenantMismatch", "file belongs to a different tenant"));
        }

        let original_key = file.blob_key.clone();
        let thumbnail_key = format!("{original_key}.thumbnail.webp");

        if self.blobs.exists(&thumbnail_key).await? {
            return Ok(serde_json::json!({
                "file_id": file.id,
                "original_key": original_key,
                "thumbnail_key": thumbnail_key,
                "skipped": true,
                "reason": "thumbnail already exists",
            }));
        }

        let ext = extension_of(&file.filename);
        if !is_supported(&file.content_type, &ext) {
            return Ok(serde_json::json!({
                "file_id": file.id,
                "original_key": original_key,
                "thumbnail_key": thumbnail_key,
                "skipped": true,
                "reason": format!("unsupported type (mime={}, ext={ext})", file.content_type),
            }));
        }

        let bytes = self.blobs.get(&original_key).await?;
        let tmp_path = std::env::temp_dir().join(format!("{}.{ext}", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| TurnaError::internal(format!("failed to write temp file: {e}")))?;

        let rendered = self.renderer.render(&tmp_path, &ext).await;
        let _ = tokio::fs::remove_file(&tmp_path).await;
        let webp_bytes = rendered?;

        self.blobs.put(&thumbnail_key, webp_bytes, "image/webp").await?;

        let thumbnail_row = File::now_created(
            turna_common::FileId::new(),
            file.tenant_id,
            file.hospital_id,
            format!("{}.thumbnail.webp", file.filename),
            "image/webp".to_string(),
            thumbnail_key.clone(),
            0,
        );
        self.store.create_file(thumbnail_row).await?;

        Ok(serde_json::json!({
            "file_id": file.id,
            "original_key": original_key,
            "thumbnail_key": thumbnail_key,
            "skipped": false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use parking_lot::Mutex;
    use turna_common::{FileId, HospitalId, TenantId};
    use turna_domain::{Hospital, Job, JobKind, JobStatus, Tenant};

    use super::*;

    struct FakeBlobs(Mutex<HashMap<String, Vec<u8>>>);
    #[async_trait::async_trait]
    impl BlobStore for FakeBlobs {
        async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> TurnaResult<()> {
            self.0.lock().insert(key.to_string(), bytes);
            Ok(())
        }
        async fn get(&self, key: &str) -> TurnaResult<Vec<u8>> {
            self.0.lock().get(key).cloned().ok_or_else(|| TurnaError::not_found("NoSuchKey", key.to_string()))
        }
        async fn exists(&self, key: &str) -> TurnaResult<bool> {
            Ok(self.0.lock().contains_key(key))
        }
        async fn delete(&self, key: &str) -> TurnaResult<()> {
            self.0.lock().remove(key);
            Ok(())
        }
        async fn presign_get(&self, key: &str, _ttl_seconds: u64) -> TurnaResult<String> {
            Ok(format!("https://blobs.example/{key}"))
        }
    }

    struct FakeRenderer;
    #[async_trait::async_trait]
    impl ThumbnailRenderer for FakeRenderer {
        async fn render(&self, _source_path: &std::path::Path, _source_ext: &str) -> TurnaResult<Vec<u8>> {
            Ok(b"fake-webp-bytes".to_vec())
        }
    }

    fn seeded_file(store: &turna_store::InMemoryStore, tenant_id: TenantId, filename: &str, content_type: &str) -> File {
        let hospital_id = HospitalId::new();
        store.seed_hospital(Hospital {
            id: hospital_id,
            tenant_id,
            name: "Hospital A".into(),
            label: None,
            prompt: None,
            color: None,
        });
        File::now_created(FileId::new(), tenant_id, hospital_id, filename.to_string(), content_type.to_string(), "key/1".to_string(), 10)
    }

    fn seeded_tenant(store: &turna_store::InMemoryStore) -> TenantId {
        let tenant_id = TenantId::new();
        store.seed_tenant(Tenant {
            id: tenant_id,
            name: "Tenant A".into(),
            label: None,
            timezone: "America/Sao_Paulo".into(),
            locale: "pt-BR".into(),
            currency: "BRL".into(),
        });
        tenant_id
    }

    fn pending_job(tenant_id: TenantId, file_id: FileId) -> Job {
        let mut job = Job::new_pending(
            turna_common::JobId::new(),
            tenant_id,
            JobKind::GenerateThumbnail,
            serde_json::json!({ "file_id": file_id }),
            chrono::Utc::now(),
        );
        job.status = JobStatus::Running;
        job
    }

    #[tokio::test]
    async fn generates_and_uploads_thumbnail_for_image() {
        let store = Arc::new(turna_store::InMemoryStore::new());
        let tenant_id = seeded_tenant(&store);
        let file = seeded_file(&store, tenant_id, "exam.png", "image/png");
        let file_id = file.id;
        store.create_file(file).await.unwrap();

        let blobs = Arc::new(FakeBlobs(Mutex::new(HashMap::from([("key/1".to_string(), b"raw-bytes".to_vec())]))));
        let handler = ThumbnailHandler::new(store.clone(), blobs.clone(), Arc::new(FakeRenderer));

        let job = pending_job(tenant_id, file_id);
        let result = handler.handle(&job).await.unwrap();

        assert_eq!(result["skipped"], false);
        assert_eq!(result["thumbnail_key"], "key/1.thumbnail.webp");
        assert!(blobs.exists("key/1.thumbnail.webp").await.unwrap());
    }

    #[tokio::test]
    async fn skips_when_thumbnail_already_exists() {
        let store = Arc::new(turna_store::InMemoryStore::new());
        let tenant_id = seeded_tenant(&store);
        let file = seeded_file(&store, tenant_id, "exam.png", "image/png");
        let file_id = file.id;
        store.create_file(file).await.unwrap();

        let blobs = Arc::new(FakeBlobs(Mutex::new(HashMap::from([
            ("key/1".to_string(), b"raw-bytes".to_vec()),
            ("key/1.thumbnail.webp".to_string(), b"already-there".to_vec()),
        ]))));
        let handler = ThumbnailHandler::new(store.clone(), blobs, Arc::new(FakeRenderer));

        let job = pending_job(tenant_id, file_id);
        let result = handler.handle(&job).await.unwrap();

        assert_eq!(result["skipped"], true);
    }

    #[tokio::test]
    async fn skips_unsupported_file_type() {
        let store = Arc::new(turna_store::InMemoryStore::new());
        let tenant_id = seeded_tenant(&store);
        let file = seeded_file(&store, tenant_id, "notes.txt", "text/plain");
        let file_id = file.id;
        store.create_file(file).await.unwrap();

        let blobs = Arc::new(FakeBlobs(Mutex::new(HashMap::from([("key/1".to_string(), b"raw-bytes".to_vec())]))));
        let handler = ThumbnailHandler::new(store.clone(), blobs, Arc::new(FakeRenderer));

        let job = pending_job(tenant_id, file_id);
        let result = handler.handle(&job).await.unwrap();

        assert_eq!(result["skipped"], true);
        assert!(result["reason"].as_str().unwrap().contains("unsupported"));
    }
}
