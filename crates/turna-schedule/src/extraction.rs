use std::sync::Arc;

use serde_json::Value as JsonValue;
use turna_domain::Job;
use turna_errors::{TurnaError, TurnaResult};
use turna_jobs::JobHandler;
use turna_store::DomainStore;

use crate::collaborators::{BlobStore, DemandExtractor};
use crate::input::ExtractDemandInput;

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// `runExtractDemand` (§4.6), registered against [`turna_domain::JobKind::ExtractDemand`].
pub struct ExtractionHandler {
    store: Arc<dyn DomainStore>,
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn DemandExtractor>,
}

impl ExtractionHandler {
    pub fn new(store: Arc<dyn DomainStore>, blobs: Arc<dyn BlobStore>, extractor: Arc<dyn DemandExtractor>) -> Self {
        Self { store, blobs, extractor }
    }
}

#[async_trait::async_trait]
impl JobHandler for ExtractionHandler {
    async fn handle(&self, job: &Job) -> TurnaResult<JsonValue> {
        let input: ExtractDemandInput = serde_json::from_value(job.input.clone())
            .map_err(|e| TurnaError::bad_request("InvalidExtractInput", e.to_string()))?;

        let file = self.store.get_file(input.file_id).await?;
        if file.tenant_id != job.tenant_id {
            return Err(TurnaError::forbidden("TenantMismatch", "file belongs to a different tenant"));
        }

        let hospital = self.store.get_hospital(file.hospital_id).await?;
        if hospital.tenant_id != job.tenant_id {
            return Err(TurnaError::forbidden("TenantMismatch", "hospital belongs to a different tenant"));
        }

        let ext = std::path::Path::new(&file.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .filter(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
            .unwrap_or_else(|| "pdf".to_string());

        let tmp_dir = std::env::temp_dir();
        let tmp_path = tmp_dir.join(format!("{}.{ext}", uuid::Uuid::new_v4()));

        let bytes = self.blobs.get(&file.blob_key).await?;
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| TurnaError::internal(format!("failed to write temp file: {e}")))?;

        let result = self.extractor.extract(&tmp_path, hospital.prompt.as_deref()).await;

        let _ = tokio::fs::remove_file(&tmp_path).await;

        let mut result = result?;
        if let Some(obj) = result.as_object_mut() {
            let meta = obj.entry("meta").or_insert_with(|| serde_json::json!({}));
            if let Some(meta_obj) = meta.as_object_mut() {
                meta_obj.remove("pdf_path");
                meta_obj.insert("file_id".into(), serde_json::json!(file.id));
                meta_obj.insert("filename".into(), serde_json::json!(file.filename));
                meta_obj.insert("hospital_id".into(), serde_json::json!(hospital.id));
                meta_obj.insert("hospital_name".into(), serde_json::json!(hospital.name));
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use parking_lot::Mutex;
    use turna_common::{FileId, HospitalId, TenantId};
    use turna_domain::{File, Hospital, Job, JobKind, JobStatus};

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

    struct FakeExtractor;
    #[async_trait::async_trait]
    impl DemandExtractor for FakeExtractor {
        async fn extract(&self, _path: &std::path::Path, _prompt: Option<&str>) -> TurnaResult<JsonValue> {
            Ok(serde_json::json!({ "demands": [], "meta": { "pdf_path": "/tmp/x" } }))
        }
    }

    #[tokio::test]
    async fn extraction_strips_pdf_path_and_injects_file_metadata() {
        let store = Arc::new(turna_store::InMemoryStore::new());
        let tenant_id = TenantId::new();
        store.seed_tenant(turna_domain::Tenant {
            id: tenant_id,
            name: "Tenant A".into(),
            label: None,
            timezone: "America/Sao_Paulo".into(),
            locale: "pt-BR".into(),
            currency: "BRL".into(),
        });
        let hospital_id = HospitalId::new();
        store.seed_hospital(Hospital {
            id: hospital_id,
            tenant_id,
            name: "Hospital A".into(),
            label: None,
            prompt: Some("extract carefully".into()),
            color: None,
        });
        let file_id = FileId::new();
        let file = File::now_created(file_id, tenant_id, hospital_id, "exam.pdf".into(), "application/pdf".into(), "key/1".into(), 10);
        store.create_file(file).await.unwrap();

        let blobs = Arc::new(FakeBlobs(Mutex::new(HashMap::from([("key/1".to_string(), b"hello".to_vec())]))));
        let handler = ExtractionHandler::new(store.clone(), blobs, Arc::new(FakeExtractor));

        let job = Job::new_pending(
            turna_common::JobId::new(),
            tenant_id,
            JobKind::ExtractDemand,
            serde_json::json!({ "file_id": file_id }),
            chrono::Utc::now(),
        );
        let mut job = job;
        job.status = JobStatus::Running;

        let result = handler.handle(&job).await.unwrap();
        assert!(result["meta"].get("pdf_path").is_none());
        assert_eq!(result["meta"]["hospital_name"], "Hospital A");
    }
}
