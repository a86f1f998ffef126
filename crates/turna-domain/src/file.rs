use chrono::Utc;
use serde::{Deserialize, Serialize};
use turna_common::{FileId, HospitalId, Instant, TenantId};

/// Immutable once created. Deletion removes the underlying blob (and any
/// thumbnail blob) on a best-effort basis through `BlobStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: FileId,
    pub tenant_id: TenantId,
    pub hospital_id: HospitalId,
    pub filename: String,
    pub content_type: String,
    /// Globally unique opaque key into `BlobStore`.
    pub blob_key: String,
    pub file_size: u64,
    pub created_at: Instant,
}

impl File {
    /// `"<tenantId>/<kind>/<uuid>_<filename>"`, the deterministic blob key
    /// shape the core generates for every upload (§6).
    pub fn blob_key_for(tenant_id: TenantId, kind: &str, filename: &str) -> String {
        format!("{tenant_id}/{kind}/{}_{filename}", uuid::Uuid::new_v4())
    }

    pub fn now_created(
        id: FileId,
        tenant_id: TenantId,
        hospital_id: HospitalId,
        filename: String,
        content_type: String,
        blob_key: String,
        file_size: u64,
    ) -> Self {
        Self { id, tenant_id, hospital_id, filename, content_type, blob_key, file_size, created_at: Utc::now() }
    }
}
