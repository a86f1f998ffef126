use serde::{Deserialize, Serialize};
use turna_common::{HospitalId, TenantId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    pub id: HospitalId,
    pub tenant_id: TenantId,
    pub name: String,
    pub label: Option<String>,
    /// Per-hospital extractor prompt template; `None` falls back to the
    /// extractor's built-in default template.
    pub prompt: Option<String>,
    pub color: Option<String>,
}
