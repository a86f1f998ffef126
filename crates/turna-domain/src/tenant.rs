use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use turna_common::TenantId;
use turna_errors::TurnaError;

/// Root of multi-tenant isolation. Carries no `tenant_id` of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub label: Option<String>,
    pub timezone: String,
    pub locale: String,
    pub currency: String,
}

impl Tenant {
    /// Parses `timezone` eagerly so a bad value is caught at write time
    /// rather than surfacing as a solver-space conversion failure later.
    pub fn parsed_timezone(&self) -> Result<Tz, TurnaError> {
        turna_common::time::parse_timezone(&self.timezone)
    }
}
