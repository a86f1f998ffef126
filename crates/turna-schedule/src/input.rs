use serde::Deserialize;
use turna_common::{HospitalId, Instant, JobId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    FromDemands,
    FromExtract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    Greedy,
    CpSat,
}

impl std::fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationMode::Greedy => write!(f, "greedy"),
            AllocationMode::CpSat => write!(f, "cp_sat"),
        }
    }
}

/// `generateSchedule`'s job input (§4.5). `mode` has no spec-mandated
/// default; this core requires it explicit rather than guessing, unlike
/// the source's `from_extract` fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateScheduleInput {
    pub mode: ScheduleMode,
    #[serde(default = "default_allocation_mode")]
    pub allocation_mode: AllocationMode,
    pub name: Option<String>,
    #[serde(default = "default_version")]
    pub version_number: u32,
    pub period_start_at: Instant,
    pub period_end_at: Instant,
    pub filter_hospital_id: Option<HospitalId>,
    pub extract_job_id: Option<JobId>,
}

fn default_allocation_mode() -> AllocationMode {
    AllocationMode::Greedy
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractDemandInput {
    pub file_id: turna_common::FileId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailInput {
    pub file_id: turna_common::FileId,
}
