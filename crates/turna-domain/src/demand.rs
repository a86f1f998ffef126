use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::{Display, EnumString};
use turna_common::{DemandId, FileId, HospitalId, Instant, Interval, JobId, MemberId, TenantId};
use turna_errors::TurnaError;

/// A Demand doubles as the assignment record (§3): once the solver
/// attaches a professional, `member_id` and the per-allocation result are
/// written back onto this same row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demand {
    pub id: DemandId,
    pub tenant_id: TenantId,
    pub hospital_id: Option<HospitalId>,
    pub job_id: Option<JobId>,
    pub room: Option<String>,
    pub start_time: Instant,
    pub end_time: Instant,
    pub procedure: String,
    pub anesthesia_type: Option<String>,
    pub complexity: Option<String>,
    pub skills: Option<Vec<String>>,
    pub priority: Option<i32>,
    pub is_pediatric: bool,
    pub notes: Option<String>,
    pub source: Option<String>,
    pub schedule_status: Option<ScheduleStatus>,
    pub schedule_name: Option<String>,
    pub schedule_version_number: u32,
    pub schedule_result_data: Option<JsonValue>,
    pub member_id: Option<MemberId>,
    pub pdf_file_id: Option<FileId>,
    pub generated_at: Option<Instant>,
    pub published_at: Option<Instant>,
}

impl Demand {
    pub fn interval(&self) -> Result<Interval, TurnaError> {
        Interval::new(self.start_time, self.end_time)
    }

    /// `deleteSchedule`: only permitted on DRAFT. PUBLISHED schedules must
    /// be archived instead (§4.5).
    pub fn delete_schedule(&mut self) -> Result<(), TurnaError> {
        match self.schedule_status {
            Some(ScheduleStatus::Draft) => {
                self.schedule_status = None;
                self.schedule_name = None;
                self.schedule_result_data = None;
                self.member_id = None;
                self.job_id = None;
                self.generated_at = None;
                self.schedule_version_number = 0;
                Ok(())
            }
            Some(ScheduleStatus::Published) => Err(TurnaError::bad_request(
                "PublishedScheduleNotDeletable",
                "published schedules must be archived, not deleted",
            )),
            _ => Err(TurnaError::bad_request("NoSchedule", "demand carries no draft schedule to delete")),
        }
    }

    /// PUBLISHED schedules are archived rather than deleted.
    pub fn archive_schedule(&mut self) -> Result<(), TurnaError> {
        match self.schedule_status {
            Some(ScheduleStatus::Published) => {
                self.schedule_status = Some(ScheduleStatus::Archived);
                Ok(())
            }
            other => Err(TurnaError::bad_request(
                "NotPublished",
                format!("cannot archive a demand with schedule_status={other:?}"),
            )),
        }
    }
}

/// A typed replacement for the source's dynamic `schedule_result_data`
/// dict (§9): persisted as opaque JSON on the `Demand` row, but carried
/// as a concrete type everywhere inside this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAllocation {
    pub member: String,
    pub member_id: MemberId,
    /// The solver's own per-demand token, distinct from `demand_id` when
    /// running in `from_extract` mode (no backing Demand row).
    pub id: String,
    pub day: u32,
    pub start: f64,
    pub end: f64,
    pub is_pediatric: bool,
    pub demand_id: Option<DemandId>,
    pub hospital_id: Option<HospitalId>,
    pub metadata: ScheduleAllocationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAllocationMetadata {
    pub allocation_mode: String,
    pub total_cost: f64,
    pub mode: String,
    pub generated_at: Instant,
    pub job_id: JobId,
    pub sequence: u32,
    pub extract_job_id: Option<JobId>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn demand(status: Option<ScheduleStatus>) -> Demand {
        Demand {
            id: DemandId::from_uuid(Uuid::nil()),
            tenant_id: TenantId::new(),
            hospital_id: None,
            job_id: None,
            room: None,
            start_time: Utc.with_ymd_and_hms(2026, 1, 1, 6, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
            procedure: "appendectomy".into(),
            anesthesia_type: None,
            complexity: None,
            skills: None,
            priority: None,
            is_pediatric: false,
            notes: None,
            source: None,
            schedule_status: status,
            schedule_name: None,
            schedule_version_number: 1,
            schedule_result_data: None,
            member_id: None,
            pdf_file_id: None,
            generated_at: None,
            published_at: None,
        }
    }

    #[test]
    fn cannot_delete_published_schedule() {
        let mut d = demand(Some(ScheduleStatus::Published));
        assert!(d.delete_schedule().is_err());
    }

    #[test]
    fn draft_schedule_is_deletable() {
        let mut d = demand(Some(ScheduleStatus::Draft));
        d.delete_schedule().unwrap();
        assert!(d.schedule_status.is_none());
    }

    #[test]
    fn end_must_be_after_start() {
        let mut d = demand(None);
        d.end_time = d.start_time;
        assert!(d.interval().is_err());
    }
}
