use std::sync::Arc;

use chrono::Timelike;
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use turna_common::{HourOffset, Instant, JobId, MemberId, TenantId};
use turna_domain::{Demand, Job, JobKind, JobStatus, ScheduleAllocation, ScheduleAllocationMetadata, ScheduleStatus};
use turna_errors::{TurnaError, TurnaResult};
use turna_jobs::JobHandler;
use turna_solver::{solve_cp_sat, solve_greedy, CpSatOutcome, Professional, SolverConfig, SolverDemand};
use turna_store::DomainStore;

use crate::collaborators::{BlobStore, PdfRenderer};
use crate::input::{AllocationMode, GenerateScheduleInput, ScheduleMode};
use crate::vacation::vacation_for_solver;

/// `generateSchedule` (§4.5), registered against [`JobKind::GenerateSchedule`].
pub struct ScheduleHandler {
    store: Arc<dyn DomainStore>,
    solver_config: SolverConfig,
}

impl ScheduleHandler {
    pub fn new(store: Arc<dyn DomainStore>, solver_config: SolverConfig) -> Self {
        Self { store, solver_config }
    }
}

#[async_trait::async_trait]
impl JobHandler for ScheduleHandler {
    async fn handle(&self, job: &Job) -> TurnaResult<JsonValue> {
        let input: GenerateScheduleInput = serde_json::from_value(job.input.clone())
            .map_err(|e| TurnaError::bad_request("InvalidScheduleInput", e.to_string()))?;
        generate_schedule(&*self.store, job.id, job.tenant_id, &input, self.solver_config).await
    }
}

async fn generate_schedule(
    store: &dyn DomainStore,
    job_id: JobId,
    tenant_id: TenantId,
    input: &GenerateScheduleInput,
    solver_config: SolverConfig,
) -> TurnaResult<JsonValue> {
    let tenant = store.get_tenant(tenant_id).await?;
    let tz = tenant.parsed_timezone()?;
    let period_start_date = input.period_start_at.with_timezone(&tz).date_naive();
    let period_end_date = input.period_end_at.with_timezone(&tz).date_naive();
    let days = (period_end_date - period_start_date).num_days();
    if days <= 0 {
        return Err(TurnaError::bad_request("InvalidPeriod", "period_end_at must be after period_start_at"));
    }
    let days = days as u32;

    let pros_by_sequence = load_professionals(store, tenant_id, tz, period_start_date).await?;
    if pros_by_sequence.is_empty() {
        return Err(TurnaError::bad_request("NoProfessionals", "no schedulable professionals found for tenant"));
    }

    let (demands, source_demands) = match input.mode {
        ScheduleMode::FromDemands => load_demands_from_store(store, tenant_id, input, tz, period_start_date, days).await?,
        ScheduleMode::FromExtract => load_demands_from_extract(store, tenant_id, input, days).await?,
    };
    if demands.is_empty() {
        return Err(TurnaError::bad_request("NoDemandsInPeriod", "no demands found within the requested period"));
    }

    let solved = match input.allocation_mode {
        AllocationMode::Greedy => solve_greedy(&demands, &pros_by_sequence, days, &solver_config, 0),
        AllocationMode::CpSat => match solve_cp_sat(&demands, &pros_by_sequence, days, true, &solver_config, 0) {
            CpSatOutcome::Solved(out) => out,
            CpSatOutcome::Infeasible(report) => {
                return Err(TurnaError::conflict(
                    "ScheduleInfeasible",
                    format!(
                        "cp_sat reported infeasible: {} uncoverable demand(s), {} bottleneck day(s)",
                        report.uncoverable_demands.len(),
                        report.bottleneck_days.len()
                    ),
                ));
            }
        },
    };

    let now: Instant = chrono::Utc::now();
    let pro_names: std::collections::HashMap<MemberId, String> =
        pros_by_sequence.iter().map(|p| (p.id, p.name.clone())).collect();

    let mut allocations: Vec<ScheduleAllocation> = Vec::new();
    let mut sequence = 0u32;
    for day in &solved.per_day {
        for (pid, day_demands) in &day.assigned_demands_by_pro {
            for d in day_demands {
                sequence += 1;
                allocations.push(ScheduleAllocation {
                    member: pro_names.get(pid).cloned().unwrap_or_default(),
                    member_id: *pid,
                    id: d.token.clone(),
                    day: d.day,
                    start: d.start_h,
                    end: d.end_h,
                    is_pediatric: d.is_pediatric,
                    demand_id: d.demand_row_id,
                    hospital_id: d.hospital_id,
                    metadata: ScheduleAllocationMetadata {
                        allocation_mode: input.allocation_mode.to_string(),
                        total_cost: solved.total_cost,
                        mode: match input.mode {
                            ScheduleMode::FromDemands => "from_demands".into(),
                            ScheduleMode::FromExtract => "from_extract".into(),
                        },
                        generated_at: now,
                        job_id,
                        sequence,
                        extract_job_id: input.extract_job_id,
                    },
                });
            }
        }
    }

    let schedule_name = input.name.clone().unwrap_or_else(|| format!("Escala Job {job_id}"));
    let mut to_write = Vec::new();
    for alloc in &allocations {
        let Some(demand_id) = alloc.demand_id else { continue };
        let Some(mut demand) = source_demands.get(&demand_id).cloned() else {
            warn!(%demand_id, "allocation references a demand not loaded for this job, skipping");
            continue;
        };
        demand.schedule_status = Some(ScheduleStatus::Draft);
        demand.schedule_name = Some(format!("{schedule_name} - {} - Dia {}", alloc.member, alloc.day));
        demand.schedule_version_number = input.version_number;
        demand.schedule_result_data = Some(serde_json::to_value(alloc).map_err(|e| TurnaError::internal(e.to_string()))?);
        demand.generated_at = Some(now);
        demand.job_id = Some(job_id);
        demand.member_id = Some(alloc.member_id);
        to_write.push(demand);
    }

    if !to_write.is_empty() {
        store.save_demands_batch(to_write).await?;
    }

    info!(job_id = %job_id, allocations = allocations.len(), mode = ?input.mode, "generateSchedule completed");
    Ok(serde_json::json!({ "allocation_count": allocations.len() }))
}

async fn load_professionals(
    store: &dyn DomainStore,
    tenant_id: TenantId,
    tz: chrono_tz::Tz,
    period_start_date: chrono::NaiveDate,
) -> TurnaResult<Vec<Professional>> {
    let members = store.list_members_by_tenant(tenant_id).await?;
    let mut pros: Vec<Professional> = members
        .into_iter()
        .filter(|m| m.status == turna_domain::MemberStatus::Active && m.sequence > 0)
        .map(|m| {
            let (vacation, vacation_days) = vacation_for_solver(&m.vacation, tz, period_start_date);
            Professional {
                id: m.id,
                name: m.name.clone().unwrap_or_else(|| m.id.to_string()),
                sequence: m.sequence,
                can_peds: m.can_peds,
                vacation,
                vacation_days,
            }
        })
        .collect();
    pros.sort_by_key(|p| p.sequence);
    Ok(pros)
}

async fn load_demands_from_store(
    store: &dyn DomainStore,
    tenant_id: TenantId,
    input: &GenerateScheduleInput,
    tz: chrono_tz::Tz,
    period_start_date: chrono::NaiveDate,
    days: u32,
) -> TurnaResult<(Vec<SolverDemand>, std::collections::HashMap<turna_common::DemandId, Demand>)> {
    let rows = store
        .list_demands_in_period(tenant_id, input.period_start_at, input.period_end_at, input.filter_hospital_id)
        .await?;

    let missing_hospital = rows.iter().filter(|d| d.hospital_id.is_none()).count();
    if missing_hospital > 0 {
        return Err(TurnaError::bad_request(
            "DemandsMissingHospital",
            format!("{missing_hospital} demand(s) in the requested period have no hospital_id"),
        ));
    }

    let mut solver_demands = Vec::with_capacity(rows.len());
    let mut by_id = std::collections::HashMap::with_capacity(rows.len());
    for (i, d) in rows.into_iter().enumerate() {
        let interval = d.interval()?;
        let Some(solved) = turna_common::time::to_solver_space(&interval, tz, period_start_date, days) else {
            continue;
        };
        let token = d.room.clone().unwrap_or_else(|| format!("D{}", i + 1));
        solver_demands.push(SolverDemand {
            token,
            day: solved.day_index,
            start_h: solved.start_h as HourOffset,
            end_h: solved.end_h as HourOffset,
            is_pediatric: d.is_pediatric,
            demand_row_id: Some(d.id),
            hospital_id: d.hospital_id,
        });
        by_id.insert(d.id, d);
    }
    Ok((solver_demands, by_id))
}

async fn load_demands_from_extract(
    store: &dyn DomainStore,
    tenant_id: TenantId,
    input: &GenerateScheduleInput,
    days: u32,
) -> TurnaResult<(Vec<SolverDemand>, std::collections::HashMap<turna_common::DemandId, Demand>)> {
    let extract_job_id = input
        .extract_job_id
        .ok_or_else(|| TurnaError::bad_request("MissingExtractJobId", "extract_job_id is required for from_extract mode"))?;

    let extract_job = store.get_job(extract_job_id).await?;
    if extract_job.tenant_id != tenant_id {
        return Err(TurnaError::forbidden("TenantMismatch", "extraction job belongs to a different tenant"));
    }
    if extract_job.kind != JobKind::ExtractDemand || extract_job.status != JobStatus::Completed {
        return Err(TurnaError::bad_request("ExtractJobNotReady", "extraction job is not COMPLETED"));
    }
    let result = extract_job
        .result
        .ok_or_else(|| TurnaError::internal("completed extraction job carries no result"))?;

    let raw_demands = result.get("demands").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    let mut out = Vec::with_capacity(raw_demands.len());
    for (i, raw) in raw_demands.iter().enumerate() {
        let start = raw.get("start_time").and_then(|v| v.as_str()).and_then(parse_rfc3339_utc);
        let end = raw.get("end_time").and_then(|v| v.as_str()).and_then(parse_rfc3339_utc);
        let (Some(start), Some(end)) = (start, end) else { continue };
        if end <= start {
            continue;
        }
        let start_day = (start.date_naive() - input.period_start_at.date_naive()).num_days() + 1;
        if start_day < 1 || start_day > days as i64 {
            continue;
        }
        let start_h = start.hour() as f64 + start.minute() as f64 / 60.0;
        let end_h = end.hour() as f64 + end.minute() as f64 / 60.0;
        let token = raw.get("room").and_then(|v| v.as_str()).map(String::from).unwrap_or_else(|| format!("D{}", i + 1));
        out.push(SolverDemand {
            token,
            day: start_day as u32,
            start_h,
            end_h,
            is_pediatric: raw.get("is_pediatric").and_then(|v| v.as_bool()).unwrap_or(false),
            demand_row_id: None,
            hospital_id: None,
        });
    }
    Ok((out, std::collections::HashMap::new()))
}

/// `publishSchedule` (§4.5): idempotent once `pdf_file_id` exists.
pub async fn publish_schedule(
    store: &dyn DomainStore,
    blobs: &dyn BlobStore,
    renderer: &dyn PdfRenderer,
    demand_id: turna_common::DemandId,
) -> TurnaResult<(Demand, String)> {
    let mut demand = store.get_demand(demand_id).await?;

    if demand.schedule_status == Some(ScheduleStatus::Published) {
        if let Some(pdf_file_id) = demand.pdf_file_id {
            let file = store.get_file(pdf_file_id).await?;
            let url = blobs.presign_get(&file.blob_key, 3600).await?;
            return Ok((demand, url));
        }
    }

    let per_day = reconstruct_per_day(store, &demand).await?;
    let pdf_bytes = renderer.render(&per_day).await?;

    let blob_key = turna_domain::File::blob_key_for(demand.tenant_id, "schedule-pdf", &format!("{demand_id}.pdf"));
    blobs.put(&blob_key, pdf_bytes, "application/pdf").await?;
    let file = store
        .create_file(turna_domain::File::now_created(
            turna_common::FileId::new(),
            demand.tenant_id,
            demand.hospital_id.ok_or_else(|| TurnaError::internal("demand carries no hospital_id"))?,
            format!("{demand_id}.pdf"),
            "application/pdf".into(),
            blob_key.clone(),
            0,
        ))
        .await?;

    demand.schedule_status = Some(ScheduleStatus::Published);
    demand.pdf_file_id = Some(file.id);
    demand.published_at = Some(chrono::Utc::now());
    let demand = store.save_demand(demand).await?;

    let url = blobs.presign_get(&blob_key, 3600).await?;
    Ok((demand, url))
}

/// Reconstructs `per_day` either from the demand's own
/// `schedule_result_data` or, if storage was fragmented, from sibling
/// Demands sharing `job_id` (§4.5 step 1).
async fn reconstruct_per_day(store: &dyn DomainStore, demand: &Demand) -> TurnaResult<JsonValue> {
    if let Some(data) = &demand.schedule_result_data {
        if data.get("per_day").is_some() {
            return Ok(data.clone());
        }
    }

    let Some(job_id) = demand.job_id else {
        return Err(TurnaError::bad_request("NoScheduleResult", "demand has no schedule_result_data and no job_id to reconstruct from"));
    };
    let siblings = store.list_demands_by_job(job_id).await?;
    let fragments: Vec<&JsonValue> = siblings.iter().filter_map(|d| d.schedule_result_data.as_ref()).collect();
    if fragments.is_empty() {
        return Err(TurnaError::bad_request("NoScheduleResult", "no fragments found to reconstruct schedule_result_data"));
    }
    Ok(serde_json::json!({ "fragments": fragments }))
}

/// `deleteSchedule` (§4.5): only permitted on DRAFT.
pub async fn delete_schedule(store: &dyn DomainStore, demand_id: turna_common::DemandId) -> TurnaResult<()> {
    let mut demand = store.get_demand(demand_id).await?;
    demand.delete_schedule()?;
    store.save_demand(demand).await?;
    Ok(())
}

/// Archives a PUBLISHED schedule instead of deleting it.
pub async fn archive_schedule(store: &dyn DomainStore, demand_id: turna_common::DemandId) -> TurnaResult<()> {
    let mut demand = store.get_demand(demand_id).await?;
    demand.archive_schedule()?;
    store.save_demand(demand).await?;
    Ok(())
}

fn parse_rfc3339_utc(s: &str) -> Option<Instant> {
    chrono::DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&chrono::Utc))
}
