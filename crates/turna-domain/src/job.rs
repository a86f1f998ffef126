use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::{Display, EnumString};
use turna_common::{Instant, JobId, TenantId};
use turna_errors::TurnaError;

/// The four kinds of work the Job Engine dispatches to a worker. `Ping`
/// is a transient liveness probe and, per §4.3, may never be requeued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    Ping,
    ExtractDemand,
    GenerateSchedule,
    GenerateThumbnail,
}

impl JobKind {
    /// Transient kinds carry no durable business result worth replaying;
    /// requeue is refused for them regardless of `force` (§4.3).
    pub fn is_requeueable_kind(&self) -> bool {
        !matches!(self, JobKind::Ping)
    }
}

/// `PENDING → RUNNING → (COMPLETED | FAILED)`; `FAILED` may be resurrected
/// to `PENDING` by requeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A durable unit of asynchronous work. `input`/`result` are opaque JSON at
/// the storage boundary per §9 ("dynamic dict-shaped records"); typed
/// accessors for specific job kinds live in `turna-schedule`/`turna-jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub input: JsonValue,
    pub result: Option<JsonValue>,
    pub error: Option<String>,
    pub created_at: Instant,
    pub updated_at: Instant,
    pub started_at: Option<Instant>,
    pub completed_at: Option<Instant>,
}

/// Stored `Job.error` is capped so a verbose internal exception never
/// bloats the row or leaks unbounded detail, mirroring the source's
/// `_safe_error_message` truncation.
pub const ERROR_MESSAGE_MAX_LEN: usize = 500;

pub fn sanitize_error_message(msg: impl AsRef<str>) -> String {
    let msg = msg.as_ref();
    if msg.len() <= ERROR_MESSAGE_MAX_LEN {
        msg.to_string()
    } else {
        msg.chars().take(ERROR_MESSAGE_MAX_LEN).collect()
    }
}

impl Job {
    pub fn new_pending(id: JobId, tenant_id: TenantId, kind: JobKind, input: JsonValue, now: Instant) -> Self {
        Self {
            id,
            tenant_id,
            kind,
            status: JobStatus::Pending,
            input,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// CAS `PENDING -> RUNNING`. Returns an error rather than mutating
    /// silently so callers can `ack`-and-skip a stale broker message
    /// whose Job is no longer claimable (§5).
    pub fn start(&mut self, now: Instant) -> Result<(), TurnaError> {
        if self.status != JobStatus::Pending {
            return Err(TurnaError::conflict(
                "NotPending",
                format!("job {} is not PENDING (status={})", self.id, self.status),
            ));
        }
        self.status = JobStatus::Running;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// The step-4 completion write of §4.3. Callers must re-read the row
    /// immediately beforehand; this method itself refuses to overwrite a
    /// terminal status so a cancellation that lands between the re-read
    /// and this call is still caught by the CAS below.
    pub fn complete(&mut self, result: JsonValue, now: Instant) -> Result<(), TurnaError> {
        if self.status == JobStatus::Failed {
            return Err(TurnaError::conflict(
                "JobCancelled",
                format!("job {} was cancelled before completion", self.id),
            ));
        }
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn fail(&mut self, error: impl AsRef<str>, now: Instant) {
        self.status = JobStatus::Failed;
        self.error = Some(sanitize_error_message(error));
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// `cancelJob`: sets FAILED with a cancellation marker unless already
    /// terminal. Idempotent — cancelling a terminal job is a no-op.
    pub fn cancel(&mut self, now: Instant) {
        if matches!(self.status, JobStatus::Completed | JobStatus::Failed) {
            return;
        }
        self.fail("cancelled by request", now);
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    /// A PENDING job that never started is a requeue/reconciliation
    /// candidate; RUNNING jobs are never auto-failed (no heartbeat).
    pub fn is_unstarted_pending(&self) -> bool {
        self.status == JobStatus::Pending && self.started_at.is_none()
    }

    /// Eligible for `requeueJob` without `force`: `FAILED`, or a stale
    /// unstarted `PENDING` job older than `window`.
    pub fn is_requeue_eligible(&self, now: Instant, window: Duration) -> bool {
        match self.status {
            JobStatus::Failed => true,
            JobStatus::Pending => self.is_unstarted_pending() && now - self.created_at > window,
            _ => false,
        }
    }

    /// Resets to a fresh PENDING row for re-publishing. `wipe_result`
    /// additionally clears a prior `result` (kept by default so an admin
    /// can inspect the last attempt's output even as they retry it).
    pub fn requeue(&mut self, now: Instant, wipe_result: bool) {
        self.status = JobStatus::Pending;
        self.error = None;
        self.started_at = None;
        self.completed_at = None;
        if wipe_result {
            self.result = None;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn now() -> Instant {
        chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn job() -> Job {
        Job::new_pending(JobId::from_uuid(Uuid::nil()), TenantId::new(), JobKind::Ping, json!({}), now())
    }

    #[test]
    fn complete_after_cancel_is_rejected() {
        let mut j = job();
        j.start(now()).unwrap();
        j.cancel(now());
        assert_eq!(j.status, JobStatus::Failed);
        assert!(j.complete(json!({"ok": true}), now()).is_err());
    }

    #[test]
    fn cancel_is_idempotent_on_terminal_jobs() {
        let mut j = job();
        j.start(now()).unwrap();
        j.complete(json!({}), now()).unwrap();
        j.cancel(now());
        assert_eq!(j.status, JobStatus::Completed, "cancelling a COMPLETED job must not clobber it");
    }

    #[test]
    fn ping_is_never_requeueable() {
        assert!(!JobKind::Ping.is_requeueable_kind());
        assert!(JobKind::GenerateSchedule.is_requeueable_kind());
    }

    #[test]
    fn error_message_is_truncated() {
        let long = "x".repeat(10_000);
        assert_eq!(sanitize_error_message(&long).len(), ERROR_MESSAGE_MAX_LEN);
    }
}
