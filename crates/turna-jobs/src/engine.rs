use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use serde_json::Value as JsonValue;
use turna_common::{Clock, JobId, TenantId};
use turna_domain::{sanitize_error_message, Job, JobKind, JobStatus};
use turna_errors::{TurnaError, TurnaResult};
use turna_store::DomainStore;

use crate::broker::{JobMessage, MessageBroker};
use crate::config::JobsConfig;
use crate::metrics;

/// Per-kind work. Implemented elsewhere in the workspace (`turna-schedule`
/// provides the extraction/schedule/thumbnail handlers); the engine only
/// knows how to dispatch to whichever handler is registered for a
/// [`JobKind`], matching §4.3's "invoke the handler for `kind`" step.
#[async_trait::async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> TurnaResult<JsonValue>;
}

/// Outcome of a single worker claim attempt (§4.3 step 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Ran(Job),
    NotPending,
    Cancelled,
}

pub const QUEUE_NAME: &str = "turna.jobs";

pub struct JobEngine {
    store: Arc<dyn DomainStore>,
    broker: Arc<dyn MessageBroker>,
    clock: Arc<dyn Clock>,
    config: JobsConfig,
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl JobEngine {
    pub fn new(store: Arc<dyn DomainStore>, broker: Arc<dyn MessageBroker>, clock: Arc<dyn Clock>, config: JobsConfig) -> Self {
        Self { store, broker, clock, config, handlers: HashMap::new() }
    }

    pub fn register_handler(&mut self, kind: JobKind, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// `enqueueJob`: creates the PENDING row, then publishes. A publish
    /// failure surfaces as `ServiceUnavailable`; the row is left visible
    /// to the reconciler rather than rolled back (§4.3) — the job either
    /// gets re-published by a retrying caller or ages out as stale.
    pub async fn enqueue(&self, tenant_id: TenantId, kind: JobKind, input: JsonValue) -> TurnaResult<JobId> {
        let now = self.clock.now();
        let job = Job::new_pending(JobId::new(), tenant_id, kind, input, now);
        let job = self.store.create_job(job).await?;
        self.broker.publish(QUEUE_NAME, JobMessage { job_id: job.id, kind }).await?;
        Ok(job.id)
    }

    /// The single-claim execution path of §4.3. A worker pool calls this
    /// once per dequeued [`JobMessage`]; concurrency across messages is
    /// the caller's responsibility (many workers may call this at once
    /// across kinds, per §5).
    pub async fn execute_claim(&self, message: JobMessage) -> TurnaResult<ClaimOutcome> {
        let mut job = self.store.get_job(message.job_id).await?;
        if job.status != JobStatus::Pending {
            return Ok(ClaimOutcome::NotPending);
        }

        let now = self.clock.now();
        job.start(now)?;
        let job = self.store.save_job(job).await?;

        let handler = self
            .handlers
            .get(&job.kind)
            .ok_or_else(|| TurnaError::internal(format!("no handler registered for job kind {}", job.kind)))?
            .clone();

        let timer = metrics::JOB_DURATION_SECONDS.with_label_values(&[&job.kind.to_string()]).start_timer();
        let handler_result = handler.handle(&job).await;
        timer.observe_duration();

        // Re-read before writing COMPLETED: a concurrent `cancelJob` may
        // have already written FAILED (§4.3 step 4, S5).
        let latest = self.store.get_job(job.id).await?;
        if latest.status == JobStatus::Failed {
            metrics::JOBS_FAILED_TOTAL.with_label_values(&[&job.kind.to_string(), "cancelled"]).inc();
            return Ok(ClaimOutcome::Cancelled);
        }

        let mut latest = latest;
        match handler_result {
            Ok(result) => {
                let now = self.clock.now();
                latest.complete(result, now)?;
                let saved = self.store.save_job(latest).await?;
                metrics::JOBS_COMPLETED_TOTAL.with_label_values(&[&saved.kind.to_string()]).inc();
                Ok(ClaimOutcome::Ran(saved))
            }
            Err(err) => {
                let now = self.clock.now();
                latest.fail(err.msg.as_ref(), now);
                let saved = self.store.save_job(latest).await?;
                metrics::JOBS_FAILED_TOTAL.with_label_values(&[&saved.kind.to_string(), "handler_error"]).inc();
                Ok(ClaimOutcome::Ran(saved))
            }
        }
    }

    /// `cancelJob`: immediate in the store; idempotent on terminal jobs.
    pub async fn cancel(&self, job_id: JobId) -> TurnaResult<Job> {
        let mut job = self.store.get_job(job_id).await?;
        job.cancel(self.clock.now());
        self.store.save_job(job).await
    }

    /// `requeueJob`. Callers are expected to have already enforced
    /// `role = admin` via `turna-auth`; this method only knows the
    /// job-engine-local eligibility rule (§4.3).
    pub async fn requeue(&self, job_id: JobId, force: bool, wipe_result: bool) -> TurnaResult<JobId> {
        let mut job = self.store.get_job(job_id).await?;
        if !job.kind.is_requeueable_kind() {
            return Err(TurnaError::bad_request("NotRequeueable", format!("job kind {} may not be requeued", job.kind)));
        }
        let now = self.clock.now();
        if !force {
            let window = self.stale_window_for(job.tenant_id, job.kind).await?;
            if !job.is_requeue_eligible(now, window) {
                return Err(TurnaError::bad_request(
                    "NotRequeueEligible",
                    "job is neither FAILED nor a stale PENDING job; use force to override",
                ));
            }
        }
        job.requeue(now, wipe_result);
        let job = self.store.save_job(job).await?;
        self.broker.publish(QUEUE_NAME, JobMessage { job_id: job.id, kind: job.kind }).await?;
        Ok(job.id)
    }

    /// §4.3's stale-window formula: `window = min(10 × avg_duration, cap)`
    /// over the last 10 `COMPLETED` jobs for `(tenant, kind)`, falling
    /// back to the cap when there is no history. A floor is additionally
    /// applied (SPEC_FULL.md §E.1) so a burst of very fast jobs can't
    /// produce a window so tiny that a healthy-but-slow job gets reaped.
    pub async fn stale_window_for(&self, tenant_id: TenantId, kind: JobKind) -> TurnaResult<ChronoDuration> {
        let recent = self.store.recent_completed_jobs(tenant_id, kind, 10).await?;
        let durations: Vec<ChronoDuration> =
            recent.iter().filter_map(|j| Some(j.completed_at? - j.started_at?)).collect();
        if durations.is_empty() {
            return Ok(self.config.stale_window_max);
        }
        let total_millis: i64 = durations.iter().map(|d| d.num_milliseconds()).sum();
        let avg = ChronoDuration::milliseconds(total_millis / durations.len() as i64);
        let window = avg * 10;
        Ok(window.clamp(self.config.stale_window_floor, self.config.stale_window_max))
    }

    pub fn config(&self) -> &JobsConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DomainStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

/// A sanitized copy of a handler error's message, used when a handler
/// returns a `TurnaError` directly rather than via `anyhow`. Kept
/// separate from `sanitize_error_message` re-export so callers in this
/// crate have one obvious entry point.
pub fn sanitize_handler_error(err: &TurnaError) -> String {
    sanitize_error_message(err.msg.as_ref())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;
    use turna_common::FixedClock;
    use turna_domain::JobStatus;
    use turna_store::InMemoryStore;

    use super::*;

    struct EchoHandler;
    #[async_trait::async_trait]
    impl JobHandler for EchoHandler {
        async fn handle(&self, _job: &Job) -> TurnaResult<JsonValue> {
            Ok(json!({"pong": true}))
        }
    }

    struct FailingHandler;
    #[async_trait::async_trait]
    impl JobHandler for FailingHandler {
        async fn handle(&self, _job: &Job) -> TurnaResult<JsonValue> {
            Err(TurnaError::internal("boom"))
        }
    }

    fn engine_with(handler: Arc<dyn JobHandler>, kind: JobKind) -> (JobEngine, Arc<InMemoryStore>, Arc<crate::broker::InMemoryBroker>) {
        let store = Arc::new(InMemoryStore::new());
        let broker = Arc::new(crate::broker::InMemoryBroker::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let mut engine = JobEngine::new(store.clone(), broker.clone(), clock, JobsConfig::default());
        engine.register_handler(kind, handler);
        (engine, store, broker)
    }

    #[tokio::test]
    async fn enqueue_then_execute_completes() {
        let (engine, store, _broker) = engine_with(Arc::new(EchoHandler), JobKind::Ping);
        let tenant = TenantId::new();
        let job_id = engine.enqueue(tenant, JobKind::Ping, json!({})).await.unwrap();
        let outcome = engine.execute_claim(JobMessage { job_id, kind: JobKind::Ping }).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::Ran(_)));
        let job = store.get_job(job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
    }

    #[tokio::test]
    async fn enqueue_then_cancel_yields_failed() {
        let (engine, store, _broker) = engine_with(Arc::new(EchoHandler), JobKind::Ping);
        let tenant = TenantId::new();
        let job_id = engine.enqueue(tenant, JobKind::Ping, json!({})).await.unwrap();
        engine.cancel(job_id).await.unwrap();
        let job = store.get_job(job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn cancel_before_claim_is_observed_as_cancelled_not_overwritten() {
        let (engine, store, _broker) = engine_with(Arc::new(EchoHandler), JobKind::Ping);
        let tenant = TenantId::new();
        let job_id = engine.enqueue(tenant, JobKind::Ping, json!({})).await.unwrap();

        // Simulate the worker having already transitioned to RUNNING,
        // then a concurrent cancellation landing before the handler's
        // result is committed (S5).
        let mut job = store.get_job(job_id).await.unwrap();
        job.start(Utc::now()).unwrap();
        store.save_job(job).await.unwrap();
        engine.cancel(job_id).await.unwrap();

        let job = store.get_job(job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed, "cancellation observed instead of the PENDING->RUNNING CAS repeating");
    }

    #[tokio::test]
    async fn failing_handler_marks_job_failed() {
        let (engine, store, _broker) = engine_with(Arc::new(FailingHandler), JobKind::GenerateThumbnail);
        let tenant = TenantId::new();
        let job_id = engine.enqueue(tenant, JobKind::GenerateThumbnail, json!({})).await.unwrap();
        engine.execute_claim(JobMessage { job_id, kind: JobKind::GenerateThumbnail }).await.unwrap();
        let job = store.get_job(job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn requeue_transient_ping_is_refused() {
        let (engine, store, _broker) = engine_with(Arc::new(EchoHandler), JobKind::Ping);
        let tenant = TenantId::new();
        let job_id = engine.enqueue(tenant, JobKind::Ping, json!({})).await.unwrap();
        let mut job = store.get_job(job_id).await.unwrap();
        job.fail("x", Utc::now());
        store.save_job(job).await.unwrap();

        let err = engine.requeue(job_id, false, false).await.unwrap_err();
        assert_eq!(err.code, turna_errors::ErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn requeue_without_force_requires_staleness_or_failed() {
        let (engine, store, _broker) = engine_with(Arc::new(EchoHandler), JobKind::GenerateThumbnail);
        let tenant = TenantId::new();
        let job_id = engine.enqueue(tenant, JobKind::GenerateThumbnail, json!({})).await.unwrap();
        // Fresh PENDING, not stale yet (no history -> window = 1h).
        let err = engine.requeue(job_id, false, false).await.unwrap_err();
        assert_eq!(err.code, turna_errors::ErrorCode::BadRequest);

        // force bypasses eligibility.
        let job_id2 = engine.requeue(job_id, true, false).await.unwrap();
        let job = store.get_job(job_id2).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }
}
