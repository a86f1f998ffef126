use std::collections::HashMap;

use chrono::Duration as ChronoDuration;
use serde::Serialize;
use turna_common::TenantId;
use turna_domain::JobKind;
use turna_errors::TurnaResult;

use crate::engine::JobEngine;
use crate::metrics;

/// `reconcilePendingOrphans` (§4.3): a cron sweep, intended to run every
/// 5 minutes, that auto-fails `PENDING` jobs with `started_at IS NULL`
/// once they exceed their `(tenant, kind)` stale window. `RUNNING` jobs
/// are never touched — no heartbeat is assumed (§4.3).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReconcileReport {
    pub scanned: u32,
    pub failed: u32,
}

pub async fn reconcile_pending_orphans(engine: &JobEngine) -> TurnaResult<ReconcileReport> {
    let now = engine.clock().now();
    let pending = engine.store().list_unstarted_pending_jobs().await?;

    let mut scanned = 0u32;
    let mut failed = 0u32;
    let mut window_cache: HashMap<(TenantId, JobKind), ChronoDuration> = HashMap::new();

    for mut job in pending {
        scanned += 1;
        let key = (job.tenant_id, job.kind);
        let window = match window_cache.get(&key) {
            Some(w) => *w,
            None => {
                let w = engine.stale_window_for(job.tenant_id, job.kind).await?;
                window_cache.insert(key, w);
                w
            }
        };

        if now - job.created_at <= window {
            continue;
        }

        job.fail("orphan/stale: job remained PENDING past its expected window; requeue manually (admin)", now);
        engine.store().save_job(job).await?;
        metrics::RECONCILER_STALE_TOTAL.with_label_values(&[&key.1.to_string()]).inc();
        failed += 1;
    }

    Ok(ReconcileReport { scanned, failed })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;
    use turna_common::FixedClock;
    use turna_domain::JobKind;
    use turna_store::InMemoryStore;

    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::config::JobsConfig;

    #[tokio::test]
    async fn stale_unstarted_pending_job_is_failed() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let broker = Arc::new(InMemoryBroker::new());
        let engine = JobEngine::new(store.clone(), broker, clock.clone(), JobsConfig::default());

        let tenant = TenantId::new();
        let job_id = engine.enqueue(tenant, JobKind::GenerateThumbnail, json!({})).await.unwrap();

        clock.advance(ChronoDuration::hours(2));
        let report = reconcile_pending_orphans(&engine).await.unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.failed, 1);

        let job = store.get_job(job_id).await.unwrap();
        assert_eq!(job.status, turna_domain::JobStatus::Failed);
    }

    #[tokio::test]
    async fn fresh_pending_job_is_not_reaped() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let broker = Arc::new(InMemoryBroker::new());
        let engine = JobEngine::new(store.clone(), broker, clock.clone(), JobsConfig::default());

        let tenant = TenantId::new();
        engine.enqueue(tenant, JobKind::GenerateThumbnail, json!({})).await.unwrap();

        let report = reconcile_pending_orphans(&engine).await.unwrap();
        assert_eq!(report.failed, 0);
    }
}
