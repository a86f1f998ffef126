//! The worker-pool side of §5's concurrency model: N tasks pulling
//! [`JobMessage`]s off a shared receiver and handing each to
//! [`JobEngine::execute_claim`], plus the cron loop for
//! `reconcilePendingOrphans`.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::sync::{mpsc, Mutex};
use turna_jobs::{reconcile_pending_orphans, JobEngine, JobMessage};

/// Runs until `receiver` closes (broker shutdown). Multiple calls may
/// share one `receiver` behind the same `Mutex` to form a pool — only
/// one task at a time pulls the next message, but handling it runs
/// concurrently with the others' claim/execute cycles, matching §5's
/// "many workers across kinds" model.
pub async fn run_worker(engine: Arc<JobEngine>, receiver: Arc<Mutex<mpsc::UnboundedReceiver<JobMessage>>>) {
    loop {
        let message = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };
        let Some(message) = message else {
            tracing::info!("worker exiting: broker channel closed");
            break;
        };
        let job_id = message.job_id;
        match engine.execute_claim(message).await {
            Ok(outcome) => tracing::debug!(?job_id, ?outcome, "job claim processed"),
            Err(err) => tracing::warn!(?job_id, error = %err, "job claim failed"),
        }
    }
}

/// The cron sweep of §4.3, run on a fixed interval for the lifetime of
/// the process.
pub async fn run_reconciler_loop(engine: Arc<JobEngine>, interval: StdDuration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match reconcile_pending_orphans(&engine).await {
            Ok(report) => {
                if report.failed > 0 {
                    tracing::info!(scanned = report.scanned, failed = report.failed, "reconciled stale pending jobs");
                }
            }
            Err(err) => tracing::warn!(error = %err, "reconciler sweep failed"),
        }
    }
}
