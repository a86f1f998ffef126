//! Prometheus metrics for the Job Engine, in the teacher's vendored-`prometheus`
//! style: module-level lazy `static` collectors registered into the
//! default registry, so callers never thread a `Registry` through every
//! function signature.

use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

pub static JOBS_COMPLETED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("turna_jobs_completed_total", "Jobs that finished COMPLETED", &["kind"])
        .expect("metric registration")
});

pub static JOBS_FAILED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("turna_jobs_failed_total", "Jobs that finished FAILED", &["kind", "reason"])
        .expect("metric registration")
});

pub static JOB_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!("turna_job_duration_seconds", "Job handler wall time", &["kind"]).expect("metric registration")
});

pub static RECONCILER_STALE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("turna_jobs_reconciler_stale_total", "Jobs auto-failed as stale by the reconciler", &["kind"])
        .expect("metric registration")
});
