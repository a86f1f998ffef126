use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

pub static SOLVE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!("turna_solver_duration_seconds", "Time spent inside a single solve call", &["algorithm"])
        .expect("metric registration")
});

pub static SOLVE_OUTCOME_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("turna_solver_outcome_total", "Solve outcomes by algorithm and result", &["algorithm", "outcome"])
        .expect("metric registration")
});
