//! Allocation Solver (§4.4): converts tenant demands and professional
//! rosters into day-by-day assignments, either via the fast greedy
//! heuristic or the CP-SAT-shaped integer program.

pub mod config;
pub mod cp_sat;
pub mod diagnostics;
pub mod greedy;
pub mod metrics;
pub mod types;

pub use config::SolverConfig;
pub use cp_sat::{solve_cp_sat, CpSatOutcome};
pub use diagnostics::{BottleneckDay, InfeasibilityReport, UncoverableDemand, UncoverableReason};
pub use greedy::solve_greedy;
pub use types::{DayResult, HourRange, DayRange, Professional, SolveOutput, SolverDemand};
