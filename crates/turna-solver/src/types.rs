use serde::{Deserialize, Serialize};
use turna_common::{DemandId, HospitalId, MemberId};

/// A single hour-offset demand in solver space (§4.1's conversion target).
/// `demand_row_id` is present in `from_demands` mode and absent in
/// `from_extract` mode (SPEC_FULL.md §E.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverDemand {
    /// Solver-local token, stable within one solve. In `from_demands`
    /// mode this is derived from `demand_row_id`; in `from_extract` mode
    /// it is synthesized (room or `D{n}`).
    pub token: String,
    pub day: u32,
    pub start_h: f64,
    pub end_h: f64,
    pub is_pediatric: bool,
    pub demand_row_id: Option<DemandId>,
    pub hospital_id: Option<HospitalId>,
}

impl SolverDemand {
    pub fn overlaps(&self, other: &SolverDemand) -> bool {
        self.day == other.day && self.start_h < other.end_h && other.start_h < self.end_h
    }
}

/// A within-day hour-range unavailability window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourRange {
    pub start_h: f64,
    pub end_h: f64,
}

/// A cross-day whole-day-range unavailability window (inclusive both ends).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayRange {
    pub start_day: u32,
    pub end_day: u32,
}

/// A schedulable professional (`Member` with `sequence > 0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
    pub id: MemberId,
    pub name: String,
    pub sequence: u32,
    pub can_peds: bool,
    pub vacation: Vec<HourRange>,
    pub vacation_days: Vec<DayRange>,
}

impl Professional {
    /// A professional on vacation whose vacation overlaps the demand
    /// window is unavailable (§4.4 hard constraint 3): within-day
    /// vacations are hour ranges against the demand's own day; cross-day
    /// vacations are day-index ranges.
    pub fn is_available_for(&self, demand: &SolverDemand) -> bool {
        let blocked_by_hours = self.vacation.iter().any(|v| v.start_h < demand.end_h && demand.start_h < v.end_h);
        let blocked_by_days =
            self.vacation_days.iter().any(|d| demand.day >= d.start_day && demand.day <= d.end_day);
        !blocked_by_hours && !blocked_by_days
    }
}

/// Per-day output: the rotated professional order, allocations grouped by
/// professional, the day's demand slice, and a parallel `assigned_pids`
/// array aligned to `demands_day` (§4.4 "Output shape per day").
#[derive(Debug, Clone, Serialize)]
pub struct DayResult {
    pub day_number: u32,
    pub pros_for_day: Vec<Professional>,
    pub assigned_demands_by_pro: std::collections::BTreeMap<MemberId, Vec<SolverDemand>>,
    pub demands_day: Vec<SolverDemand>,
    pub assigned_pids: Vec<Option<MemberId>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveOutput {
    pub per_day: Vec<DayResult>,
    pub total_cost: f64,
}
