use turna_common::MemberId;

use crate::types::{Professional, SolverDemand};

/// Per-demand eligibility count, for demands that no professional on the
/// roster can ever take regardless of schedule conflicts.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct UncoverableDemand {
    pub token: String,
    pub day: u32,
    pub reason: UncoverableReason,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum UncoverableReason {
    /// Pediatric demand, no pediatric-capable professional on the roster.
    NoPediatricCapableProfessional,
    /// Every professional who could otherwise take it is on vacation for
    /// the entire window.
    AllCandidatesOnVacation,
}

/// A day where feasible-pair supply falls short of demand count, i.e. a
/// day that cannot be fully covered no matter how the solver schedules,
/// independent of the overlap constraint.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BottleneckDay {
    pub day: u32,
    pub demand_count: usize,
    pub max_feasible_pairs: usize,
}

/// Returned by [`crate::cp_sat::solve_cp_sat`] when CBC reports the model
/// infeasible (§4.4 "INFEASIBLE triggers diagnostics"). Since the model
/// only ever creates variables for feasible `(pro, demand)` pairs, true
/// infeasibility under `allow_unassigned = false` traces back to either a
/// demand with zero eligible professionals, or a day where two demands
/// that both need the same sole eligible professional overlap.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InfeasibilityReport {
    pub uncoverable_demands: Vec<UncoverableDemand>,
    pub bottleneck_days: Vec<BottleneckDay>,
}

pub fn diagnose_infeasibility(demands: &[SolverDemand], pros: &[Professional]) -> InfeasibilityReport {
    let mut uncoverable_demands = Vec::new();

    for d in demands {
        let eligible: Vec<&Professional> = pros
            .iter()
            .filter(|p| !(d.is_pediatric && !p.can_peds))
            .filter(|p| p.is_available_for(d))
            .collect();

        if eligible.is_empty() {
            let reason = if d.is_pediatric && pros.iter().all(|p| !p.can_peds) {
                UncoverableReason::NoPediatricCapableProfessional
            } else {
                UncoverableReason::AllCandidatesOnVacation
            };
            uncoverable_demands.push(UncoverableDemand { token: d.token.clone(), day: d.day, reason });
        }
    }

    let mut bottleneck_days = Vec::new();
    let days: std::collections::BTreeSet<u32> = demands.iter().map(|d| d.day).collect();
    for day in days {
        let day_demands: Vec<&SolverDemand> = demands.iter().filter(|d| d.day == day).collect();
        let eligible_pros: std::collections::BTreeSet<MemberId> = day_demands
            .iter()
            .flat_map(|d| pros.iter().filter(|p| !(d.is_pediatric && !p.can_peds) && p.is_available_for(d)).map(|p| p.id))
            .collect();
        let max_feasible_pairs = eligible_pros.len();
        if max_feasible_pairs < day_demands.len() {
            bottleneck_days.push(BottleneckDay { day, demand_count: day_demands.len(), max_feasible_pairs });
        }
    }

    InfeasibilityReport { uncoverable_demands, bottleneck_days }
}

#[cfg(test)]
mod tests {
    use turna_common::MemberId;

    use super::*;

    fn demand(token: &str, day: u32, start: f64, end: f64, ped: bool) -> SolverDemand {
        SolverDemand { token: token.into(), day, start_h: start, end_h: end, is_pediatric: ped, demand_row_id: None, hospital_id: None }
    }

    fn pro(can_peds: bool) -> Professional {
        Professional { id: MemberId::new(), name: "P".into(), sequence: 1, can_peds, vacation: vec![], vacation_days: vec![] }
    }

    #[test]
    fn flags_pediatric_demand_with_no_capable_professional() {
        let demands = vec![demand("A", 1, 6.0, 9.0, true)];
        let pros = vec![pro(false), pro(false)];
        let report = diagnose_infeasibility(&demands, &pros);
        assert_eq!(report.uncoverable_demands.len(), 1);
        assert_eq!(report.uncoverable_demands[0].reason, UncoverableReason::NoPediatricCapableProfessional);
    }

    #[test]
    fn flags_bottleneck_day_when_demand_exceeds_eligible_pros() {
        let demands = vec![demand("A", 1, 6.0, 9.0, false), demand("B", 1, 6.0, 9.0, false)];
        let pros = vec![pro(false)];
        let report = diagnose_infeasibility(&demands, &pros);
        assert_eq!(report.bottleneck_days.len(), 1);
        assert_eq!(report.bottleneck_days[0].max_feasible_pairs, 1);
    }
}
