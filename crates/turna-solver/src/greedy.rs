use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::config::SolverConfig;
use crate::types::{DayResult, Professional, SolveOutput, SolverDemand};

/// Per-professional, per-day allocation (§4.4 "Greedy algorithm"):
/// alternates between earliest-start and latest-end picks, respecting the
/// pediatric reservation rule, until neither rule finds a candidate.
///
/// Grounded on `strategy/greedy/allocate.py::greedy_allocate`: same
/// control flow (toggle rule, fall back to the other rule once before
/// giving up on a professional), same two safety guards against runaway
/// loops.
fn greedy_allocate_day(
    demands: &[SolverDemand],
    pros: &[Professional],
) -> (BTreeMap<turna_common::MemberId, Vec<SolverDemand>>, Vec<Option<turna_common::MemberId>>) {
    let n = demands.len();
    let mut remaining: HashSet<usize> = (0..n).collect();
    let mut assigned_by_demand: Vec<Option<turna_common::MemberId>> = vec![None; n];
    let mut assigned_demands_by_pro: BTreeMap<turna_common::MemberId, Vec<SolverDemand>> =
        pros.iter().map(|p| (p.id, Vec::new())).collect();

    debug!(demands = n, pros = pros.len(), "greedy_allocate: starting");

    let max_iterations_per_pro = n.saturating_mul(2).max(1);
    let mut total_iterations: usize = 0;
    let global_limit = n.saturating_mul(pros.len()).saturating_mul(10).max(1);

    for p in pros {
        if remaining.is_empty() {
            break;
        }
        let mut scheduled: Vec<usize> = Vec::new();

        let is_feasible_ped = |di: usize, scheduled: &[usize]| -> bool {
            let d = &demands[di];
            if !d.is_pediatric {
                return false;
            }
            if !p.is_available_for(d) {
                return false;
            }
            !scheduled.iter().any(|&si| demands[si].overlaps(d))
        };

        let is_feasible = |di: usize, scheduled: &[usize], remaining: &HashSet<usize>| -> bool {
            let d = &demands[di];
            if d.is_pediatric && !p.can_peds {
                return false;
            }
            if !p.is_available_for(d) {
                return false;
            }
            if scheduled.iter().any(|&si| demands[si].overlaps(d)) {
                return false;
            }
            // Reservation rule: a pediatric-capable pro skips a
            // non-pediatric pick while some remaining pediatric demand is
            // still feasible for them (§4.4).
            if p.can_peds && !d.is_pediatric {
                let ped_remaining = remaining.iter().any(|&odi| demands[odi].is_pediatric && is_feasible_ped(odi, scheduled));
                if ped_remaining {
                    return false;
                }
            }
            true
        };

        let pick_earliest_start = |scheduled: &[usize], remaining: &HashSet<usize>| -> Option<usize> {
            remaining
                .iter()
                .copied()
                .filter(|&di| is_feasible(di, scheduled, remaining))
                .min_by(|&a, &b| {
                    let da = &demands[a];
                    let db = &demands[b];
                    da.start_h
                        .partial_cmp(&db.start_h)
                        .unwrap()
                        .then((-da.end_h).partial_cmp(&(-db.end_h)).unwrap())
                        .then(a.cmp(&b))
                })
        };

        let pick_latest_end = |scheduled: &[usize], remaining: &HashSet<usize>| -> Option<usize> {
            remaining
                .iter()
                .copied()
                .filter(|&di| is_feasible(di, scheduled, remaining))
                .max_by(|&a, &b| {
                    let da = &demands[a];
                    let db = &demands[b];
                    da.end_h
                        .partial_cmp(&db.end_h)
                        .unwrap()
                        .then((-da.start_h).partial_cmp(&(-db.start_h)).unwrap())
                        .then(b.cmp(&a))
                })
        };

        let mut pick_earliest = true;
        let mut iterations_for_pro = 0usize;
        loop {
            iterations_for_pro += 1;
            total_iterations += 1;

            if iterations_for_pro > max_iterations_per_pro {
                warn!(pro = %p.id, "greedy_allocate: possible loop detected, aborting this professional");
                break;
            }
            if total_iterations > global_limit {
                warn!("greedy_allocate: possible loop detected, aborting the whole day");
                break;
            }

            let mut chosen = if pick_earliest { pick_earliest_start(&scheduled, &remaining) } else { pick_latest_end(&scheduled, &remaining) };
            if chosen.is_none() {
                chosen = if pick_earliest { pick_latest_end(&scheduled, &remaining) } else { pick_earliest_start(&scheduled, &remaining) };
                if chosen.is_none() {
                    break;
                }
                pick_earliest = !pick_earliest;
            }

            let di = chosen.unwrap();
            assigned_by_demand[di] = Some(p.id);
            assigned_demands_by_pro.get_mut(&p.id).unwrap().push(demands[di].clone());
            scheduled.push(di);
            remaining.remove(&di);
            pick_earliest = !pick_earliest;
        }
    }

    (assigned_demands_by_pro, assigned_by_demand)
}

/// `solve_greedy` (§4.4): rotates professionals per day by
/// `start_idx = (base_shift + day_index - 1) mod n_pros` before handing
/// each day's demand slice to [`greedy_allocate_day`], then sums the
/// soft-objective cost across all days.
pub fn solve_greedy(
    demands: &[SolverDemand],
    pros_by_sequence: &[Professional],
    days: u32,
    config: &SolverConfig,
    base_shift: u32,
) -> SolveOutput {
    let n_pros = pros_by_sequence.len().max(1);
    let mut per_day = Vec::with_capacity(days as usize);
    let mut total_cost = 0.0;

    for day in 0..days {
        let day_num = day + 1;
        let demands_day: Vec<SolverDemand> = demands.iter().filter(|d| d.day == day_num).cloned().collect();

        let start_idx = ((base_shift as usize + day as usize) % n_pros) as usize;
        let pros_for_day: Vec<Professional> =
            pros_by_sequence[start_idx..].iter().chain(pros_by_sequence[..start_idx].iter()).cloned().collect();

        let (assigned_demands_by_pro, assigned_pids) = greedy_allocate_day(&demands_day, &pros_for_day);

        let unassigned_count = assigned_pids.iter().filter(|a| a.is_none()).count();
        let ped_unassigned_count = demands_day
            .iter()
            .zip(assigned_pids.iter())
            .filter(|(d, a)| d.is_pediatric && a.is_none())
            .count();
        let reserve_pressure_count = assigned_demands_by_pro
            .iter()
            .flat_map(|(pid, ds)| ds.iter().map(move |d| (pid, d)))
            .filter(|(pid, d)| {
                !d.is_pediatric
                    && pros_for_day.iter().find(|p| &p.id == *pid).map(|p| p.can_peds).unwrap_or(false)
            })
            .count();

        let day_cost = config.unassigned_penalty * unassigned_count as f64
            + config.ped_unassigned_extra_penalty * ped_unassigned_count as f64
            + config.ped_pro_on_non_ped_penalty * reserve_pressure_count as f64;
        total_cost += day_cost;

        per_day.push(DayResult {
            day_number: day_num,
            pros_for_day,
            assigned_demands_by_pro,
            demands_day,
            assigned_pids,
        });
    }

    SolveOutput { per_day, total_cost }
}

#[cfg(test)]
mod tests {
    use turna_common::MemberId;

    use super::*;

    fn demand(token: &str, day: u32, start: f64, end: f64, ped: bool) -> SolverDemand {
        SolverDemand { token: token.into(), day, start_h: start, end_h: end, is_pediatric: ped, demand_row_id: None, hospital_id: None }
    }

    fn pro(can_peds: bool, sequence: u32) -> Professional {
        Professional { id: MemberId::new(), name: format!("P{sequence}"), sequence, can_peds, vacation: vec![], vacation_days: vec![] }
    }

    /// S1 — Greedy rotation: `C` (pediatric) goes to the pediatric pro via
    /// the reservation rule; `A` and `B` go to the two non-pediatric pros
    /// (the earliest-start tie-break's secondary `-end_h` key hands the
    /// longer-duration demand to the first-processed pro). Total cost = 0
    /// either way, since every demand ends up covered.
    #[test]
    fn s1_greedy_rotation_reserves_pediatric_pro() {
        let demands = vec![demand("A", 1, 6.0, 9.0, false), demand("B", 1, 6.0, 10.0, false), demand("C", 1, 7.0, 12.0, true)];
        let p1 = pro(false, 1);
        let p2 = pro(true, 2);
        let p3 = pro(false, 3);
        let pros = vec![p1.clone(), p2.clone(), p3.clone()];

        let out = solve_greedy(&demands, &pros, 1, &SolverConfig::default(), 0);
        assert_eq!(out.total_cost, 0.0);

        let day = &out.per_day[0];
        let assign_of = |token: &str| -> turna_common::MemberId {
            let idx = day.demands_day.iter().position(|d| d.token == token).unwrap();
            day.assigned_pids[idx].unwrap()
        };
        assert_eq!(assign_of("C"), p2.id, "pediatric pro must take the pediatric demand");
        assert_eq!(assign_of("B"), p1.id, "tied earliest-start goes to the longer demand first");
        assert_eq!(assign_of("A"), p3.id);
    }

    /// S2 — two demands, neither pro pediatric-capable: pediatric demand
    /// goes uncovered, cost = 1000 (unassigned) + 1000 (pediatric extra).
    #[test]
    fn s2_pediatric_uncovered_dominates_cost() {
        let demands = vec![demand("A", 1, 6.0, 9.0, false), demand("B", 1, 6.0, 9.0, true)];
        let pros = vec![pro(false, 1), pro(false, 2)];
        let out = solve_greedy(&demands, &pros, 1, &SolverConfig::default(), 0);
        assert_eq!(out.total_cost, 2000.0);

        let day = &out.per_day[0];
        let b_idx = day.demands_day.iter().position(|d| d.token == "B").unwrap();
        assert!(day.assigned_pids[b_idx].is_none());
    }

    #[test]
    fn no_overlap_for_same_pro_same_day() {
        let demands = vec![demand("A", 1, 6.0, 10.0, false), demand("B", 1, 8.0, 12.0, false)];
        let pros = vec![pro(false, 1)];
        let out = solve_greedy(&demands, &pros, 1, &SolverConfig::default(), 0);
        let assigned: Vec<_> = out.per_day[0].assigned_pids.iter().filter(|a| a.is_some()).collect();
        assert_eq!(assigned.len(), 1, "a single pro cannot take two overlapping demands");
    }

    #[test]
    fn determinism_across_repeated_runs() {
        let demands = vec![demand("A", 1, 6.0, 9.0, false), demand("B", 1, 9.0, 12.0, true), demand("C", 2, 7.0, 11.0, false)];
        let pros = vec![pro(true, 1), pro(false, 2)];
        let out1 = solve_greedy(&demands, &pros, 2, &SolverConfig::default(), 0);
        let out2 = solve_greedy(&demands, &pros, 2, &SolverConfig::default(), 0);
        assert_eq!(out1.total_cost, out2.total_cost);
    }
}
