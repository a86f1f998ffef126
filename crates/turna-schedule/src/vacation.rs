use std::collections::HashSet;

use chrono::NaiveDate;
use chrono_tz::Tz;
use turna_domain::member::VacationRange;
use turna_solver::{DayRange, HourRange};

/// Splits a `Member`'s ISO vacation pairs into same-civil-day hour blocks
/// and multi-day whole-day ranges (SPEC_FULL.md §C "vacation day-range vs
/// hour-range duality"), grounded on
/// `original_source::_parse_vacation_for_solver`.
///
/// Same-day pairs become an `(hour_start, hour_end)` block that applies
/// to every day of the period — the original deliberately drops which day
/// it fell on, deduplicating identical hour blocks via a `seen` set; this
/// keeps that behavior rather than "fixing" it into a per-day block.
pub fn vacation_for_solver(
    vacation: &[VacationRange],
    tz: Tz,
    period_start_date: NaiveDate,
) -> (Vec<HourRange>, Vec<DayRange>) {
    let mut hours = Vec::new();
    let mut days = Vec::new();
    let mut seen_hours: HashSet<(i64, i64)> = HashSet::new();

    for v in vacation {
        let start_local = v.start.with_timezone(&tz);
        let end_local = v.end.with_timezone(&tz);

        if start_local.date_naive() == end_local.date_naive() {
            let h_start = hour_of(start_local);
            let h_end = hour_of(end_local);
            let key = ((h_start * 100.0).round() as i64, (h_end * 100.0).round() as i64);
            if seen_hours.insert(key) {
                hours.push(HourRange { start_h: h_start, end_h: h_end });
            }
        } else {
            let start_day = (start_local.date_naive() - period_start_date).num_days() + 1;
            let end_day = (end_local.date_naive() - period_start_date).num_days();
            if end_day >= 1 {
                days.push(DayRange { start_day: start_day.max(1) as u32, end_day: end_day as u32 });
            }
        }
    }

    (hours, days)
}

fn hour_of(dt: chrono::DateTime<Tz>) -> f64 {
    use chrono::Timelike;
    dt.hour() as f64 + dt.minute() as f64 / 60.0 + dt.second() as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use turna_common::time::parse_timezone;

    use super::*;

    #[test]
    fn same_day_pair_becomes_hour_block() {
        let tz = parse_timezone("UTC").unwrap();
        let v = VacationRange {
            start: Utc.with_ymd_and_hms(2026, 1, 2, 7, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 1, 2, 22, 0, 0).unwrap(),
        };
        let period_start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let (hours, days) = vacation_for_solver(&[v], tz, period_start);
        assert_eq!(hours, vec![HourRange { start_h: 7.0, end_h: 22.0 }]);
        assert!(days.is_empty());
    }

    #[test]
    fn multi_day_pair_becomes_day_range() {
        let tz = parse_timezone("UTC").unwrap();
        let v = VacationRange {
            start: Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 1, 6, 0, 0, 0).unwrap(),
        };
        let period_start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let (hours, days) = vacation_for_solver(&[v], tz, period_start);
        assert!(hours.is_empty());
        assert_eq!(days, vec![DayRange { start_day: 3, end_day: 5 }]);
    }

    #[test]
    fn duplicate_hour_blocks_are_deduplicated() {
        let tz = parse_timezone("UTC").unwrap();
        let a = VacationRange {
            start: Utc.with_ymd_and_hms(2026, 1, 2, 7, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap(),
        };
        let b = VacationRange {
            start: Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
        };
        let period_start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let (hours, _) = vacation_for_solver(&[a, b], tz, period_start);
        assert_eq!(hours.len(), 1, "identical hour blocks on different days collapse to one");
    }
}
