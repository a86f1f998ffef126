//! Canonical instant representation and interval arithmetic.
//!
//! Instants are always UTC with an explicit offset; "day" semantics are
//! computed against a tenant's IANA timezone, never against the host
//! clock's local time.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use turna_errors::TurnaError;

/// A UTC instant. Callers never construct these from naive local times.
pub type Instant = DateTime<Utc>;

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: Instant,
    pub end: Instant,
}

impl Interval {
    pub fn new(start: Instant, end: Instant) -> Result<Self, TurnaError> {
        if end <= start {
            return Err(TurnaError::bad_request(
                "InvertedInterval",
                "interval end must be strictly after start",
            ));
        }
        Ok(Self { start, end })
    }

    /// `overlaps(a, b) ⇔ a.start < b.end ∧ b.start < a.end`
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Parses and validates an IANA timezone name (e.g. `"America/Sao_Paulo"`).
pub fn parse_timezone(name: &str) -> Result<Tz, TurnaError> {
    name.parse::<Tz>()
        .map_err(|_| TurnaError::bad_request("InvalidTimezone", format!("unknown IANA timezone: {name}")))
}

/// An hour offset within a civil day, as a fraction (e.g. `9.5` = 09:30).
pub type HourOffset = f64;

/// Converts an [`Interval`] into solver space: a 1-based day index relative
/// to `period_start_local_date` in `tz`, plus start/end hour offsets from
/// that day's local civil midnight.
///
/// Returns `None` when the interval's local start date falls outside the
/// scheduling period `[1, period_days]`; callers discard such demands
/// rather than erroring, per the period being a hard boundary.
pub fn to_solver_space(
    interval: &Interval,
    tz: Tz,
    period_start_local_date: NaiveDate,
    period_days: u32,
) -> Option<SolverTime> {
    let local_start = interval.start.with_timezone(&tz);
    let local_end = interval.end.with_timezone(&tz);

    let day_index = (local_start.date_naive() - period_start_local_date).num_days() + 1;
    if day_index < 1 || day_index > period_days as i64 {
        return None;
    }

    let start_h = hour_offset(&local_start);
    // An interval may cross local midnight; express `end_h` relative to the
    // same civil day as `start`, extending past 24 when it spills over.
    let spanned_days = (local_end.date_naive() - local_start.date_naive()).num_days();
    let end_h = hour_offset(&local_end) + (spanned_days.max(0) as f64) * 24.0;

    Some(SolverTime { day_index: day_index as u32, start_h, end_h })
}

fn hour_offset(dt: &DateTime<Tz>) -> HourOffset {
    dt.hour() as f64 + dt.minute() as f64 / 60.0 + dt.second() as f64 / 3600.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverTime {
    pub day_index: u32,
    pub start_h: HourOffset,
    pub end_h: HourOffset,
}

/// Injectable source of "now", so business logic never calls
/// `Utc::now()` directly and tests can run against a fixed instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Utc::now()
    }
}

/// A clock with a settable instant, used throughout the test suites of
/// the job engine and solver to make time-dependent behavior
/// (staleness windows, SSE backoff) deterministic.
#[derive(Debug, Clone)]
pub struct FixedClock(std::sync::Arc<parking_lot::Mutex<Instant>>);

impl FixedClock {
    pub fn new(at: Instant) -> Self {
        Self(std::sync::Arc::new(parking_lot::Mutex::new(at)))
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.0.lock();
        *guard += by;
    }

    pub fn set(&self, at: Instant) {
        *self.0.lock() = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        *self.0.lock()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> Instant {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn overlap_is_half_open() {
        let a = Interval::new(dt(2026, 1, 1, 6, 0), dt(2026, 1, 1, 9, 0)).unwrap();
        let b = Interval::new(dt(2026, 1, 1, 9, 0), dt(2026, 1, 1, 12, 0)).unwrap();
        assert!(!a.overlaps(&b), "touching intervals must not overlap");

        let c = Interval::new(dt(2026, 1, 1, 8, 59), dt(2026, 1, 1, 12, 0)).unwrap();
        assert!(a.overlaps(&c));
    }

    #[test]
    fn rejects_inverted_interval() {
        assert!(Interval::new(dt(2026, 1, 1, 9, 0), dt(2026, 1, 1, 6, 0)).is_err());
    }

    #[test]
    fn solver_space_day_index_is_one_based_and_local() {
        let tz = parse_timezone("America/Sao_Paulo").unwrap();
        // 2026-01-01 09:00 UTC is 2026-01-01 06:00 in America/Sao_Paulo (UTC-3).
        let interval = Interval::new(dt(2026, 1, 1, 9, 0), dt(2026, 1, 1, 12, 0)).unwrap();
        let period_start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let solved = to_solver_space(&interval, tz, period_start, 7).unwrap();
        assert_eq!(solved.day_index, 1);
        assert_eq!(solved.start_h, 6.0);
        assert_eq!(solved.end_h, 9.0);
    }

    #[test]
    fn solver_space_discards_demands_outside_period() {
        let tz = parse_timezone("UTC").unwrap();
        let interval = Interval::new(dt(2026, 2, 1, 9, 0), dt(2026, 2, 1, 12, 0)).unwrap();
        let period_start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(to_solver_space(&interval, tz, period_start, 7).is_none());
    }
}
