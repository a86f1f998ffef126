use chrono::Duration;

/// The knobs enumerated in spec §6 that govern this crate. Constructed
/// once at startup and injected everywhere, per §9's "centralize as a
/// `Config` struct" directive — no module reaches into the environment
/// directly.
#[derive(Debug, Clone, Copy)]
pub struct JobsConfig {
    /// Ceiling on the stale-PENDING window (`STALE_WINDOW_MAX`, default 1h).
    pub stale_window_max: Duration,
    /// Floor added per SPEC_FULL.md §E.1: a tiny observed average must not
    /// produce a window so small that healthy-but-slow jobs get reaped.
    pub stale_window_floor: Duration,
    pub sse_poll_min: Duration,
    pub sse_poll_max: Duration,
    pub sse_timeout: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            stale_window_max: Duration::hours(1),
            stale_window_floor: Duration::minutes(3),
            sse_poll_min: Duration::seconds(1),
            sse_poll_max: Duration::seconds(5),
            sse_timeout: Duration::seconds(300),
        }
    }
}
