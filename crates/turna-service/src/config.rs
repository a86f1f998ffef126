use chrono::Duration;
use clap::Parser;
use turna_jobs::JobsConfig;
use turna_solver::SolverConfig;

/// Every knob enumerated in spec §6, parsed once at process startup and
/// injected into the crates below it — no module reaches into the
/// environment directly (§9).
#[derive(Parser, Clone, Debug)]
#[clap(author = "Turna Engineering <eng@turna.dev>", version)]
pub struct Config {
    /// Database connection string for the `tokio-postgres`-shaped store.
    /// Unused by the in-memory reference store this binary wires by
    /// default; present so a real `DomainStore` impl can be dropped in
    /// without touching this crate's argument surface.
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Number of worker tasks pulling from the broker concurrently.
    #[clap(long, env = "SOLVER_WORKERS", default_value_t = 8)]
    pub solver_workers: u32,

    #[clap(long, env = "SOLVER_MAX_SECONDS", default_value_t = 5)]
    pub solver_max_seconds: u32,

    #[clap(long, env = "UNASSIGNED_PENALTY", default_value_t = 1000.0)]
    pub unassigned_penalty: f64,

    #[clap(long, env = "PED_UNASSIGNED_EXTRA_PENALTY", default_value_t = 1000.0)]
    pub ped_unassigned_extra_penalty: f64,

    #[clap(long, env = "PED_PRO_ON_NON_PED_PENALTY", default_value_t = 1.0)]
    pub ped_pro_on_non_ped_penalty: f64,

    #[clap(long, env = "STALE_WINDOW_MAX_SECONDS", default_value_t = 3600)]
    pub stale_window_max_seconds: i64,

    #[clap(long, env = "STALE_WINDOW_FLOOR_SECONDS", default_value_t = 180)]
    pub stale_window_floor_seconds: i64,

    #[clap(long, env = "SSE_POLL_MIN_SECONDS", default_value_t = 1)]
    pub sse_poll_min_seconds: i64,

    #[clap(long, env = "SSE_POLL_MAX_SECONDS", default_value_t = 5)]
    pub sse_poll_max_seconds: i64,

    #[clap(long, env = "SSE_TIMEOUT_SECONDS", default_value_t = 300)]
    pub sse_timeout_seconds: i64,

    /// How often `reconcilePendingOrphans` sweeps (§4.3's cron contract).
    #[clap(long, env = "RECONCILER_INTERVAL_SECONDS", default_value_t = 60)]
    pub reconciler_interval_seconds: u64,
}

impl Config {
    pub fn jobs_config(&self) -> JobsConfig {
        JobsConfig {
            stale_window_max: Duration::seconds(self.stale_window_max_seconds),
            stale_window_floor: Duration::seconds(self.stale_window_floor_seconds),
            sse_poll_min: Duration::seconds(self.sse_poll_min_seconds),
            sse_poll_max: Duration::seconds(self.sse_poll_max_seconds),
            sse_timeout: Duration::seconds(self.sse_timeout_seconds),
        }
    }

    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            unassigned_penalty: self.unassigned_penalty,
            ped_unassigned_extra_penalty: self.ped_unassigned_extra_penalty,
            ped_pro_on_non_ped_penalty: self.ped_pro_on_non_ped_penalty,
            max_seconds: self.solver_max_seconds,
            workers: self.solver_workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = Config::try_parse_from(["turna-worker"]).unwrap();
        assert_eq!(config.unassigned_penalty, 1000.0);
        assert_eq!(config.stale_window_max_seconds, 3600);
        assert_eq!(config.solver_workers, 8);
    }
}
