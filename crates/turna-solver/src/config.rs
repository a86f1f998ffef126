/// The cost/runtime knobs enumerated in spec §6.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    pub unassigned_penalty: f64,
    pub ped_unassigned_extra_penalty: f64,
    pub ped_pro_on_non_ped_penalty: f64,
    pub max_seconds: u32,
    pub workers: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            unassigned_penalty: 1000.0,
            ped_unassigned_extra_penalty: 1000.0,
            ped_pro_on_non_ped_penalty: 1.0,
            max_seconds: 5,
            workers: 8,
        }
    }
}
