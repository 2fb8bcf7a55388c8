use serde::{Deserialize, Serialize};

use crate::environment::{Climate, Environment};
use crate::worker::StepStats;

/// Outcome of one simulated day.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DayReport {
    pub day: u64,
    pub date: String,
    pub environment: Environment,
    /// Weighted population after the day's seeds were merged.
    pub population: i64,
    /// Simulated plants, each standing for `ratio` real ones.
    pub plants: usize,
    #[serde(flatten)]
    pub stats: StepStats,
    pub seeds_inserted: u64,
    /// Worker reports gathered before any seed was merged.
    pub workers_reported: usize,
    pub step_us: u64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub ratio: u32,
    pub climate: Climate,
    pub days: u64,
    pub final_population: i64,
    pub final_plants: usize,
    pub peak_population: i64,
    #[serde(default)]
    pub total_deaths: u64,
    #[serde(default)]
    pub total_seeds_inserted: u64,
    #[serde(default)]
    pub snapshots_written: Vec<String>,
    pub weather_exhausted: bool,
    #[serde(default)]
    pub reports: Vec<DayReport>,
}
