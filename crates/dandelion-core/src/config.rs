use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::dispersal::DispersalConfig;
use crate::environment::Climate;
use crate::genome::GenomeConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Width/height of the square habitat in cells.
    pub grid_size: usize,
    /// The habitat is split into `regions_per_axis^2` regions, one worker each.
    pub regions_per_axis: usize,
    /// Real plants represented by each simulated plant.
    pub ratio: u32,
    /// Climate zone used for the humidity and light tables.
    pub climate: Climate,
    /// Minimum wall-clock length of one simulated day.
    pub day_length_ms: u64,
    /// Cell `[x, y]` where the founder is planted.
    pub founder_cell: [usize; 2],
    /// Dates (as they appear in the weather data) on which to export the
    /// density grid before that day is stepped.
    pub snapshot_dates: Vec<String>,
    /// End the run when the weather data is exhausted instead of pausing.
    pub stop_when_exhausted: bool,
    pub genome: GenomeConfig,
    pub dispersal: DispersalConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            grid_size: crate::constants::DEFAULT_GRID_SIZE,
            regions_per_axis: crate::constants::DEFAULT_REGIONS_PER_AXIS,
            ratio: 1,
            climate: Climate::Temperate,
            day_length_ms: 1000,
            founder_cell: [49, 49],
            snapshot_dates: Vec::new(),
            stop_when_exhausted: true,
            genome: GenomeConfig::default(),
            dispersal: DispersalConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum SimConfigError {
    #[error("grid_size must be positive")]
    InvalidGridSize,
    #[error("grid_size ({actual}) exceeds supported maximum ({max})")]
    GridSizeTooLarge { max: usize, actual: usize },
    #[error("regions_per_axis must be positive")]
    InvalidRegionsPerAxis,
    #[error("grid_size ({grid_size}) must be divisible by regions_per_axis ({regions_per_axis})")]
    IndivisibleGrid {
        grid_size: usize,
        regions_per_axis: usize,
    },
    #[error("ratio must be at least 1")]
    InvalidRatio,
    #[error("founder_cell ({x}, {y}) lies outside the {grid_size}x{grid_size} grid")]
    FounderOutOfBounds { x: usize, y: usize, grid_size: usize },
    #[error("genome stage distributions must have finite means and non-negative finite spreads")]
    InvalidGenomeDistribution,
    #[error("subsequent_maturity_min must not exceed subsequent_maturity_max")]
    InvalidSubsequentMaturityRange,
    #[error("seeds_min must not exceed seeds_max")]
    InvalidSeedRange,
    #[error("distance_std and angle_std must be finite and non-negative")]
    InvalidDispersalSpread,
    #[error("wind_distance_scale must be finite and non-negative")]
    InvalidWindDistanceScale,
    #[error("wind_speed_divisor must be finite and positive")]
    InvalidWindSpeedDivisor,
}

impl SimConfig {
    pub const MAX_GRID_SIZE: usize = crate::constants::MAX_GRID_SIZE;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_grid()?;
        self.validate_founder()?;
        self.validate_genome()?;
        self.validate_dispersal()?;
        Ok(())
    }

    fn validate_grid(&self) -> Result<(), SimConfigError> {
        if self.grid_size == 0 {
            return Err(SimConfigError::InvalidGridSize);
        }
        if self.grid_size > Self::MAX_GRID_SIZE {
            return Err(SimConfigError::GridSizeTooLarge {
                max: Self::MAX_GRID_SIZE,
                actual: self.grid_size,
            });
        }
        if self.regions_per_axis == 0 {
            return Err(SimConfigError::InvalidRegionsPerAxis);
        }
        if self.grid_size % self.regions_per_axis != 0 {
            return Err(SimConfigError::IndivisibleGrid {
                grid_size: self.grid_size,
                regions_per_axis: self.regions_per_axis,
            });
        }
        if self.ratio == 0 {
            return Err(SimConfigError::InvalidRatio);
        }
        Ok(())
    }

    fn validate_founder(&self) -> Result<(), SimConfigError> {
        let [x, y] = self.founder_cell;
        if x >= self.grid_size || y >= self.grid_size {
            return Err(SimConfigError::FounderOutOfBounds {
                x,
                y,
                grid_size: self.grid_size,
            });
        }
        Ok(())
    }

    fn validate_genome(&self) -> Result<(), SimConfigError> {
        let g = &self.genome;
        if ![g.germination, g.maturity, g.flowering, g.withering, g.puffball]
            .iter()
            .all(|p| p.is_valid())
        {
            return Err(SimConfigError::InvalidGenomeDistribution);
        }
        if g.subsequent_maturity_min > g.subsequent_maturity_max {
            return Err(SimConfigError::InvalidSubsequentMaturityRange);
        }
        Ok(())
    }

    fn validate_dispersal(&self) -> Result<(), SimConfigError> {
        let d = &self.dispersal;
        if d.seeds_min > d.seeds_max {
            return Err(SimConfigError::InvalidSeedRange);
        }
        if !(d.distance_std.is_finite() && d.distance_std >= 0.0)
            || !(d.angle_std.is_finite() && d.angle_std >= 0.0)
        {
            return Err(SimConfigError::InvalidDispersalSpread);
        }
        if !(d.wind_distance_scale.is_finite() && d.wind_distance_scale >= 0.0) {
            return Err(SimConfigError::InvalidWindDistanceScale);
        }
        if !(d.wind_speed_divisor.is_finite() && d.wind_speed_divisor > 0.0) {
            return Err(SimConfigError::InvalidWindSpeedDivisor);
        }
        Ok(())
    }
}

/// Parse a plants-per-agent ratio from user input. Anything that is not a
/// positive integer falls back to 1.
pub fn parse_ratio(input: &str) -> u32 {
    match input.trim().parse::<u32>() {
        Ok(ratio) if ratio > 0 => ratio,
        _ => {
            warn!(input, "invalid ratio; using 1");
            1
        }
    }
}
