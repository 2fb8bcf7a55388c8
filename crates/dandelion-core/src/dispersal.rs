//! Wind-driven seed dispersal.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::config::SimConfigError;
use crate::environment::Environment;
use crate::genome::GenomeSampler;
use crate::habitat::CellCoord;
use crate::plant::Plant;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispersalConfig {
    /// Inclusive lower bound of seeds per puffball.
    pub seeds_min: u32,
    /// Inclusive upper bound of seeds per puffball.
    pub seeds_max: u32,
    /// Spread of the flight distance, in cells.
    pub distance_std: f32,
    /// Spread of the flight heading around the wind direction, in degrees.
    pub angle_std: f32,
    /// Cells of drift added per unit of `wind_speed / wind_speed_divisor`.
    pub wind_distance_scale: f32,
    /// Converts wind speed into the drift unit (km/h to m/s).
    pub wind_speed_divisor: f32,
}

impl Default for DispersalConfig {
    fn default() -> Self {
        Self {
            seeds_min: 1500,
            seeds_max: 2000,
            distance_std: 6.0,
            angle_std: 20.0,
            wind_distance_scale: 3.0,
            wind_speed_divisor: 3.6,
        }
    }
}

/// A seed in flight: destination cell plus the plant it will grow into.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedEvent {
    pub destination: CellCoord,
    pub plant: Plant,
}

/// Result of bursting one puffball.
#[derive(Debug, Default)]
pub struct Release {
    pub seeds: Vec<SeedEvent>,
    /// Seeds that left the habitat and were dropped.
    pub discarded: u32,
}

#[derive(Clone, Debug)]
pub struct Disperser {
    seeds_min: u32,
    seeds_max: u32,
    distance: Normal<f32>,
    angle: Normal<f32>,
    wind_distance_scale: f32,
    wind_speed_divisor: f32,
    grid_size: usize,
    ratio: u32,
}

impl Disperser {
    pub fn new(
        config: &DispersalConfig,
        grid_size: usize,
        ratio: u32,
    ) -> Result<Self, SimConfigError> {
        if config.seeds_min > config.seeds_max {
            return Err(SimConfigError::InvalidSeedRange);
        }
        let distance = Normal::new(0.0, config.distance_std)
            .map_err(|_| SimConfigError::InvalidDispersalSpread)?;
        let angle =
            Normal::new(0.0, config.angle_std).map_err(|_| SimConfigError::InvalidDispersalSpread)?;
        Ok(Self {
            seeds_min: config.seeds_min,
            seeds_max: config.seeds_max,
            distance,
            angle,
            wind_distance_scale: config.wind_distance_scale,
            wind_speed_divisor: config.wind_speed_divisor,
            grid_size,
            ratio: ratio.max(1),
        })
    }

    /// Number of seeds a puffball releases. The founder stands for `ratio`
    /// plants at once, so its output is divided by `ratio`.
    pub fn seed_count<R: Rng + ?Sized>(&self, is_founder: bool, rng: &mut R) -> u32 {
        let seeds = rng.random_range(self.seeds_min..=self.seeds_max);
        if is_founder { seeds / self.ratio } else { seeds }
    }

    /// Random `(dx, dy)` flight for one seed; `dy` points north.
    pub fn displacement<R: Rng + ?Sized>(&self, env: &Environment, rng: &mut R) -> (i64, i64) {
        let drift = self.wind_distance_scale * env.wind_speed / self.wind_speed_divisor;
        let distance = (self.distance.sample(&mut *rng) + drift).round();
        let heading = self.angle.sample(&mut *rng).round() + env.wind_direction as f32;
        let radians = heading.to_radians();
        (
            (distance * radians.sin()).round() as i64,
            (distance * radians.cos()).round() as i64,
        )
    }

    /// Landing cell for a displacement from `source`, if it stays on the grid.
    /// Grid rows grow southward, hence the subtracted `dy`.
    pub fn landing(&self, source: CellCoord, (dx, dy): (i64, i64)) -> Option<CellCoord> {
        let x = source.x as i64 + dx;
        let y = source.y as i64 - dy;
        let size = self.grid_size as i64;
        if (0..size).contains(&x) && (0..size).contains(&y) {
            Some(CellCoord::new(x as usize, y as usize))
        } else {
            None
        }
    }

    /// Burst the puffball of a plant standing at `source`.
    pub fn release<R: Rng + ?Sized>(
        &self,
        source: CellCoord,
        is_founder: bool,
        env: &Environment,
        genome: &GenomeSampler,
        rng: &mut R,
    ) -> Release {
        let count = self.seed_count(is_founder, rng);
        let mut release = Release {
            seeds: Vec::with_capacity(count as usize),
            discarded: 0,
        };
        for _ in 0..count {
            let offset = self.displacement(env, rng);
            match self.landing(source, offset) {
                Some(destination) => release.seeds.push(SeedEvent {
                    destination,
                    plant: Plant::new(genome.sample(rng)),
                }),
                None => release.discarded += 1,
            }
        }
        release
    }
}
