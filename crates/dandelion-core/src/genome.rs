use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::config::SimConfigError;

/// Per-plant stage timers in days, sampled once when the seed is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDurations {
    pub germination: u16,
    pub maturity: u16,
    pub flowering: u16,
    pub withering: u16,
    pub puffball: u16,
    /// Regrowth time between a puffball and the next flowering.
    pub subsequent_maturity: u16,
}

impl StageDurations {
    /// Length of the first pass from seed to puffball release.
    pub fn first_cycle_days(&self) -> u32 {
        [
            self.germination,
            self.maturity,
            self.flowering,
            self.withering,
            self.puffball,
        ]
        .iter()
        .map(|&d| u32::from(d))
        .sum()
    }

    pub fn as_array(&self) -> [u16; 6] {
        [
            self.germination,
            self.maturity,
            self.flowering,
            self.withering,
            self.puffball,
            self.subsequent_maturity,
        ]
    }
}

impl Default for StageDurations {
    fn default() -> Self {
        Self {
            germination: 17,
            maturity: 30,
            flowering: 50,
            withering: 10,
            puffball: 15,
            subsequent_maturity: 350,
        }
    }
}

/// Mean and standard deviation of a normally distributed stage timer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalParams {
    pub mean: f32,
    pub std_dev: f32,
}

impl NormalParams {
    pub const fn new(mean: f32, std_dev: f32) -> Self {
        Self { mean, std_dev }
    }

    pub fn is_valid(&self) -> bool {
        self.mean.is_finite() && self.std_dev.is_finite() && self.std_dev >= 0.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeConfig {
    pub germination: NormalParams,
    pub maturity: NormalParams,
    pub flowering: NormalParams,
    pub withering: NormalParams,
    pub puffball: NormalParams,
    /// Inclusive lower bound of the regrowth timer.
    pub subsequent_maturity_min: u16,
    /// Inclusive upper bound of the regrowth timer.
    pub subsequent_maturity_max: u16,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            germination: NormalParams::new(17.0, 1.0),
            maturity: NormalParams::new(30.0, 2.7),
            flowering: NormalParams::new(50.0, 2.7),
            withering: NormalParams::new(10.0, 1.4),
            puffball: NormalParams::new(15.0, 1.4),
            subsequent_maturity_min: 300,
            subsequent_maturity_max: 400,
        }
    }
}

/// Draws fresh [`StageDurations`] from the configured distributions.
#[derive(Clone, Debug)]
pub struct GenomeSampler {
    germination: Normal<f32>,
    maturity: Normal<f32>,
    flowering: Normal<f32>,
    withering: Normal<f32>,
    puffball: Normal<f32>,
    subsequent_maturity: (u16, u16),
}

impl GenomeSampler {
    pub fn new(config: &GenomeConfig) -> Result<Self, SimConfigError> {
        let normal = |p: NormalParams| {
            Normal::new(p.mean, p.std_dev).map_err(|_| SimConfigError::InvalidGenomeDistribution)
        };
        if config.subsequent_maturity_min > config.subsequent_maturity_max {
            return Err(SimConfigError::InvalidSubsequentMaturityRange);
        }
        Ok(Self {
            germination: normal(config.germination)?,
            maturity: normal(config.maturity)?,
            flowering: normal(config.flowering)?,
            withering: normal(config.withering)?,
            puffball: normal(config.puffball)?,
            subsequent_maturity: (
                config.subsequent_maturity_min,
                config.subsequent_maturity_max,
            ),
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> StageDurations {
        // `as` truncates toward zero and saturates negative draws at 0.
        let mut days = |dist: &Normal<f32>| dist.sample(&mut *rng) as u16;
        let germination = days(&self.germination);
        let maturity = days(&self.maturity);
        let flowering = days(&self.flowering);
        let withering = days(&self.withering);
        let puffball = days(&self.puffball);
        let (lo, hi) = self.subsequent_maturity;
        StageDurations {
            germination,
            maturity,
            flowering,
            withering,
            puffball,
            subsequent_maturity: rng.random_range(lo..=hi),
        }
    }
}
