use serde::{Deserialize, Serialize};

use crate::constants::{INITIAL_HEALTH, MAX_HEALTH};
use crate::genome::StageDurations;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Germinating,
    Maturing,
    Flowering,
    Withering,
    Puffball,
    /// Regrowth after the first release. Cycles back into `Flowering`.
    SubsequentMaturing,
}

impl Stage {
    /// Stage entered once the current stage timer has elapsed.
    pub fn next(self) -> Self {
        match self {
            Stage::Germinating => Stage::Maturing,
            Stage::Maturing => Stage::Flowering,
            Stage::Flowering => Stage::Withering,
            Stage::Withering => Stage::Puffball,
            Stage::Puffball => Stage::SubsequentMaturing,
            Stage::SubsequentMaturing => Stage::Flowering,
        }
    }
}

/// A single simulated dandelion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    /// Days of development since the seed landed. Frozen on cold days.
    pub age: u32,
    pub days_in_stage: u32,
    pub stage: Stage,
    // Kept private so it never leaves [0, MAX_HEALTH].
    health: i32,
    pub durations: StageDurations,
    pub is_founder: bool,
}

impl Plant {
    /// A freshly landed seed.
    pub fn new(durations: StageDurations) -> Self {
        Self {
            age: 0,
            days_in_stage: 0,
            stage: Stage::Germinating,
            health: INITIAL_HEALTH,
            durations,
            is_founder: false,
        }
    }

    /// The bootstrap plant: pre-aged through its first cycle and due to
    /// release its puffball on the next step.
    pub fn founder(durations: StageDurations) -> Self {
        Self {
            age: durations.first_cycle_days(),
            days_in_stage: u32::from(durations.puffball),
            stage: Stage::Puffball,
            health: INITIAL_HEALTH,
            durations,
            is_founder: true,
        }
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn set_health(&mut self, health: i32) {
        self.health = health.clamp(0, MAX_HEALTH);
    }

    /// Apply `delta` and clamp to the valid health range.
    pub fn adjust_health(&mut self, delta: i32) {
        self.set_health(self.health.saturating_add(delta));
    }

    pub fn with_health(mut self, health: i32) -> Self {
        self.set_health(health);
        self
    }

    /// Scale a raw timer by current health. Below [`INITIAL_HEALTH`] timers
    /// shrink linearly and reach zero at health 0.
    pub fn scale_duration(&self, days: u16) -> u32 {
        let days = u32::from(days);
        if self.health >= INITIAL_HEALTH {
            days
        } else {
            days * self.health as u32 / INITIAL_HEALTH as u32
        }
    }

    /// Health-scaled timer of `stage`.
    pub fn scaled_duration(&self, stage: Stage) -> u32 {
        let d = &self.durations;
        self.scale_duration(match stage {
            Stage::Germinating => d.germination,
            Stage::Maturing => d.maturity,
            Stage::Flowering => d.flowering,
            Stage::Withering => d.withering,
            Stage::Puffball => d.puffball,
            Stage::SubsequentMaturing => d.subsequent_maturity,
        })
    }

    /// True when any scaled stage timer has collapsed to zero.
    pub fn has_collapsed_timer(&self) -> bool {
        self.durations
            .as_array()
            .iter()
            .any(|&d| self.scale_duration(d) == 0)
    }
}
