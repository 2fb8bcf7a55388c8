//! Daily development and health update for a single plant.

use rand::Rng;

use crate::constants::{
    DEVELOPMENT_MIN_TEMPERATURE, GERMINATION_HEALTH_BONUS, SEEDLING_PREDATION_CHANCE,
};
use crate::environment::Environment;
use crate::plant::{Plant, Stage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// The puffball just burst. The plant lives on into regrowth.
    ReleaseSeeds,
    Die,
}

/// Advance `plant` by one day under `env`.
///
/// The health adjustments are applied and clamped one after another in a
/// fixed order; reordering them changes results near the bounds.
pub fn step<R: Rng + ?Sized>(plant: &mut Plant, env: &Environment, rng: &mut R) -> Outcome {
    if plant.has_collapsed_timer() {
        return Outcome::Die;
    }

    let entered = plant.stage;
    let mut outcome = Outcome::Continue;
    if plant.days_in_stage >= plant.scaled_duration(entered) {
        plant.stage = entered.next();
        plant.days_in_stage = 0;
        match entered {
            Stage::Germinating => plant.adjust_health(GERMINATION_HEALTH_BONUS),
            Stage::Puffball => outcome = Outcome::ReleaseSeeds,
            _ => {}
        }
    }

    if entered == Stage::Germinating && eaten_as_seedling(plant, rng) {
        return Outcome::Die;
    }

    apply_precipitation(plant, env.precipitation);
    apply_temperature(plant, env.temperature);
    apply_humidity(plant, env.temperature, env.humidity);
    if env.light < 9.0 {
        plant.adjust_health(-1);
    }

    if plant.health() <= 0 {
        Outcome::Die
    } else {
        outcome
    }
}

/// Seedling predation: the faster a seed germinates, the less exposed it is.
fn eaten_as_seedling<R: Rng + ?Sized>(plant: &Plant, rng: &mut R) -> bool {
    let germination = plant.scaled_duration(Stage::Germinating);
    // Unreachable after the collapsed-timer check; guards the division.
    if germination == 0 {
        return true;
    }
    let roll: u32 = rng.random_range(1..=100);
    roll as f32 <= SEEDLING_PREDATION_CHANCE / germination as f32
}

fn apply_precipitation(plant: &mut Plant, precipitation: f32) {
    if precipitation < 0.7 {
        plant.adjust_health(-5);
    } else if precipitation <= 1.4 {
        plant.adjust_health(-2);
    } else {
        plant.adjust_health(1);
    }
}

fn apply_temperature(plant: &mut Plant, temperature: f32) {
    if temperature >= DEVELOPMENT_MIN_TEMPERATURE {
        plant.age = plant.age.saturating_add(1);
        plant.days_in_stage = plant.days_in_stage.saturating_add(1);
    }
    if temperature > 40.0 {
        plant.adjust_health(-7);
    } else if temperature > 30.0 {
        plant.adjust_health(-1);
    } else if temperature < 10.0 {
        plant.adjust_health(-1);
    } else {
        plant.adjust_health(2);
    }
}

fn apply_humidity(plant: &mut Plant, temperature: f32, humidity: i32) {
    if temperature > 30.0 && humidity < 60 {
        plant.adjust_health(-2);
    }
    if humidity < 40 {
        plant.adjust_health(-2);
    }
    if (40..=80).contains(&humidity) {
        plant.adjust_health(1);
    }
}
