/// Default edge length of the square habitat grid, in cells.
pub const DEFAULT_GRID_SIZE: usize = 100;

/// Largest supported grid edge. Keeps the density grid allocation bounded.
pub const MAX_GRID_SIZE: usize = 4096;

/// Default number of regions along each axis (2 x 2 quadrants).
pub const DEFAULT_REGIONS_PER_AXIS: usize = 2;

/// Prime multiplier used to derive per-worker RNG streams from a base seed.
pub const RNG_DERIVATION_PRIME: u64 = 7919;

/// Health every plant starts with. Durations are scaled below this value.
pub const INITIAL_HEALTH: i32 = 50;

/// Upper bound of the health scale.
pub const MAX_HEALTH: i32 = 100;

/// Health granted when a seedling finishes germinating.
pub const GERMINATION_HEALTH_BONUS: i32 = 50;

/// Numerator of the daily seedling predation threshold (`roll <= 55 / g`).
pub const SEEDLING_PREDATION_CHANCE: f32 = 55.0;

/// Minimum temperature (C) at which plants age and stage timers advance.
pub const DEVELOPMENT_MIN_TEMPERATURE: f32 = 5.0;

/// Edge length of exported snapshot images, in pixels.
pub const SNAPSHOT_IMAGE_SIZE: u32 = 800;
