//! State shared between the coordinator, its workers and any observer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::density::DensityGrid;
use crate::environment::Environment;

/// Readable from any thread at any time. Control flags are the only part
/// observers write.
#[derive(Debug)]
pub struct SimulationContext {
    density: DensityGrid,
    day: AtomicU64,
    paused: AtomicBool,
    shutdown: AtomicBool,
    environment: RwLock<Environment>,
    date: RwLock<String>,
}

impl SimulationContext {
    pub fn new(grid_size: usize) -> Self {
        Self {
            density: DensityGrid::new(grid_size),
            day: AtomicU64::new(1),
            paused: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            environment: RwLock::new(Environment::default()),
            date: RwLock::new(String::new()),
        }
    }

    pub fn density(&self) -> &DensityGrid {
        &self.density
    }

    pub fn population(&self) -> i64 {
        self.density.population()
    }

    /// Number of the day about to be simulated. Starts at 1.
    pub fn day(&self) -> u64 {
        self.day.load(Ordering::Acquire)
    }

    pub(crate) fn advance_day(&self) -> u64 {
        self.day.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn environment(&self) -> Environment {
        *self
            .environment
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Date label of the most recently published day.
    pub fn date(&self) -> String {
        self.date
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn publish(&self, date: &str, environment: Environment) {
        *self
            .environment
            .write()
            .unwrap_or_else(PoisonError::into_inner) = environment;
        let mut current = self.date.write().unwrap_or_else(PoisonError::into_inner);
        current.clear();
        current.push_str(date);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    /// Flip the pause flag; returns the new state.
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}
