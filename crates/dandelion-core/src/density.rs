//! Weighted population counters shared with observers.
//!
//! Workers update these while stepping and observers read them at any time,
//! so every counter is an atomic. Only magnitudes matter, never the order
//! in which concurrent updates land, so relaxed ordering is enough.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::habitat::CellCoord;

#[derive(Debug)]
pub struct DensityGrid {
    size: usize,
    cells: Vec<AtomicI64>,
    population: AtomicI64,
}

impl DensityGrid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: (0..size * size).map(|_| AtomicI64::new(0)).collect(),
            population: AtomicI64::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Record `weight` plants arriving at `coord`.
    pub fn add(&self, coord: CellCoord, weight: i64) {
        self.cells[self.index(coord)].fetch_add(weight, Ordering::Relaxed);
        self.population.fetch_add(weight, Ordering::Relaxed);
    }

    /// Record `weight` plants dying at `coord`.
    pub fn remove(&self, coord: CellCoord, weight: i64) {
        self.cells[self.index(coord)].fetch_sub(weight, Ordering::Relaxed);
        self.population.fetch_sub(weight, Ordering::Relaxed);
    }

    pub fn get(&self, coord: CellCoord) -> i64 {
        self.cells[self.index(coord)].load(Ordering::Relaxed)
    }

    /// Weighted population over the whole grid.
    pub fn population(&self) -> i64 {
        self.population.load(Ordering::Relaxed)
    }

    /// Copy the grid. Not atomic as a whole while workers are stepping.
    pub fn snapshot(&self) -> DensitySnapshot {
        DensitySnapshot {
            size: self.size,
            cells: self.cells.iter().map(|c| c.load(Ordering::Relaxed)).collect(),
        }
    }

    fn index(&self, coord: CellCoord) -> usize {
        debug_assert!(coord.x < self.size && coord.y < self.size);
        coord.y * self.size + coord.x
    }
}

/// Plain copy of a [`DensityGrid`], row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DensitySnapshot {
    size: usize,
    cells: Vec<i64>,
}

impl DensitySnapshot {
    pub fn from_cells(size: usize, cells: Vec<i64>) -> Self {
        assert_eq!(cells.len(), size * size, "cell count must be size * size");
        Self { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, x: usize, y: usize) -> i64 {
        self.cells[y * self.size + x]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[i64]> {
        self.cells.chunks(self.size.max(1))
    }

    pub fn total(&self) -> i64 {
        self.cells.iter().sum()
    }
}
