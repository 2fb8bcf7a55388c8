//! The habitat grid and its partition into worker-owned regions.

use serde::{Deserialize, Serialize};

use crate::plant::Plant;

/// Global cell position. `y` grows southward (row index).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: usize,
    pub y: usize,
}

impl CellCoord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Rectangle of cells owned by one region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionBounds {
    pub x0: usize,
    pub y0: usize,
    pub width: usize,
    pub height: usize,
}

impl RegionBounds {
    pub fn contains(&self, coord: CellCoord) -> bool {
        (self.x0..self.x0 + self.width).contains(&coord.x)
            && (self.y0..self.y0 + self.height).contains(&coord.y)
    }

    fn local_index(&self, coord: CellCoord) -> usize {
        (coord.y - self.y0) * self.width + (coord.x - self.x0)
    }

    fn global(&self, index: usize) -> CellCoord {
        CellCoord::new(self.x0 + index % self.width, self.y0 + index / self.width)
    }
}

/// Splits an `N x N` grid into `k x k` equal square regions, numbered
/// row-major from the north-west corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partition {
    grid_size: usize,
    regions_per_axis: usize,
    region_size: usize,
}

impl Partition {
    /// Callers validate that `regions_per_axis` divides `grid_size`.
    pub fn new(grid_size: usize, regions_per_axis: usize) -> Self {
        assert!(regions_per_axis > 0, "regions_per_axis must be positive");
        assert!(
            grid_size % regions_per_axis == 0,
            "grid_size must be divisible by regions_per_axis"
        );
        Self {
            grid_size,
            regions_per_axis,
            region_size: grid_size / regions_per_axis,
        }
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn region_count(&self) -> usize {
        self.regions_per_axis * self.regions_per_axis
    }

    pub fn bounds(&self, index: usize) -> RegionBounds {
        RegionBounds {
            x0: (index % self.regions_per_axis) * self.region_size,
            y0: (index / self.regions_per_axis) * self.region_size,
            width: self.region_size,
            height: self.region_size,
        }
    }

    /// Index of the region owning `coord`, or `None` off the grid.
    pub fn region_of(&self, coord: CellCoord) -> Option<usize> {
        if coord.x >= self.grid_size || coord.y >= self.grid_size {
            return None;
        }
        Some((coord.y / self.region_size) * self.regions_per_axis + coord.x / self.region_size)
    }
}

/// One worker's share of the habitat. Cells are stored row-major.
#[derive(Clone, Debug)]
pub struct Region {
    index: usize,
    bounds: RegionBounds,
    cells: Vec<Vec<Plant>>,
}

impl Region {
    pub fn new(index: usize, bounds: RegionBounds) -> Self {
        Self {
            index,
            bounds,
            cells: vec![Vec::new(); bounds.width * bounds.height],
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bounds(&self) -> RegionBounds {
        self.bounds
    }

    /// Plants in the cell at global `coord`. Empty for cells outside the region.
    pub fn cell(&self, coord: CellCoord) -> &[Plant] {
        if !self.bounds.contains(coord) {
            return &[];
        }
        &self.cells[self.bounds.local_index(coord)]
    }

    /// Add a plant at global `coord`. Hands the plant back if the cell
    /// belongs to another region.
    pub fn insert(&mut self, coord: CellCoord, plant: Plant) -> Result<(), Plant> {
        if !self.bounds.contains(coord) {
            return Err(plant);
        }
        let idx = self.bounds.local_index(coord);
        self.cells[idx].push(plant);
        Ok(())
    }

    /// Every cell with its global coordinate, mutably.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = (CellCoord, &mut Vec<Plant>)> + '_ {
        let bounds = self.bounds;
        self.cells
            .iter_mut()
            .enumerate()
            .map(move |(i, cell)| (bounds.global(i), cell))
    }

    pub fn population(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }
}

/// The full grid, held as its regions while no day-step is running.
#[derive(Clone, Debug)]
pub struct Habitat {
    partition: Partition,
    regions: Vec<Region>,
}

impl Habitat {
    pub fn new(partition: Partition) -> Self {
        let regions = (0..partition.region_count())
            .map(|i| Region::new(i, partition.bounds(i)))
            .collect();
        Self { partition, regions }
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Move every region out for a day-step. [`Habitat::restore`] puts them back.
    pub fn take_regions(&mut self) -> Vec<Region> {
        std::mem::take(&mut self.regions)
    }

    /// Reinstall regions returned by the workers, in index order.
    pub fn restore(&mut self, mut regions: Vec<Region>) {
        debug_assert_eq!(regions.len(), self.partition.region_count());
        regions.sort_by_key(Region::index);
        self.regions = regions;
    }

    /// True when every region is home and no step is in flight.
    pub fn is_settled(&self) -> bool {
        self.regions.len() == self.partition.region_count()
    }

    /// Route a plant to the region that owns `coord`. Returns the plant if the
    /// coordinate is off the grid or the regions are out on a step.
    pub fn insert(&mut self, coord: CellCoord, plant: Plant) -> Result<(), Plant> {
        match self.partition.region_of(coord) {
            Some(idx) if self.is_settled() => self.regions[idx].insert(coord, plant),
            _ => Err(plant),
        }
    }

    pub fn cell(&self, coord: CellCoord) -> &[Plant] {
        match self.partition.region_of(coord) {
            Some(idx) if self.is_settled() => self.regions[idx].cell(coord),
            _ => &[],
        }
    }

    pub fn population(&self) -> usize {
        self.regions.iter().map(Region::population).sum()
    }
}
