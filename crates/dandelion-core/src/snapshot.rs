//! Density grid exports: a greyscale PNG plus the raw counts as text.

use image::{Rgb, RgbImage};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::constants::SNAPSHOT_IMAGE_SIZE;
use crate::density::DensitySnapshot;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Receives the density grid on each configured snapshot date.
pub trait SnapshotExporter: Send {
    /// Export `grid` for `date`, returning the files written.
    fn export(&mut self, date: &str, grid: &DensitySnapshot) -> Result<Vec<PathBuf>, SnapshotError>;
}

/// Grey level for a weighted cell count. Empty cells stay white and each
/// hundred plants darkens the cell by another step, down to 15.
pub fn shade(count: i64) -> u8 {
    if count <= 0 {
        return 255;
    }
    let diff = ((count / 100 + 1) * 10).clamp(0, 240);
    (255 - diff) as u8
}

/// Render `grid` at `size x size` pixels, cells scaled to fill the image.
pub fn render(grid: &DensitySnapshot, size: u32) -> RgbImage {
    let cells = grid.size().max(1) as u64;
    RgbImage::from_fn(size, size, |px, py| {
        let x = (u64::from(px) * cells / u64::from(size)) as usize;
        let y = (u64::from(py) * cells / u64::from(size)) as usize;
        let v = shade(grid.get(x, y));
        Rgb([v, v, v])
    })
}

/// One line per row, each count followed by a space.
pub fn to_text(grid: &DensitySnapshot) -> String {
    let mut out = String::with_capacity(grid.size() * grid.size() * 2);
    for row in grid.rows() {
        for count in row {
            let _ = write!(out, "{count} ");
        }
        out.push('\n');
    }
    out
}

/// Writes `<date>.png` and `<date>.txt` into a directory.
#[derive(Clone, Debug)]
pub struct FileSnapshotExporter {
    dir: PathBuf,
    image_size: u32,
}

impl FileSnapshotExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            image_size: SNAPSHOT_IMAGE_SIZE,
        }
    }

    pub fn with_image_size(mut self, image_size: u32) -> Self {
        self.image_size = image_size.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotExporter for FileSnapshotExporter {
    fn export(&mut self, date: &str, grid: &DensitySnapshot) -> Result<Vec<PathBuf>, SnapshotError> {
        fs::create_dir_all(&self.dir).map_err(|source| SnapshotError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let png = self.dir.join(format!("{date}.png"));
        info!(path = %png.display(), "saving density image");
        render(grid, self.image_size)
            .save(&png)
            .map_err(|source| SnapshotError::Image {
                path: png.clone(),
                source,
            })?;

        let txt = self.dir.join(format!("{date}.txt"));
        info!(path = %txt.display(), "saving density counts");
        fs::write(&txt, to_text(grid)).map_err(|source| SnapshotError::Io {
            path: txt.clone(),
            source,
        })?;

        Ok(vec![png, txt])
    }
}
