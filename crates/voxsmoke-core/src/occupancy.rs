//! Static occupancy baked from scene geometry.
//!
//! The bitmap is sampled once per cell center at startup and never changes
//! afterward. It is stored as one `u32` per cell so it can be uploaded to a
//! device storage buffer as-is.

use glam::Vec3;

use crate::grid::Grid;

/// Default probe radius used when sampling cell centers.
pub const DEFAULT_PROBE_RADIUS: f32 = 0.1;

/// Answers whether static scene geometry overlaps a small sphere.
pub trait OccupancyProbe {
    /// Returns true if anything solid lies within `radius` of `point`.
    fn is_occupied(&self, point: Vec3, radius: f32) -> bool;
}

impl<F> OccupancyProbe for F
where
    F: Fn(Vec3, f32) -> bool,
{
    fn is_occupied(&self, point: Vec3, radius: f32) -> bool {
        self(point, radius)
    }
}

/// A probe for scenes without static colliders.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScene;

impl OccupancyProbe for EmptyScene {
    fn is_occupied(&self, _point: Vec3, _radius: f32) -> bool {
        false
    }
}

/// Per-cell blocked flags in canonical grid order (1 = blocked, 0 = free).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyBitmap {
    flags: Vec<u32>,
}

impl OccupancyBitmap {
    /// Samples `probe` at every cell center of `grid`.
    ///
    /// Runs exactly one probe query per cell, in index order.
    pub fn bake(grid: &Grid, probe: &dyn OccupancyProbe, radius: f32) -> Self {
        let flags: Vec<u32> = grid
            .cell_centers()
            .map(|center| u32::from(probe.is_occupied(center, radius)))
            .collect();

        let bitmap = Self { flags };
        log::info!(
            "baked occupancy: {} of {} cells blocked (probe radius {radius})",
            bitmap.num_occupied(),
            bitmap.len()
        );
        bitmap
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns true if the bitmap has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Returns whether the cell at `idx` is blocked. Out-of-range indices are free.
    #[must_use]
    pub fn is_occupied(&self, idx: usize) -> bool {
        self.flags.get(idx).is_some_and(|&f| f != 0)
    }

    /// Returns the number of blocked cells.
    #[must_use]
    pub fn num_occupied(&self) -> usize {
        self.flags.iter().filter(|&&f| f != 0).count()
    }

    /// Returns the raw flags.
    #[must_use]
    pub fn flags(&self) -> &[u32] {
        &self.flags
    }

    /// Returns the flags as bytes for a device upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.flags)
    }
}
