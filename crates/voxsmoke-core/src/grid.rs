//! Regular voxel grid anchored to a floor surface.
//!
//! Cells are indexed row-major with z innermost:
//! `idx = x * (ny * nz) + y * nz + z`. The same ordering is used by every
//! host array and device buffer in the crate.

use glam::{IVec3, UVec3, Vec3};

use crate::error::{Result, SmokeError};

/// An immutable axis-aligned grid of cubic voxels.
///
/// `Grid` is defined by:
/// - The minimum corner in world space
/// - The voxel edge length `s`
/// - The number of cells along each axis, `ceil(extent / s)`
///
/// The cell-aligned maximum corner (`min + dims * s`) can lie slightly past
/// the requested maximum when an extent is not a multiple of `s`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    dims: UVec3,
    voxel_size: f32,
    bound_min: Vec3,
    requested_max: Vec3,
}

impl Grid {
    /// Creates a grid sitting on a floor.
    ///
    /// The grid spans `anchor.x ± half_extent_x` and `anchor.z ± half_extent_z`
    /// horizontally and `[anchor.y, anchor.y + extent_y]` vertically.
    ///
    /// # Errors
    /// Returns [`SmokeError::InvalidArgument`] if `voxel_size` is not a positive
    /// finite number or any extent is not positive.
    pub fn from_anchor(
        anchor: Vec3,
        half_extent_x: f32,
        extent_y: f32,
        half_extent_z: f32,
        voxel_size: f32,
    ) -> Result<Self> {
        let min = Vec3::new(anchor.x - half_extent_x, anchor.y, anchor.z - half_extent_z);
        let max = Vec3::new(
            anchor.x + half_extent_x,
            anchor.y + extent_y,
            anchor.z + half_extent_z,
        );
        Self::from_bounds(min, max, voxel_size)
    }

    /// Creates a grid covering the box `[min, max]`.
    ///
    /// # Errors
    /// Returns [`SmokeError::InvalidArgument`] if `voxel_size` is not a positive
    /// finite number, the bounds are not finite, `max` is not strictly greater
    /// than `min` on every axis, or the cell count does not fit a `u32` index.
    pub fn from_bounds(min: Vec3, max: Vec3, voxel_size: f32) -> Result<Self> {
        if !(voxel_size.is_finite() && voxel_size > 0.0) {
            return Err(SmokeError::invalid(format!(
                "voxel size must be positive and finite, got {voxel_size}"
            )));
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(SmokeError::invalid(format!(
                "grid bounds must be finite, got {min} .. {max}"
            )));
        }
        let extent = max - min;
        if extent.cmple(Vec3::ZERO).any() {
            return Err(SmokeError::invalid(format!(
                "malformed grid bounds: {min} .. {max}"
            )));
        }

        let dims = (extent / voxel_size).ceil().as_uvec3().max(UVec3::ONE);
        let num_cells = u64::from(dims.x) * u64::from(dims.y) * u64::from(dims.z);
        if num_cells > u64::from(u32::MAX) {
            return Err(SmokeError::invalid(format!(
                "grid of {}x{}x{} cells is too large",
                dims.x, dims.y, dims.z
            )));
        }

        log::info!(
            "voxel grid dimensions x: {} y: {} z: {} ({num_cells} cells, voxel size {voxel_size})",
            dims.x,
            dims.y,
            dims.z
        );

        Ok(Self {
            dims,
            voxel_size,
            bound_min: min,
            requested_max: max,
        })
    }

    /// Returns the number of cells along each axis.
    #[must_use]
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Returns the total number of cells.
    #[must_use]
    pub fn num_cells(&self) -> usize {
        self.dims.x as usize * self.dims.y as usize * self.dims.z as usize
    }

    /// Returns the voxel edge length.
    #[must_use]
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Returns the minimum corner.
    #[must_use]
    pub fn bound_min(&self) -> Vec3 {
        self.bound_min
    }

    /// Returns the maximum corner the grid was requested with.
    #[must_use]
    pub fn requested_max(&self) -> Vec3 {
        self.requested_max
    }

    /// Returns the cell-aligned maximum corner, `min + dims * s`.
    #[must_use]
    pub fn bound_max(&self) -> Vec3 {
        self.bound_min + self.dims.as_vec3() * self.voxel_size
    }

    /// Flattens a cell coordinate to a linear index.
    ///
    /// The coordinate must be inside the grid; use [`Grid::index_of`] for a
    /// checked lookup.
    #[must_use]
    pub fn flatten(&self, x: u32, y: u32, z: u32) -> usize {
        debug_assert!(
            x < self.dims.x && y < self.dims.y && z < self.dims.z,
            "cell ({x}, {y}, {z}) outside grid {}",
            self.dims
        );
        let ny = self.dims.y as usize;
        let nz = self.dims.z as usize;
        x as usize * ny * nz + y as usize * nz + z as usize
    }

    /// Unflattens a linear index to a cell coordinate.
    #[must_use]
    pub fn unflatten(&self, idx: usize) -> UVec3 {
        let ny = self.dims.y as usize;
        let nz = self.dims.z as usize;
        let z = idx % nz;
        let y = (idx / nz) % ny;
        let x = idx / (ny * nz);
        UVec3::new(x as u32, y as u32, z as u32)
    }

    /// Returns whether a signed cell coordinate lies inside the grid.
    #[must_use]
    pub fn contains_cell(&self, cell: IVec3) -> bool {
        cell.cmpge(IVec3::ZERO).all() && cell.as_uvec3().cmplt(self.dims).all()
    }

    /// Flattens a signed cell coordinate, returning `None` outside the grid.
    #[must_use]
    pub fn index_of(&self, cell: IVec3) -> Option<usize> {
        if self.contains_cell(cell) {
            let c = cell.as_uvec3();
            Some(self.flatten(c.x, c.y, c.z))
        } else {
            None
        }
    }

    /// Returns the world-space center of a cell.
    #[must_use]
    pub fn voxel_center(&self, cell: UVec3) -> Vec3 {
        self.bound_min + (cell.as_vec3() + Vec3::splat(0.5)) * self.voxel_size
    }

    /// Returns the cell containing a world-space point, or `None` outside the grid.
    #[must_use]
    pub fn cell_of_point(&self, point: Vec3) -> Option<UVec3> {
        let local = ((point - self.bound_min) / self.voxel_size).floor();
        if !local.is_finite() {
            return None;
        }
        let cell = local.as_ivec3();
        self.contains_cell(cell).then(|| cell.as_uvec3())
    }

    /// Iterates over every cell center in canonical index order.
    pub fn cell_centers(&self) -> impl Iterator<Item = Vec3> + '_ {
        (0..self.num_cells()).map(move |idx| self.voxel_center(self.unflatten(idx)))
    }

    /// Returns the number of workgroups covering the grid for a given workgroup size.
    #[must_use]
    pub fn dispatch_size(&self, workgroup: UVec3) -> UVec3 {
        let wg = workgroup.max(UVec3::ONE);
        (self.dims + wg - UVec3::ONE) / wg
    }
}
