//! The density field and its host/device hand-off.
//!
//! The device copy is authoritative between host sessions. Host access goes
//! through a [`HostView`], which starts with a full readback and ends with a
//! full upload; kernels get a [`DeviceView`]. Both views borrow the field
//! mutably, so host and device access can never overlap.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use glam::{IVec3, Vec3};

use crate::device::DensityDevice;
use crate::error::{Result, SmokeError};
use crate::grid::Grid;
use crate::voxel::VoxelRecord;

/// Counts of full-buffer transfers performed by a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Host-to-device uploads.
    pub uploads: u64,
    /// Device-to-host readbacks.
    pub downloads: u64,
}

/// The live density array, mirrored between host memory and a [`DensityDevice`].
pub struct VoxelField<D: DensityDevice> {
    grid: Grid,
    host: Vec<VoxelRecord>,
    device: D,
    stats: TransferStats,
}

impl<D: DensityDevice> VoxelField<D> {
    /// Creates a zeroed field and uploads it to `device`.
    ///
    /// # Errors
    /// Returns [`SmokeError::SizeMismatch`] if the device buffer does not hold
    /// exactly one record per grid cell, or any error from the initial upload.
    pub fn new(grid: Grid, device: D) -> Result<Self> {
        Self::with_initial_density(grid, device, 0.0)
    }

    /// Creates a field with every cell set to `density` and uploads it.
    ///
    /// # Errors
    /// See [`VoxelField::new`].
    pub fn with_initial_density(grid: Grid, device: D, density: f32) -> Result<Self> {
        if device.len() != grid.num_cells() {
            return Err(SmokeError::SizeMismatch {
                expected: grid.num_cells(),
                actual: device.len(),
            });
        }

        let side = grid.voxel_size();
        let host = grid
            .cell_centers()
            .map(|center| VoxelRecord::new(center, density, side))
            .collect();

        let mut field = Self {
            grid,
            host,
            device,
            stats: TransferStats::default(),
        };
        field.push()?;
        Ok(field)
    }

    /// Returns the grid this field is laid out on.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Returns the transfer counters.
    #[must_use]
    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    /// Pulls the authoritative densities from the device and opens a host session.
    ///
    /// # Errors
    /// Returns any error reported by the device readback.
    ///
    /// # Panics
    /// Panics if the device buffer was resized after construction.
    pub fn read_from_device(&mut self) -> Result<HostView<'_, D>> {
        self.pull()?;
        Ok(HostView {
            field: self,
            dirty: false,
        })
    }

    /// Opens a device session for kernel dispatches.
    pub fn device_view(&mut self) -> DeviceView<'_, D> {
        DeviceView {
            grid: &self.grid,
            device: &mut self.device,
        }
    }

    /// Returns the device without opening a session.
    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Tears the field down, returning the device.
    pub fn into_device(self) -> D {
        self.device
    }

    fn check_device_len(&self) {
        assert_eq!(
            self.device.len(),
            self.host.len(),
            "density device resized after construction"
        );
    }

    fn pull(&mut self) -> Result<()> {
        self.check_device_len();
        self.device.download(&mut self.host)?;
        self.stats.downloads += 1;
        Ok(())
    }

    fn push(&mut self) -> Result<()> {
        self.check_device_len();
        self.device.upload(&self.host)?;
        self.stats.uploads += 1;
        Ok(())
    }
}

/// Host access to a freshly read-back density array.
///
/// Mutations stay on the host until [`HostView::write_to_device`] is called.
/// Dropping a view with pending mutations discards them (the device copy wins)
/// and logs a warning.
pub struct HostView<'a, D: DensityDevice> {
    field: &'a mut VoxelField<D>,
    dirty: bool,
}

impl<D: DensityDevice> HostView<'_, D> {
    /// Returns the grid.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.field.grid
    }

    /// Returns the density of cell `(x, y, z)`, or `0.0` outside the grid.
    #[must_use]
    pub fn density_at(&self, x: i32, y: i32, z: i32) -> f32 {
        self.field
            .grid
            .index_of(IVec3::new(x, y, z))
            .map_or(0.0, |idx| self.field.host[idx].density)
    }

    /// Returns the density at flat index `idx`, or `0.0` out of range.
    #[must_use]
    pub fn density_at_index(&self, idx: usize) -> f32 {
        self.field.host.get(idx).map_or(0.0, |r| r.density)
    }

    /// Returns the density of the cell containing a world-space point, or `0.0` outside.
    #[must_use]
    pub fn density_at_position(&self, point: Vec3) -> f32 {
        self.field
            .grid
            .cell_of_point(point)
            .map_or(0.0, |c| {
                self.field.host[self.field.grid.flatten(c.x, c.y, c.z)].density
            })
    }

    /// Sets the density of cell `(x, y, z)`. Returns false outside the grid.
    pub fn set_density(&mut self, x: i32, y: i32, z: i32, density: f32) -> bool {
        match self.field.grid.index_of(IVec3::new(x, y, z)) {
            Some(idx) => {
                self.field.host[idx].density = density;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Overwrites every density.
    pub fn set_all(&mut self, density: f32) {
        for record in &mut self.field.host {
            record.density = density;
        }
        self.dirty = true;
    }

    /// Zeroes the density at flat index `idx`. Returns the previous density.
    ///
    /// # Panics
    /// Panics if `idx` is out of range.
    pub fn clear_index(&mut self, idx: usize) -> f32 {
        let previous = std::mem::replace(&mut self.field.host[idx].density, 0.0);
        self.dirty = true;
        previous
    }

    /// Iterates over the densities in canonical index order.
    pub fn densities(&self) -> impl Iterator<Item = f32> + '_ {
        self.field.host.iter().map(|r| r.density)
    }

    /// Returns the host records.
    #[must_use]
    pub fn records(&self) -> &[VoxelRecord] {
        &self.field.host
    }

    /// Returns whether the view holds mutations not yet written back.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes the voxel records as a text log.
    ///
    /// # Errors
    /// Returns any I/O error from `out`.
    pub fn write_log(&self, out: &mut impl Write) -> Result<()> {
        crate::voxel::write_voxel_log(&self.field.host, out)?;
        Ok(())
    }

    /// Writes the voxel records as a text log to `path`.
    ///
    /// # Errors
    /// Returns any I/O error from creating or writing the file.
    pub fn write_log_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        self.write_log(&mut out)?;
        out.flush()?;
        log::info!("voxel log written to: {}", path.display());
        Ok(())
    }

    /// Pushes the host array back to the device and ends the session.
    ///
    /// # Errors
    /// Returns any error reported by the device upload; the host mutations are
    /// then lost and the device copy remains authoritative.
    ///
    /// # Panics
    /// Panics if the device buffer was resized after construction.
    pub fn write_to_device(mut self) -> Result<()> {
        self.dirty = false;
        self.field.push()
    }

    /// Ends a read-only session without uploading.
    pub fn discard(mut self) {
        self.dirty = false;
    }
}

impl<D: DensityDevice> Drop for HostView<'_, D> {
    fn drop(&mut self) {
        if self.dirty {
            log::warn!("host view dropped with unsynchronized mutations; device copy kept");
        }
    }
}

/// Device access for kernel dispatches.
pub struct DeviceView<'a, D: DensityDevice> {
    grid: &'a Grid,
    device: &'a mut D,
}

impl<D: DensityDevice> DeviceView<'_, D> {
    /// Returns the grid.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        self.grid
    }

    /// Returns the device.
    #[must_use]
    pub fn device(&self) -> &D {
        self.device
    }

    /// Returns the device for mutation by a kernel.
    pub fn device_mut(&mut self) -> &mut D {
        self.device
    }
}
