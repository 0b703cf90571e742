//! Device-side storage for the density field.
//!
//! A [`DensityDevice`] holds the authoritative copy of the voxel records while
//! kernels run. The host only ever moves the whole buffer at once.

use crate::error::{Result, SmokeError};
use crate::voxel::VoxelRecord;

/// A device buffer holding one [`VoxelRecord`] per grid cell.
pub trait DensityDevice {
    /// Returns the number of voxel records the buffer holds.
    fn len(&self) -> usize;

    /// Returns true if the buffer holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies all host records into the device buffer.
    fn upload(&mut self, records: &[VoxelRecord]) -> Result<()>;

    /// Copies the whole device buffer into `records`.
    fn download(&mut self, records: &mut [VoxelRecord]) -> Result<()>;
}

/// A density device backed by host memory.
///
/// Used for headless runs and tests; kernels written against it operate on
/// [`MemoryDevice::records_mut`] directly.
#[derive(Debug, Clone, Default)]
pub struct MemoryDevice {
    records: Vec<VoxelRecord>,
}

impl MemoryDevice {
    /// Creates a zeroed device buffer with `len` records.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            records: vec![bytemuck::Zeroable::zeroed(); len],
        }
    }

    /// Returns the device-side records.
    #[must_use]
    pub fn records(&self) -> &[VoxelRecord] {
        &self.records
    }

    /// Returns the device-side records for in-place kernel work.
    pub fn records_mut(&mut self) -> &mut [VoxelRecord] {
        &mut self.records
    }

    /// Resizes the buffer, zero-filling new records.
    pub fn resize(&mut self, len: usize) {
        self.records.resize(len, bytemuck::Zeroable::zeroed());
    }
}

impl DensityDevice for MemoryDevice {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn upload(&mut self, records: &[VoxelRecord]) -> Result<()> {
        if records.len() != self.records.len() {
            return Err(SmokeError::SizeMismatch {
                expected: self.records.len(),
                actual: records.len(),
            });
        }
        self.records.copy_from_slice(records);
        Ok(())
    }

    fn download(&mut self, records: &mut [VoxelRecord]) -> Result<()> {
        if records.len() != self.records.len() {
            return Err(SmokeError::SizeMismatch {
                expected: self.records.len(),
                actual: records.len(),
            });
        }
        records.copy_from_slice(&self.records);
        Ok(())
    }
}
