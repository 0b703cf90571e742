//! Density field storage on the GPU.

use voxsmoke_core::{DensityDevice, Grid, VoxelRecord};

use crate::buffer::{create_storage_buffer, read_buffer, update_buffer};
use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};

/// A storage buffer holding one [`VoxelRecord`] per grid cell.
///
/// Bound as `array<f32>` with a stride of five floats by the growth and
/// raymarch kernels.
pub struct GpuDensityBuffer {
    context: GpuContext,
    buffer: wgpu::Buffer,
    len: usize,
}

impl GpuDensityBuffer {
    /// Allocates a zeroed buffer sized for `grid`.
    pub fn new(context: &GpuContext, grid: &Grid) -> Self {
        Self::with_len(context, grid.num_cells())
    }

    /// Allocates a zeroed buffer of `len` records.
    pub fn with_len(context: &GpuContext, len: usize) -> Self {
        let zeroed = vec![VoxelRecord::new(glam::Vec3::ZERO, 0.0, 0.0); len.max(1)];
        let buffer = create_storage_buffer(&context.device, &zeroed, Some("voxel density buffer"));
        log::debug!(
            "allocated density buffer: {len} records ({} bytes)",
            buffer.size()
        );
        Self {
            context: context.clone(),
            buffer,
            len,
        }
    }

    /// Returns the storage buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Returns the context the buffer was created on.
    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    fn check_len(&self, actual: usize) -> RenderResult<()> {
        if actual == self.len {
            Ok(())
        } else {
            Err(RenderError::SizeMismatch {
                expected: self.len,
                actual,
            })
        }
    }
}

impl DensityDevice for GpuDensityBuffer {
    fn len(&self) -> usize {
        self.len
    }

    fn upload(&mut self, records: &[VoxelRecord]) -> voxsmoke_core::Result<()> {
        self.check_len(records.len())?;
        update_buffer(&self.context.queue, &self.buffer, records);
        Ok(())
    }

    fn download(&mut self, records: &mut [VoxelRecord]) -> voxsmoke_core::Result<()> {
        self.check_len(records.len())?;
        read_buffer(
            &self.context.device,
            &self.context.queue,
            &self.buffer,
            records,
        )?;
        Ok(())
    }
}
