//! Device-side collaborators: growth/decay kernels and the compositor.
//!
//! These run against the device copy of the field through a [`DeviceView`];
//! they never see host memory.

use glam::{UVec3, Vec3};

use crate::device::DensityDevice;
use crate::error::Result;
use crate::field::DeviceView;
use crate::grid::Grid;

/// Workgroup size of the growth and clear kernels.
pub const GROWTH_WORKGROUP: UVec3 = UVec3::new(8, 8, 1);

/// Inputs to one growth dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthParams {
    /// World-space point smoke grows from.
    pub source: Vec3,
    /// Growth rate passed through to the kernel.
    pub growth_speed: f32,
    /// Cell counts per axis.
    pub dims: UVec3,
    /// Voxel edge length.
    pub voxel_size: f32,
}

impl GrowthParams {
    #[must_use]
    pub fn new(grid: &Grid, source: Vec3, growth_speed: f32) -> Self {
        Self {
            source,
            growth_speed,
            dims: grid.dims(),
            voxel_size: grid.voxel_size(),
        }
    }
}

/// Raises density around a source and clears the whole field.
///
/// Implementations must cover every cell of the grid in a `clear`, leaving
/// the device in the same state as a host-side `set_all(0.0)` upload.
pub trait GrowthKernel<D: DensityDevice> {
    /// Raises density in a neighborhood of `params.source`.
    fn grow(&mut self, view: &mut DeviceView<'_, D>, params: &GrowthParams) -> Result<()>;

    /// Sets every density to zero.
    fn clear(&mut self, view: &mut DeviceView<'_, D>) -> Result<()>;
}

/// Renders the device field into the final frame.
pub trait Compositor<D: DensityDevice> {
    /// Raymarches the current device field and blends it over the scene.
    fn composite(&mut self, view: &DeviceView<'_, D>) -> Result<()>;
}
