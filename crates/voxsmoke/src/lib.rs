//! voxsmoke: voxel smoke volumes that grow, decay and are carved by shots.
//!
//! A smoke volume is a regular grid of voxels sitting on a floor. Each cell
//! holds a density. A growth kernel raises density around a source point, a
//! periodic clear makes the smoke dissipate, and shots punch holes through it
//! along their path. A compositor raymarches the field over the scene.
//!
//! # Quick Start
//!
//! ```no_run
//! use voxsmoke::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let context = GpuContext::headless().map_err(SmokeError::from)?;
//!     let growth_wgsl = std::fs::read_to_string("smoke_growth.wgsl")?;
//!     let mut smoke = create_gpu_system(
//!         &context,
//!         SmokeConfig::default(),
//!         Vec3::ZERO,
//!         &EmptyScene,
//!         &growth_wgsl,
//!     )?;
//!
//!     let input = FrameInput {
//!         grow_at: Some(Vec3::new(0.0, 1.0, 0.0)),
//!         fire: Some(Ray::new(Vec3::new(-10.0, 1.0, 0.0), Vec3::X)),
//!     };
//!     smoke.tick(1.0 / 60.0, &input, None)?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`voxsmoke_core`] holds the grid, the field and its host/device hand-off,
//!   and the ray carver. It has no GPU dependency.
//! - [`voxsmoke_render`] binds the field to wgpu compute kernels.
//! - [`SmokeSystem`] drives one frame at a time.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod system;

pub use system::{FrameInput, FrameReport, SmokeSystem};

// Re-export core types
pub use voxsmoke_core::{
    intersect_aabb, write_voxel_log, CarveOptions, CarveReport, Compositor, DensityDevice,
    DeviceView, EmptyScene, Grid, GrowthKernel, GrowthParams, HostView, MemoryDevice,
    OccupancyBitmap, OccupancyProbe, RaymarchSettings, Ray, Result, SmokeConfig, SmokeError,
    TransferStats, VoxelField, VoxelRayCarver, VoxelRecord, VoxelTraversal, DEFAULT_PROBE_RADIUS,
    FLOATS_PER_VOXEL, GROWTH_WORKGROUP,
};

// Re-export render types
pub use voxsmoke_render::{
    GpuContext, GpuDensityBuffer, GrowthDispatcher, RaymarchCamera, RaymarchCompositor,
    RenderError,
};

// Re-export glam types for convenience
pub use glam::{IVec3, Mat4, UVec2, UVec3, Vec3, Vec4};

/// A smoke system running on the GPU.
pub type GpuSmokeSystem = SmokeSystem<GpuDensityBuffer, GrowthDispatcher>;

/// Initializes `env_logger` if no logger is installed yet.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Creates a [`GpuSmokeSystem`] whose growth kernel is compiled from `growth_wgsl`.
pub fn create_gpu_system(
    context: &GpuContext,
    config: SmokeConfig,
    anchor: Vec3,
    probe: &dyn OccupancyProbe,
    growth_wgsl: &str,
) -> Result<GpuSmokeSystem> {
    let system = SmokeSystem::new(
        config,
        anchor,
        probe,
        |grid| GpuDensityBuffer::new(context, grid),
        |_, occupancy| GrowthDispatcher::new(context, growth_wgsl, occupancy),
    )?;
    log::info!(
        "voxsmoke GPU system ready on {}",
        context.adapter_info().name
    );
    Ok(system)
}
