//! Core of voxsmoke.
//!
//! This crate holds everything that does not depend on a GPU backend:
//! - [`Grid`] geometry and the canonical cell index order
//! - [`OccupancyBitmap`] baked from an injected [`OccupancyProbe`]
//! - [`VoxelField`] with its host/device hand-off ([`HostView`], [`DeviceView`])
//! - [`VoxelRayCarver`] for clearing smoke along a ray
//! - Kernel traits implemented by a backend, plus an in-memory [`MemoryDevice`]

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Grid sizes are bounded by u32 cell counts; casts between index types are intentional
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
// Densities are compared exactly against the cleared value
#![allow(clippy::float_cmp)]

pub mod carve;
pub mod config;
pub mod device;
pub mod error;
pub mod field;
pub mod grid;
pub mod kernel;
pub mod occupancy;
pub mod ray;
pub mod voxel;

pub use carve::{CarveOptions, CarveReport, VoxelRayCarver, VoxelTraversal};
pub use config::{RaymarchSettings, SmokeConfig};
pub use device::{DensityDevice, MemoryDevice};
pub use error::{Result, SmokeError};
pub use field::{DeviceView, HostView, TransferStats, VoxelField};
pub use grid::Grid;
pub use kernel::{Compositor, GrowthKernel, GrowthParams, GROWTH_WORKGROUP};
pub use occupancy::{EmptyScene, OccupancyBitmap, OccupancyProbe, DEFAULT_PROBE_RADIUS};
pub use ray::{intersect_aabb, Ray};
pub use voxel::{write_voxel_log, VoxelRecord, FLOATS_PER_VOXEL};

// Re-export glam types for convenience
pub use glam::{IVec3, Mat4, UVec3, Vec3, Vec4};
