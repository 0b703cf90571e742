//! wgpu backend for voxsmoke.
//!
//! This crate provides:
//! - [`GpuContext`] for headless or shared device acquisition
//! - [`GpuDensityBuffer`], the GPU implementation of `DensityDevice`
//! - [`GrowthDispatcher`] and [`RaymarchCompositor`], which bind the field to
//!   user-supplied WGSL kernels

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::float_cmp)]

pub mod buffer;
pub mod composite;
pub mod context;
pub mod density_buffer;
pub mod error;
pub mod growth;

pub use composite::{
    projection_params, RaymarchCamera, RaymarchCompositor, RaymarchUniforms, RAYMARCH_WORKGROUP,
};
pub use context::GpuContext;
pub use density_buffer::GpuDensityBuffer;
pub use error::{RenderError, RenderResult};
pub use growth::{GrowthDispatcher, GrowthUniforms};
