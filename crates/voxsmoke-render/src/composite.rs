//! Raymarch compositing for a user-supplied WGSL kernel.
//!
//! The kernel module must expose a `raymarch` entry point with a workgroup
//! size of 8x8x1 and the following bindings in group 0:
//!
//! | binding | resource                                        |
//! |---------|-------------------------------------------------|
//! | 0       | voxel records, `array<f32>` (read)              |
//! | 1       | [`RaymarchUniforms`]                            |
//! | 2       | scene depth, `texture_depth_2d`                 |
//! | 3       | output, `texture_storage_2d<rgba32float, write>` |

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, UVec2, Vec3};
use voxsmoke_core::{Compositor, DeviceView, Grid, RaymarchSettings};

use crate::buffer::create_uniform_buffer;
use crate::context::GpuContext;
use crate::density_buffer::GpuDensityBuffer;
use crate::error::RenderError;

/// Workgroup size of the raymarch kernel.
pub const RAYMARCH_WORKGROUP: UVec2 = UVec2::new(8, 8);

/// Returns `(near, far, far / (far - near), -far * near / (far - near))`.
///
/// The last two terms linearize a `[0, 1]` depth sample `d` as
/// `w / (d - z)` where `(z, w)` are the third and fourth components.
pub fn projection_params(near: f32, far: f32) -> [f32; 4] {
    let range = far - near;
    [near, far, far / range, -far * near / range]
}

/// Camera state the compositor marches from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaymarchCamera {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Default for RaymarchCamera {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// GPU uniforms for the raymarch kernel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct RaymarchUniforms {
    pub inv_view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub inv_projection: [[f32; 4]; 4],
    pub smoke_color: [f32; 4],
    pub projection_params: [f32; 4],
    pub camera_position: [f32; 3],
    pub step_size: f32,
    pub grid_min: [f32; 3],
    pub voxel_size: f32,
    pub grid_size: [u32; 3],
    pub max_steps: u32,
    pub output_size: [u32; 2],
    pub density_falloff: f32,
    pub _padding: f32,
}

impl RaymarchUniforms {
    pub fn new(
        camera: &RaymarchCamera,
        settings: &RaymarchSettings,
        grid: &Grid,
        output_size: UVec2,
    ) -> Self {
        let view_proj = camera.projection * camera.view;
        Self {
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            view: camera.view.to_cols_array_2d(),
            projection: camera.projection.to_cols_array_2d(),
            inv_projection: camera.projection.inverse().to_cols_array_2d(),
            smoke_color: settings.smoke_color.to_array(),
            projection_params: projection_params(camera.near, camera.far),
            camera_position: camera.position.to_array(),
            step_size: settings.step_size,
            grid_min: grid.bound_min().to_array(),
            voxel_size: grid.voxel_size(),
            grid_size: grid.dims().to_array(),
            max_steps: settings.max_steps,
            output_size: output_size.to_array(),
            density_falloff: settings.density_falloff,
            _padding: 0.0,
        }
    }
}

struct RaymarchTargets {
    depth_view: wgpu::TextureView,
    output_view: wgpu::TextureView,
    size: UVec2,
}

/// Raymarches the density buffer over the scene depth into an output texture.
pub struct RaymarchCompositor {
    context: GpuContext,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    settings: RaymarchSettings,
    camera: RaymarchCamera,
    targets: Option<RaymarchTargets>,
}

impl RaymarchCompositor {
    /// Compiles `wgsl_source`.
    pub fn new(context: &GpuContext, wgsl_source: &str, settings: RaymarchSettings) -> Self {
        let device = &context.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Smoke Raymarch Shader"),
            source: wgpu::ShaderSource::Wgsl(wgsl_source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Smoke Raymarch Bind Group Layout"),
            entries: &[
                // Voxel records
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<RaymarchUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
                // Scene depth
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Output
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba32Float,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Smoke Raymarch Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Smoke Raymarch Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("raymarch"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let uniform_buffer = create_uniform_buffer(
            device,
            &RaymarchUniforms::zeroed(),
            Some("smoke raymarch uniforms"),
        );

        Self {
            context: context.clone(),
            pipeline,
            bind_group_layout,
            uniform_buffer,
            settings,
            camera: RaymarchCamera::default(),
            targets: None,
        }
    }

    pub fn settings(&self) -> &RaymarchSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: RaymarchSettings) {
        self.settings = settings;
    }

    pub fn camera(&self) -> &RaymarchCamera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: RaymarchCamera) {
        self.camera = camera;
    }

    /// Sets the scene depth input and the `Rgba32Float` output, both `size` pixels.
    pub fn set_targets(
        &mut self,
        depth_view: wgpu::TextureView,
        output_view: wgpu::TextureView,
        size: UVec2,
    ) {
        self.targets = Some(RaymarchTargets {
            depth_view,
            output_view,
            size,
        });
    }
}

impl Compositor<GpuDensityBuffer> for RaymarchCompositor {
    fn composite(&mut self, view: &DeviceView<'_, GpuDensityBuffer>) -> voxsmoke_core::Result<()> {
        let targets = self
            .targets
            .as_ref()
            .ok_or(RenderError::MissingTarget("raymarch depth/output"))?;
        let device = &self.context.device;
        let queue = &self.context.queue;

        let uniforms = RaymarchUniforms::new(&self.camera, &self.settings, view.grid(), targets.size);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Smoke Raymarch Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: view.device().buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&targets.depth_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&targets.output_view),
                },
            ],
        });

        let groups = (targets.size + RAYMARCH_WORKGROUP - UVec2::ONE) / RAYMARCH_WORKGROUP;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("smoke raymarch encoder"),
        });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Smoke Raymarch Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(groups.x, groups.y, 1);
        }
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
