//! Growth and clear dispatch for a user-supplied WGSL kernel.
//!
//! The kernel module must expose two entry points, `grow` and `clear`, with a
//! workgroup size of 8x8x1 and the following bindings in group 0:
//!
//! | binding | resource                                   |
//! |---------|--------------------------------------------|
//! | 0       | voxel records, `array<f32>` (read_write)   |
//! | 1       | [`GrowthUniforms`]                         |
//! | 2       | occupancy flags, `array<u32>` (read)       |

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use voxsmoke_core::{
    DeviceView, Grid, GrowthKernel, GrowthParams, OccupancyBitmap, GROWTH_WORKGROUP,
};

use crate::buffer::{create_storage_buffer, create_uniform_buffer};
use crate::context::GpuContext;
use crate::density_buffer::GpuDensityBuffer;

/// GPU uniforms for the growth kernel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GrowthUniforms {
    /// Cell counts per axis.
    pub group_size: [u32; 3],
    pub growth_speed: f32,
    pub source_position: [f32; 3],
    pub voxel_size: f32,
}

impl GrowthUniforms {
    pub fn from_params(params: &GrowthParams) -> Self {
        Self {
            group_size: params.dims.to_array(),
            growth_speed: params.growth_speed,
            source_position: params.source.to_array(),
            voxel_size: params.voxel_size,
        }
    }

    /// Uniforms for a clear dispatch: grid size only, no growth.
    pub fn for_clear(grid: &Grid) -> Self {
        Self {
            group_size: grid.dims().to_array(),
            growth_speed: 0.0,
            source_position: [0.0; 3],
            voxel_size: grid.voxel_size(),
        }
    }
}

/// Runs the growth and clear entry points of a compute kernel.
pub struct GrowthDispatcher {
    context: GpuContext,
    grow_pipeline: wgpu::ComputePipeline,
    clear_pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    occupancy_buffer: wgpu::Buffer,
}

impl GrowthDispatcher {
    /// Compiles `wgsl_source` and uploads the baked occupancy flags.
    pub fn new(context: &GpuContext, wgsl_source: &str, occupancy: &OccupancyBitmap) -> Self {
        let device = &context.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Smoke Growth Shader"),
            source: wgpu::ShaderSource::Wgsl(wgsl_source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Smoke Growth Bind Group Layout"),
            entries: &[
                // Voxel records
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
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
                            std::mem::size_of::<GrowthUniforms>() as u64
                        ),
                    },
                    count: None,
                },
                // Occupancy
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Smoke Growth Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let create_pipeline = |label: &str, entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };
        let grow_pipeline = create_pipeline("Smoke Grow Pipeline", "grow");
        let clear_pipeline = create_pipeline("Smoke Clear Pipeline", "clear");

        let uniform_buffer = create_uniform_buffer(
            device,
            &GrowthUniforms::zeroed(),
            Some("smoke growth uniforms"),
        );

        // Storage bindings cannot be empty.
        let flags: &[u32] = if occupancy.is_empty() {
            &[0]
        } else {
            occupancy.flags()
        };
        let occupancy_buffer = create_storage_buffer(device, flags, Some("smoke occupancy"));

        Self {
            context: context.clone(),
            grow_pipeline,
            clear_pipeline,
            bind_group_layout,
            uniform_buffer,
            occupancy_buffer,
        }
    }

    fn dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        label: &str,
        density: &GpuDensityBuffer,
        grid: &Grid,
        uniforms: &GrowthUniforms,
    ) {
        let device = &self.context.device;
        let queue = &self.context.queue;

        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Smoke Growth Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: density.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.occupancy_buffer.as_entire_binding(),
                },
            ],
        });

        let groups = grid.dispatch_size(GROWTH_WORKGROUP);
        log::debug!(
            "{label} dispatch: {}x{}x{} workgroups",
            groups.x,
            groups.y,
            groups.z
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(label),
        });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(groups.x, groups.y, groups.z);
        }
        queue.submit(std::iter::once(encoder.finish()));
    }
}

impl GrowthKernel<GpuDensityBuffer> for GrowthDispatcher {
    fn grow(
        &mut self,
        view: &mut DeviceView<'_, GpuDensityBuffer>,
        params: &GrowthParams,
    ) -> voxsmoke_core::Result<()> {
        let uniforms = GrowthUniforms::from_params(params);
        self.dispatch(
            &self.grow_pipeline,
            "smoke grow",
            view.device(),
            view.grid(),
            &uniforms,
        );
        Ok(())
    }

    fn clear(&mut self, view: &mut DeviceView<'_, GpuDensityBuffer>) -> voxsmoke_core::Result<()> {
        let uniforms = GrowthUniforms::for_clear(view.grid());
        self.dispatch(
            &self.clear_pipeline,
            "smoke clear",
            view.device(),
            view.grid(),
            &uniforms,
        );
        Ok(())
    }
}
