//! wgpu device acquisition.

use pollster::FutureExt;

use crate::error::{RenderError, RenderResult};

/// A wgpu device and queue shared by the smoke backend.
///
/// `wgpu::Device` and `wgpu::Queue` are reference counted, so the context is
/// cheap to clone into each buffer and dispatcher.
#[derive(Clone, Debug)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Wraps an existing device, e.g. one owned by the host renderer.
    pub fn from_parts(
        device: wgpu::Device,
        queue: wgpu::Queue,
        adapter_info: wgpu::AdapterInfo,
    ) -> Self {
        Self {
            device,
            queue,
            adapter_info,
        }
    }

    /// Creates a device without a surface.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("voxsmoke device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let adapter_info = adapter.get_info();
        log::info!(
            "voxsmoke using adapter {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Blocking variant of [`GpuContext::new_headless`].
    pub fn headless() -> RenderResult<Self> {
        Self::new_headless().block_on()
    }

    /// Returns information about the adapter the device was created on.
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }
}
