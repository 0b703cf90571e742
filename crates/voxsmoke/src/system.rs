//! Per-frame orchestration of growth, decay, carving and compositing.

use glam::Vec3;
use voxsmoke_core::{
    CarveOptions, CarveReport, Compositor, DensityDevice, Grid, GrowthKernel, GrowthParams,
    OccupancyBitmap, OccupancyProbe, Ray, Result, SmokeConfig, TransferStats, VoxelField,
    VoxelRayCarver,
};

/// Events delivered to one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// World-space point a grow request resolved to.
    pub grow_at: Option<Vec3>,
    /// A shot to carve through the smoke.
    pub fire: Option<Ray>,
}

/// What happened during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub grew: bool,
    /// A grow request was ignored because smoke is already on screen.
    pub grow_suppressed: bool,
    /// The decay timer fired and the field was cleared.
    pub cleared: bool,
    pub carve: Option<CarveReport>,
    pub composited: bool,
}

/// A smoke volume anchored to a floor.
///
/// Each [`SmokeSystem::tick`] runs at most one growth dispatch, one decay
/// clear, one carve and one composite, in that order.
pub struct SmokeSystem<D: DensityDevice, K: GrowthKernel<D>> {
    config: SmokeConfig,
    occupancy: OccupancyBitmap,
    field: VoxelField<D>,
    kernel: K,
    carver: VoxelRayCarver,
    smoke_source: Vec3,
    smoke_on_screen: bool,
    dissipation_timer: f32,
    frame: u64,
}

impl<D: DensityDevice, K: GrowthKernel<D>> SmokeSystem<D, K> {
    /// Builds the grid above `anchor`, bakes occupancy and creates the field.
    ///
    /// `make_device` allocates a density device for the grid and `make_kernel`
    /// builds the growth kernel once occupancy is known.
    pub fn new<FD, FK>(
        config: SmokeConfig,
        anchor: Vec3,
        probe: &dyn OccupancyProbe,
        make_device: FD,
        make_kernel: FK,
    ) -> Result<Self>
    where
        FD: FnOnce(&Grid) -> D,
        FK: FnOnce(&Grid, &OccupancyBitmap) -> K,
    {
        config.validate()?;
        let grid = Grid::from_anchor(
            anchor,
            config.half_extent_x,
            config.extent_y,
            config.half_extent_z,
            config.voxel_size,
        )?;
        let occupancy = OccupancyBitmap::bake(&grid, probe, config.probe_radius);
        let device = make_device(&grid);
        let kernel = make_kernel(&grid, &occupancy);
        let field = VoxelField::new(grid, device)?;

        let carver = VoxelRayCarver::new(CarveOptions {
            clamp_to_segment: config.clamp_to_segment,
        });
        let smoke_source = anchor + config.source_offset;

        Ok(Self {
            config,
            occupancy,
            field,
            kernel,
            carver,
            smoke_source,
            smoke_on_screen: false,
            dissipation_timer: 0.0,
            frame: 0,
        })
    }

    pub fn config(&self) -> &SmokeConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        self.field.grid()
    }

    pub fn occupancy(&self) -> &OccupancyBitmap {
        &self.occupancy
    }

    pub fn field(&self) -> &VoxelField<D> {
        &self.field
    }

    /// Returns the field for direct host or device sessions.
    pub fn field_mut(&mut self) -> &mut VoxelField<D> {
        &mut self.field
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    pub fn carver(&self) -> &VoxelRayCarver {
        &self.carver
    }

    /// Returns where smoke last grew from (or the configured default).
    pub fn smoke_source(&self) -> Vec3 {
        self.smoke_source
    }

    pub fn smoke_on_screen(&self) -> bool {
        self.smoke_on_screen
    }

    pub fn dissipation_timer(&self) -> f32 {
        self.dissipation_timer
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn transfer_stats(&self) -> TransferStats {
        self.field.stats()
    }

    /// Grows smoke at `point` unless smoke is already on screen and only one
    /// smoke is allowed. Returns whether the grow ran.
    pub fn grow_at(&mut self, point: Vec3) -> Result<bool> {
        if self.smoke_on_screen && !self.config.allow_multiple_smokes {
            log::debug!("grow request at {point} ignored: smoke already on screen");
            return Ok(false);
        }

        let params = GrowthParams::new(self.field.grid(), point, self.config.growth_speed);
        self.kernel.grow(&mut self.field.device_view(), &params)?;
        self.smoke_source = point;
        self.smoke_on_screen = true;
        log::debug!("smoke grown at {point}");
        Ok(true)
    }

    /// Clears the whole field on the device and resets the decay timer.
    pub fn clear(&mut self) -> Result<()> {
        self.kernel.clear(&mut self.field.device_view())?;
        self.dissipation_timer = 0.0;
        self.smoke_on_screen = false;
        Ok(())
    }

    /// Carves `ray` through the field: one readback and one upload when the
    /// path crosses the grid, no transfers when it misses.
    pub fn carve(&mut self, ray: &Ray) -> Result<CarveReport> {
        if self.carver.traverse(self.field.grid(), ray).next().is_none() {
            return Ok(CarveReport::default());
        }

        let mut host = self.field.read_from_device()?;
        let report = self.carver.carve(&mut host, ray);
        host.write_to_device()?;
        Ok(report)
    }

    /// Reads back every density in canonical order.
    pub fn read_densities(&mut self) -> Result<Vec<f32>> {
        let host = self.field.read_from_device()?;
        let densities = host.densities().collect();
        host.discard();
        Ok(densities)
    }

    /// Writes the current device records as a text log.
    pub fn write_voxel_log(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let host = self.field.read_from_device()?;
        host.write_log_file(path)?;
        host.discard();
        Ok(())
    }

    /// Advances one frame by `dt` seconds.
    pub fn tick(
        &mut self,
        dt: f32,
        input: &FrameInput,
        compositor: Option<&mut dyn Compositor<D>>,
    ) -> Result<FrameReport> {
        let mut report = FrameReport::default();
        self.frame += 1;

        if let Some(point) = input.grow_at {
            if self.grow_at(point)? {
                report.grew = true;
            } else {
                report.grow_suppressed = true;
            }
        }

        self.dissipation_timer += dt.max(0.0);
        if self.dissipation_timer >= self.config.dissipation_interval {
            self.clear()?;
            report.cleared = true;
        }

        if let Some(ray) = input.fire {
            report.carve = Some(self.carve(&ray)?);
        }

        if let Some(compositor) = compositor {
            compositor.composite(&self.field.device_view())?;
            report.composited = true;
        }

        Ok(report)
    }
}
