//! Integration tests for `SmokeSystem` on the in-memory device.
//!
//! The growth kernel and compositor here are test doubles that record their
//! calls and operate on `MemoryDevice` records directly.

use std::cell::RefCell;
use std::rc::Rc;

use voxsmoke::*;

type EventLog = Rc<RefCell<Vec<String>>>;

/// Sets the source cell to full density on grow, zeroes everything on clear.
struct RecordingKernel {
    events: EventLog,
    grown: Vec<GrowthParams>,
}

impl GrowthKernel<MemoryDevice> for RecordingKernel {
    fn grow(&mut self, view: &mut DeviceView<'_, MemoryDevice>, params: &GrowthParams) -> Result<()> {
        self.events.borrow_mut().push("grow".into());
        self.grown.push(*params);
        if let Some(cell) = view.grid().cell_of_point(params.source) {
            let idx = view.grid().flatten(cell.x, cell.y, cell.z);
            view.device_mut().records_mut()[idx].density = 1.0;
        }
        Ok(())
    }

    fn clear(&mut self, view: &mut DeviceView<'_, MemoryDevice>) -> Result<()> {
        self.events.borrow_mut().push("clear".into());
        for record in view.device_mut().records_mut() {
            record.density = 0.0;
        }
        Ok(())
    }
}

/// Records the total device density seen at composite time.
struct RecordingCompositor {
    events: EventLog,
    seen_totals: Vec<f32>,
}

impl Compositor<MemoryDevice> for RecordingCompositor {
    fn composite(&mut self, view: &DeviceView<'_, MemoryDevice>) -> Result<()> {
        self.events.borrow_mut().push("composite".into());
        let total = view.device().records().iter().map(|r| r.density).sum();
        self.seen_totals.push(total);
        Ok(())
    }
}

/// A 4x4x4 grid with unit voxels whose minimum corner is the world origin.
fn unit_config() -> SmokeConfig {
    SmokeConfig {
        voxel_size: 1.0,
        half_extent_x: 2.0,
        extent_y: 4.0,
        half_extent_z: 2.0,
        ..SmokeConfig::default()
    }
}

const ANCHOR: Vec3 = Vec3::new(2.0, 0.0, 2.0);

fn system_with(config: SmokeConfig) -> (SmokeSystem<MemoryDevice, RecordingKernel>, EventLog) {
    let events: EventLog = Rc::default();
    let kernel_events = events.clone();
    let system = SmokeSystem::new(
        config,
        ANCHOR,
        &EmptyScene,
        |grid| MemoryDevice::new(grid.num_cells()),
        move |_, _| RecordingKernel {
            events: kernel_events,
            grown: Vec::new(),
        },
    )
    .unwrap();
    (system, events)
}

fn compositor(events: &EventLog) -> RecordingCompositor {
    RecordingCompositor {
        events: events.clone(),
        seen_totals: Vec::new(),
    }
}

#[test]
fn test_construction() {
    let (system, _) = system_with(unit_config());
    let grid = system.grid();
    assert_eq!(grid.dims(), UVec3::splat(4));
    assert_eq!(grid.bound_min(), Vec3::ZERO);
    assert_eq!(system.occupancy().len(), 64);
    assert_eq!(system.smoke_source(), ANCHOR + Vec3::Y);
    assert!(!system.smoke_on_screen());
    assert_eq!(system.transfer_stats(), TransferStats { uploads: 1, downloads: 0 });
}

#[test]
fn test_invalid_config_rejected() {
    let config = SmokeConfig {
        voxel_size: -1.0,
        ..SmokeConfig::default()
    };
    let result = SmokeSystem::new(
        config,
        Vec3::ZERO,
        &EmptyScene,
        |grid| MemoryDevice::new(grid.num_cells()),
        |_, _| RecordingKernel {
            events: Rc::default(),
            grown: Vec::new(),
        },
    );
    assert!(matches!(result, Err(SmokeError::InvalidArgument(_))));
}

#[test]
fn test_wrong_device_size_rejected() {
    let result = SmokeSystem::new(
        unit_config(),
        ANCHOR,
        &EmptyScene,
        |_| MemoryDevice::new(5),
        |_, _| RecordingKernel {
            events: Rc::default(),
            grown: Vec::new(),
        },
    );
    assert!(matches!(
        result,
        Err(SmokeError::SizeMismatch {
            expected: 64,
            actual: 5
        })
    ));
}

#[test]
fn test_occupancy_baked_from_probe() {
    let probe = |p: Vec3, r: f32| {
        assert_eq!(r, DEFAULT_PROBE_RADIUS);
        p.y < 1.0
    };
    let system = SmokeSystem::new(
        unit_config(),
        ANCHOR,
        &probe,
        |grid| MemoryDevice::new(grid.num_cells()),
        |_, occupancy| {
            assert_eq!(occupancy.num_occupied(), 16);
            RecordingKernel {
                events: Rc::default(),
                grown: Vec::new(),
            }
        },
    )
    .unwrap();
    assert_eq!(system.occupancy().num_occupied(), 16);
}

#[test]
fn test_end_to_end_carve() {
    let (mut system, _) = system_with(unit_config());

    // Seed a non-uniform field so untouched cells are distinguishable.
    {
        let mut host = system.field_mut().read_from_device().unwrap();
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    host.set_density(x, y, z, 0.1 * (x + y + z + 1) as f32);
                }
            }
        }
        host.set_density(2, 2, 2, 1.0);
        host.write_to_device().unwrap();
    }
    let before = system.read_densities().unwrap();
    let stats_before = system.transfer_stats();

    let input = FrameInput {
        grow_at: None,
        fire: Some(Ray::segment(
            Vec3::new(10.0, 2.5, 2.5),
            Vec3::new(-10.0, 2.5, 2.5),
        )),
    };
    let report = system.tick(0.0, &input, None).unwrap();
    let carve = report.carve.unwrap();
    assert_eq!(carve.cells_visited, 4);
    assert_eq!(carve.entry_cell, Some(UVec3::new(3, 2, 2)));

    let stats_after = system.transfer_stats();
    assert_eq!(stats_after.downloads, stats_before.downloads + 1);
    assert_eq!(stats_after.uploads, stats_before.uploads + 1);

    let after = system.read_densities().unwrap();
    let grid = system.grid().clone();
    for (idx, (&b, &a)) in before.iter().zip(&after).enumerate() {
        let cell = grid.unflatten(idx);
        if cell.y == 2 && cell.z == 2 {
            assert_eq!(a, 0.0, "cell {cell} should be carved");
        } else {
            assert_eq!(a, b, "cell {cell} should be untouched");
        }
    }
    assert_eq!(after[grid.flatten(2, 2, 2)], 0.0);
}

#[test]
fn test_clamped_carve_stops_at_segment_end() {
    let config = SmokeConfig {
        clamp_to_segment: true,
        ..unit_config()
    };
    let (mut system, _) = system_with(config);
    {
        let mut host = system.field_mut().read_from_device().unwrap();
        host.set_all(0.5);
        host.write_to_device().unwrap();
    }

    let ray = Ray::segment(Vec3::new(10.0, 2.5, 2.5), Vec3::new(2.5, 2.5, 2.5));
    let report = system.carve(&ray).unwrap();
    assert_eq!(report.cells_visited, 2);

    let densities = system.read_densities().unwrap();
    let grid = system.grid().clone();
    assert_eq!(densities[grid.flatten(3, 2, 2)], 0.0);
    assert_eq!(densities[grid.flatten(2, 2, 2)], 0.0);
    assert_eq!(densities[grid.flatten(1, 2, 2)], 0.5);
    assert_eq!(densities[grid.flatten(0, 2, 2)], 0.5);
}

#[test]
fn test_missed_shot_skips_transfers() {
    let (mut system, _) = system_with(unit_config());
    let stats_before = system.transfer_stats();

    // Passes above the grid.
    let report = system
        .carve(&Ray::new(Vec3::new(-1.0, 10.0, 1.0), Vec3::X))
        .unwrap();
    assert_eq!(report, CarveReport::default());

    // Grid lies behind the origin.
    let report = system
        .carve(&Ray::new(Vec3::new(10.0, 1.5, 1.5), Vec3::X))
        .unwrap();
    assert_eq!(report, CarveReport::default());

    // Segment ends before reaching the grid.
    let mut config = unit_config();
    config.clamp_to_segment = true;
    let (mut clamped, _) = system_with(config);
    let clamped_before = clamped.transfer_stats();
    let report = clamped
        .carve(&Ray::segment(Vec3::new(-5.0, 1.5, 1.5), Vec3::new(-2.0, 1.5, 1.5)))
        .unwrap();
    assert_eq!(report, CarveReport::default());
    assert_eq!(clamped.transfer_stats(), clamped_before);

    // Non-finite shot.
    let report = system.carve(&Ray::new(Vec3::NAN, Vec3::X)).unwrap();
    assert_eq!(report, CarveReport::default());

    assert_eq!(system.transfer_stats(), stats_before);
}

#[test]
fn test_single_smoke_gate() {
    let (mut system, _) = system_with(unit_config());
    let first = Vec3::new(1.5, 0.5, 1.5);
    let second = Vec3::new(3.5, 0.5, 3.5);

    let report = system
        .tick(0.1, &FrameInput { grow_at: Some(first), fire: None }, None)
        .unwrap();
    assert!(report.grew);
    assert!(system.smoke_on_screen());
    assert_eq!(system.smoke_source(), first);

    let report = system
        .tick(0.1, &FrameInput { grow_at: Some(second), fire: None }, None)
        .unwrap();
    assert!(!report.grew);
    assert!(report.grow_suppressed);
    assert_eq!(system.smoke_source(), first);
    assert_eq!(system.kernel().grown.len(), 1);
}

#[test]
fn test_multiple_smokes_allowed() {
    let config = SmokeConfig {
        allow_multiple_smokes: true,
        ..unit_config()
    };
    let (mut system, _) = system_with(config);

    assert!(system.grow_at(Vec3::new(1.5, 0.5, 1.5)).unwrap());
    assert!(system.grow_at(Vec3::new(3.5, 0.5, 3.5)).unwrap());

    let grown = &system.kernel().grown;
    assert_eq!(grown.len(), 2);
    assert_eq!(grown[1].source, Vec3::new(3.5, 0.5, 3.5));
    assert_eq!(grown[1].growth_speed, 10.0);
    assert_eq!(grown[1].dims, UVec3::splat(4));
    assert_eq!(grown[1].voxel_size, 1.0);
}

#[test]
fn test_decay_clears_and_reopens_gate() {
    let (mut system, events) = system_with(unit_config());
    let source = Vec3::new(1.5, 1.5, 1.5);
    system.grow_at(source).unwrap();

    for _ in 0..3 {
        let report = system.tick(0.5, &FrameInput::default(), None).unwrap();
        assert!(!report.cleared);
    }
    assert!(system.smoke_on_screen());

    let report = system.tick(0.5, &FrameInput::default(), None).unwrap();
    assert!(report.cleared);
    assert!(!system.smoke_on_screen());
    assert_eq!(system.dissipation_timer(), 0.0);
    assert!(system.read_densities().unwrap().iter().all(|&d| d == 0.0));
    assert_eq!(*events.borrow(), vec!["grow", "clear"]);

    assert!(system.grow_at(source).unwrap());
}

#[test]
fn test_frame_order() {
    let config = SmokeConfig {
        dissipation_interval: 1.0,
        allow_multiple_smokes: true,
        ..unit_config()
    };
    let (mut system, events) = system_with(config);
    let mut compositor = compositor(&events);

    // Grow, decay, carve and composite all in one frame.
    let input = FrameInput {
        grow_at: Some(Vec3::new(2.5, 2.5, 2.5)),
        fire: Some(Ray::new(Vec3::new(10.0, 2.5, 2.5), -Vec3::X)),
    };
    let report = system.tick(1.0, &input, Some(&mut compositor)).unwrap();

    assert!(report.grew && report.cleared && report.composited);
    assert_eq!(report.carve.map(|c| c.cells_cleared), Some(0));
    assert_eq!(*events.borrow(), vec!["grow", "clear", "composite"]);
    assert_eq!(compositor.seen_totals, vec![0.0]);
}

#[test]
fn test_composite_sees_carved_field() {
    let config = SmokeConfig {
        allow_multiple_smokes: true,
        ..unit_config()
    };
    let (mut system, events) = system_with(config);
    let mut compositor = compositor(&events);

    let grow = |p: Vec3| FrameInput {
        grow_at: Some(p),
        fire: None,
    };
    system
        .tick(0.1, &grow(Vec3::new(2.5, 2.5, 2.5)), Some(&mut compositor))
        .unwrap();
    system
        .tick(0.1, &grow(Vec3::new(0.5, 0.5, 0.5)), Some(&mut compositor))
        .unwrap();

    let shot = FrameInput {
        grow_at: None,
        fire: Some(Ray::new(Vec3::new(-5.0, 2.5, 2.5), Vec3::X)),
    };
    let report = system.tick(0.1, &shot, Some(&mut compositor)).unwrap();
    assert_eq!(report.carve.map(|c| c.cells_cleared), Some(1));
    assert_eq!(compositor.seen_totals, vec![1.0, 2.0, 1.0]);
    assert_eq!(system.frame(), 3);
}

#[test]
fn test_voxel_log_file() {
    let (mut system, _) = system_with(unit_config());
    let path = std::env::temp_dir().join(format!("voxsmoke_log_{}.txt", std::process::id()));
    system.write_voxel_log(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 65);
    assert_eq!(lines[0], "Voxel Buffer Data:");
    assert!(lines[1].starts_with("Voxel 0: Position=(0.50, 0.50, 0.50)"));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_shots_only_zero_cells(
            ox in -8.0f32..12.0,
            oy in -8.0f32..12.0,
            oz in -8.0f32..12.0,
            dx in -1.0f32..1.0,
            dy in -1.0f32..1.0,
            dz in -1.0f32..1.0,
        ) {
            let (mut system, _) = system_with(unit_config());
            {
                let mut host = system.field_mut().read_from_device().unwrap();
                host.set_all(0.25);
                host.write_to_device().unwrap();
            }

            let ray = Ray::new(Vec3::new(ox, oy, oz), Vec3::new(dx, dy, dz));
            let report = system.carve(&ray).unwrap();
            let densities = system.read_densities().unwrap();

            let zeroed = densities.iter().filter(|&&d| d == 0.0).count();
            prop_assert!(densities.iter().all(|&d| d == 0.0 || d == 0.25));
            prop_assert_eq!(zeroed, report.cells_visited);
            prop_assert_eq!(report.cells_cleared, report.cells_visited);
        }
    }
}
