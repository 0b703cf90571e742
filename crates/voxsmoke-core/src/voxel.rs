//! Per-cell voxel record shared with density kernels.

use std::io::{self, Write};

use glam::Vec3;

/// Number of packed `f32` scalars per voxel record.
pub const FLOATS_PER_VOXEL: usize = 5;

/// GPU-compatible voxel record.
///
/// Layout is five tightly packed floats: `position.xyz, density, side_length`.
/// Kernels address it as a flat `array<f32>` with a stride of 5.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VoxelRecord {
    /// World-space center of the cell.
    pub position: [f32; 3],
    /// Smoke density, nominally in `[0, 1]` but not clamped.
    pub density: f32,
    /// Edge length of the cell.
    pub side_length: f32,
}

impl VoxelRecord {
    /// Creates a record for a cell centered at `position`.
    #[must_use]
    pub fn new(position: Vec3, density: f32, side_length: f32) -> Self {
        Self {
            position: position.to_array(),
            density,
            side_length,
        }
    }

    /// Returns the cell center.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Writes one line per record, preceded by a header line.
///
/// # Errors
/// Returns any I/O error from `out`.
pub fn write_voxel_log(records: &[VoxelRecord], out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Voxel Buffer Data:")?;
    for (i, r) in records.iter().enumerate() {
        let [x, y, z] = r.position;
        writeln!(
            out,
            "Voxel {i}: Position=({x:.2}, {y:.2}, {z:.2}), Density={}, SideLength={}",
            r.density, r.side_length
        )?;
    }
    Ok(())
}
