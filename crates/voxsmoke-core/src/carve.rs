//! Clearing smoke along a ray.
//!
//! The carver walks the grid cell by cell with the Amanatides-Woo traversal
//! and zeroes every cell the ray passes through. Traversal and mutation are
//! split: [`VoxelTraversal`] yields the cell path, [`VoxelRayCarver`] applies it
//! to a [`HostView`].

use glam::{IVec3, UVec3, Vec3};

use crate::device::DensityDevice;
use crate::field::HostView;
use crate::grid::Grid;
use crate::ray::{intersect_aabb, Ray};

/// Options controlling how far a carve reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarveOptions {
    /// Stop at the end of the ray's segment instead of the far grid wall.
    pub clamp_to_segment: bool,
}

/// Summary of one carve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarveReport {
    /// Cells on the traversal path.
    pub cells_visited: usize,
    /// Path cells that held nonzero density before the carve.
    pub cells_cleared: usize,
    /// First cell of the path, if the ray entered the grid.
    pub entry_cell: Option<UVec3>,
}

/// Iterator over the cells a ray passes through, in order along the ray.
///
/// Consecutive cells always share a face. When the next boundary is reached
/// on several axes at once, the step is taken along X, then Y, then Z.
#[derive(Debug, Clone)]
pub struct VoxelTraversal {
    dims: IVec3,
    cell: IVec3,
    step: IVec3,
    t_max: Vec3,
    t_delta: Vec3,
    t_limit: f32,
    done: bool,
}

impl VoxelTraversal {
    /// Starts a traversal of `grid` along `ray`.
    ///
    /// The walk begins where the ray enters the cell-aligned grid box (or at the
    /// origin, if it starts inside) and runs to the far wall. With
    /// `clamp_to_segment` it stops at the end of the ray's segment instead.
    /// A ray that misses, or whose box lies behind it, yields nothing.
    ///
    /// The first cell is the floor of the entry point, clamped into the grid.
    /// An entry exactly on the far face (coordinate `N`) starts in cell `N-1`,
    /// and rounding just outside either face lands in the boundary cell rather
    /// than producing an empty path. Non-finite rays yield nothing.
    #[must_use]
    pub fn new(grid: &Grid, ray: &Ray, clamp_to_segment: bool) -> Self {
        let dims = grid.dims().as_ivec3();
        let empty = Self {
            dims,
            cell: IVec3::ZERO,
            step: IVec3::ZERO,
            t_max: Vec3::INFINITY,
            t_delta: Vec3::INFINITY,
            t_limit: f32::INFINITY,
            done: true,
        };

        if ray.is_degenerate() {
            log::warn!(
                "ignoring degenerate ray: origin {} direction {}",
                ray.origin,
                ray.direction
            );
            return empty;
        }

        let min = grid.bound_min();
        let s = grid.voxel_size();
        let Some((t_enter, t_exit)) = intersect_aabb(ray, min, grid.bound_max()) else {
            return empty;
        };
        if t_exit < 0.0 {
            return empty;
        }
        let t_start = t_enter.max(0.0);
        let t_limit = if clamp_to_segment {
            ray.length
        } else {
            f32::INFINITY
        };
        if t_start > t_limit {
            return empty;
        }

        let local = (ray.at(t_start) - min) / s;
        if !local.is_finite() {
            return empty;
        }
        // The entry point lies on the box, so only rounding or the far face
        // can push it out of range.
        let cell = local.floor().as_ivec3().clamp(IVec3::ZERO, dims - IVec3::ONE);

        let mut step = IVec3::ZERO;
        let mut t_max = Vec3::INFINITY;
        let mut t_delta = Vec3::INFINITY;
        for axis in 0..3 {
            let dir = ray.direction[axis];
            if dir == 0.0 {
                continue;
            }
            let (boundary_cell, sign) = if dir > 0.0 {
                (cell[axis] + 1, 1)
            } else {
                (cell[axis], -1)
            };
            let boundary = min[axis] + boundary_cell as f32 * s;
            step[axis] = sign;
            t_max[axis] = (boundary - ray.origin[axis]) / dir;
            t_delta[axis] = s / dir.abs();
        }

        Self {
            dims,
            cell,
            step,
            t_max,
            t_delta,
            t_limit,
            done: false,
        }
    }

    fn next_axis(&self) -> usize {
        let t = self.t_max;
        if t.x <= t.y && t.x <= t.z {
            0
        } else if t.y <= t.z {
            1
        } else {
            2
        }
    }
}

impl Iterator for VoxelTraversal {
    type Item = UVec3;

    fn next(&mut self) -> Option<UVec3> {
        if self.done {
            return None;
        }
        let current = self.cell.as_uvec3();

        let axis = self.next_axis();
        let t = self.t_max[axis];
        if !t.is_finite() || t > self.t_limit {
            self.done = true;
        } else {
            self.cell[axis] += self.step[axis];
            self.t_max[axis] += self.t_delta[axis];
            if self.cell[axis] < 0 || self.cell[axis] >= self.dims[axis] {
                self.done = true;
            }
        }

        Some(current)
    }
}

/// Clears density along rays.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoxelRayCarver {
    options: CarveOptions,
}

impl VoxelRayCarver {
    #[must_use]
    pub fn new(options: CarveOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> CarveOptions {
        self.options
    }

    /// Returns the cell path this carver would clear.
    #[must_use]
    pub fn traverse(&self, grid: &Grid, ray: &Ray) -> VoxelTraversal {
        VoxelTraversal::new(grid, ray, self.options.clamp_to_segment)
    }

    /// Sets the density of every cell on the ray's path to zero.
    ///
    /// Only the host copy changes; the caller writes the view back afterwards.
    /// Carving the same ray again leaves the densities unchanged.
    pub fn carve<D: DensityDevice>(&self, host: &mut HostView<'_, D>, ray: &Ray) -> CarveReport {
        let mut report = CarveReport::default();

        for cell in self.traverse(host.grid(), ray) {
            let idx = host.grid().flatten(cell.x, cell.y, cell.z);
            if host.clear_index(idx) != 0.0 {
                report.cells_cleared += 1;
            }
            if report.entry_cell.is_none() {
                report.entry_cell = Some(cell);
            }
            report.cells_visited += 1;
        }

        log::debug!(
            "carved {} cells ({} held smoke), entry {:?}",
            report.cells_visited,
            report.cells_cleared,
            report.entry_cell
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDevice;
    use crate::field::VoxelField;
    use proptest::prelude::*;

    fn grid_4() -> Grid {
        Grid::from_bounds(Vec3::ZERO, Vec3::splat(4.0), 1.0).unwrap()
    }

    fn filled_field(density: f32) -> VoxelField<MemoryDevice> {
        let grid = grid_4();
        let device = MemoryDevice::new(grid.num_cells());
        VoxelField::with_initial_density(grid, device, density).unwrap()
    }

    fn is_face_adjacent(a: UVec3, b: UVec3) -> bool {
        let d = (a.as_ivec3() - b.as_ivec3()).abs();
        d.x + d.y + d.z == 1
    }

    #[test]
    fn test_axis_aligned_row() {
        let grid = grid_4();
        let ray = Ray::new(Vec3::new(10.0, 2.5, 2.5), -Vec3::X);
        let cells: Vec<UVec3> = VoxelTraversal::new(&grid, &ray, false).collect();
        assert_eq!(
            cells,
            vec![
                UVec3::new(3, 2, 2),
                UVec3::new(2, 2, 2),
                UVec3::new(1, 2, 2),
                UVec3::new(0, 2, 2),
            ]
        );
    }

    #[test]
    fn test_diagonal_path() {
        let grid = grid_4();
        let ray = Ray::new(Vec3::ZERO, Vec3::ONE.normalize());
        let cells: Vec<UVec3> = VoxelTraversal::new(&grid, &ray, false).collect();

        assert!(cells.len() <= 10, "visited {} cells", cells.len());
        assert_eq!(cells.first(), Some(&UVec3::ZERO));
        assert_eq!(cells.last(), Some(&UVec3::splat(3)));
        for pair in cells.windows(2) {
            assert!(is_face_adjacent(pair[0], pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_tie_break_order() {
        let grid = grid_4();
        let ray = Ray::new(Vec3::ZERO, Vec3::ONE);
        let cells: Vec<UVec3> = VoxelTraversal::new(&grid, &ray, false).take(4).collect();
        assert_eq!(
            cells,
            vec![
                UVec3::new(0, 0, 0),
                UVec3::new(1, 0, 0),
                UVec3::new(1, 1, 0),
                UVec3::new(1, 1, 1),
            ]
        );
    }

    #[test]
    fn test_miss_and_behind() {
        let grid = grid_4();
        let miss = Ray::new(Vec3::new(-1.0, 5.0, 1.0), Vec3::X);
        assert_eq!(VoxelTraversal::new(&grid, &miss, false).count(), 0);

        let behind = Ray::new(Vec3::new(6.0, 1.0, 1.0), Vec3::X);
        assert_eq!(VoxelTraversal::new(&grid, &behind, false).count(), 0);

        let degenerate = Ray::new(Vec3::ONE, Vec3::ZERO);
        assert_eq!(VoxelTraversal::new(&grid, &degenerate, false).count(), 0);

        let nan = Ray::new(Vec3::new(f32::NAN, 1.0, 1.0), Vec3::X);
        assert_eq!(VoxelTraversal::new(&grid, &nan, false).count(), 0);
    }

    #[test]
    fn test_entry_on_far_face_starts_in_last_cell() {
        let grid = grid_4();
        let ray = Ray::new(Vec3::new(4.0, 2.5, 2.5), -Vec3::X);
        let cells: Vec<UVec3> = VoxelTraversal::new(&grid, &ray, false).collect();
        assert_eq!(cells.first(), Some(&UVec3::new(3, 2, 2)));
        assert_eq!(cells.len(), 4);
    }

    #[test]
    fn test_origin_inside_starts_at_origin_cell() {
        let grid = grid_4();
        let ray = Ray::new(Vec3::new(1.5, 0.5, 0.5), Vec3::X);
        let cells: Vec<UVec3> = VoxelTraversal::new(&grid, &ray, false).collect();
        assert_eq!(cells, vec![UVec3::new(1, 0, 0), UVec3::new(2, 0, 0), UVec3::new(3, 0, 0)]);
    }

    #[test]
    fn test_clamp_to_segment() {
        let grid = grid_4();
        let ray = Ray::segment(Vec3::new(-1.0, 0.5, 0.5), Vec3::new(1.5, 0.5, 0.5));

        let unclamped = VoxelTraversal::new(&grid, &ray, false).count();
        let clamped: Vec<UVec3> = VoxelTraversal::new(&grid, &ray, true).collect();
        assert_eq!(unclamped, 4);
        assert_eq!(clamped, vec![UVec3::new(0, 0, 0), UVec3::new(1, 0, 0)]);

        let short = Ray::segment(Vec3::new(-3.0, 0.5, 0.5), Vec3::new(-1.0, 0.5, 0.5));
        assert_eq!(VoxelTraversal::new(&grid, &short, true).count(), 0);
        assert_eq!(VoxelTraversal::new(&grid, &short, false).count(), 4);
    }

    #[test]
    fn test_carve_zeroes_path_only() {
        let mut field = filled_field(0.7);
        let carver = VoxelRayCarver::default();
        let ray = Ray::new(Vec3::new(10.0, 2.5, 2.5), -Vec3::X);

        let mut host = field.read_from_device().unwrap();
        let report = carver.carve(&mut host, &ray);
        assert_eq!(report.cells_visited, 4);
        assert_eq!(report.cells_cleared, 4);
        assert_eq!(report.entry_cell, Some(UVec3::new(3, 2, 2)));

        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    let expected = if y == 2 && z == 2 { 0.0 } else { 0.7 };
                    assert_eq!(host.density_at(x, y, z), expected, "({x}, {y}, {z})");
                }
            }
        }
        host.write_to_device().unwrap();
    }

    #[test]
    fn test_carve_is_idempotent() {
        let mut field = filled_field(1.0);
        let carver = VoxelRayCarver::default();
        let ray = Ray::new(Vec3::new(-1.0, 0.2, 3.1), Vec3::new(1.0, 0.6, -0.4));

        let mut host = field.read_from_device().unwrap();
        let first = carver.carve(&mut host, &ray);
        let after_first: Vec<f32> = host.densities().collect();
        let second = carver.carve(&mut host, &ray);
        let after_second: Vec<f32> = host.densities().collect();
        host.discard();

        assert!(first.cells_cleared > 0);
        assert_eq!(second.cells_visited, first.cells_visited);
        assert_eq!(second.cells_cleared, 0);
        assert_eq!(after_first, after_second);
    }

    proptest! {
        #[test]
        fn prop_traversal_is_face_connected(
            ox in -6.0f32..10.0,
            oy in -6.0f32..10.0,
            oz in -6.0f32..10.0,
            dx in -1.0f32..1.0,
            dy in -1.0f32..1.0,
            dz in -1.0f32..1.0,
        ) {
            let grid = grid_4();
            let ray = Ray::new(Vec3::new(ox, oy, oz), Vec3::new(dx, dy, dz));
            let cells: Vec<UVec3> = VoxelTraversal::new(&grid, &ray, false).collect();

            prop_assert!(cells.len() <= 10);
            for c in &cells {
                prop_assert!(c.cmplt(grid.dims()).all());
            }
            for pair in cells.windows(2) {
                prop_assert!(is_face_adjacent(pair[0], pair[1]));
            }
        }

        #[test]
        fn prop_carve_idempotent(
            ox in -6.0f32..10.0,
            oy in -6.0f32..10.0,
            oz in -6.0f32..10.0,
            dx in -1.0f32..1.0,
            dy in -1.0f32..1.0,
            dz in -1.0f32..1.0,
        ) {
            let mut field = filled_field(0.5);
            let carver = VoxelRayCarver::default();
            let ray = Ray::new(Vec3::new(ox, oy, oz), Vec3::new(dx, dy, dz));

            let mut host = field.read_from_device().unwrap();
            let first = carver.carve(&mut host, &ray);
            let once: Vec<f32> = host.densities().collect();
            carver.carve(&mut host, &ray);
            let twice: Vec<f32> = host.densities().collect();
            host.discard();

            prop_assert_eq!(once.iter().filter(|&&d| d == 0.0).count(), first.cells_visited);
            prop_assert_eq!(once, twice);
        }
    }
}
