//! Rays and ray/box intersection.

use glam::Vec3;

/// A ray, optionally limited to a parametric segment.
///
/// Points along the ray are `origin + t * direction`. `length` is the largest
/// `t` considered part of the segment; it is infinite for an unbounded ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub length: f32,
}

impl Ray {
    /// Creates an unbounded ray. The direction need not be normalized.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            length: f32::INFINITY,
        }
    }

    /// Creates a segment from `from` to `to`, parameterized over `t` in `[0, 1]`.
    #[must_use]
    pub fn segment(from: Vec3, to: Vec3) -> Self {
        Self {
            origin: from,
            direction: to - from,
            length: 1.0,
        }
    }

    /// Returns the point at parameter `t`.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Returns whether the direction can be traversed.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !self.origin.is_finite() || !self.direction.is_finite() || self.direction == Vec3::ZERO
    }
}

/// Intersects the infinite line through `ray` with the box `[min, max]`.
///
/// Returns the parametric interval `(t_min, t_max)` over which the line is
/// inside the box, or `None` if it misses. The interval is not clipped to
/// `t >= 0`: an origin inside the box yields `t_min <= 0 <= t_max`, and a box
/// entirely behind the origin yields `t_max < 0`.
///
/// Axes with a zero direction component are handled explicitly: they impose no
/// constraint when the origin lies within that slab, and reject otherwise.
/// A non-finite origin or direction never intersects.
#[must_use]
pub fn intersect_aabb(ray: &Ray, min: Vec3, max: Vec3) -> Option<(f32, f32)> {
    if !ray.origin.is_finite() || !ray.direction.is_finite() {
        return None;
    }

    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let origin = ray.origin[axis];
        let dir = ray.direction[axis];
        let (lo, hi) = (min[axis], max[axis]);

        if dir == 0.0 {
            if !(lo..=hi).contains(&origin) {
                return None;
            }
            continue;
        }

        let inv = 1.0 / dir;
        let mut t0 = (lo - origin) * inv;
        let mut t1 = (hi - origin) * inv;
        if inv < 0.0 {
            std::mem::swap(&mut t0, &mut t1);
        }

        if t0.is_nan() || t1.is_nan() {
            return None;
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_max < t_min {
            return None;
        }
    }

    if t_min <= t_max {
        Some((t_min, t_max))
    } else {
        None
    }
}
