/// Axis-aligned bounding box used by the octree, zones and portals.
///
/// An AABB with `min > max` on any axis (or a non-finite corner) is *empty*.
/// Empty boxes never intersect anything and classify as `Outside` against
/// every query shape.

use glam::{Mat4, Vec3};

/// Axis-Aligned Bounding Box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl AABB {
    /// The empty box. Merging anything into it yields that thing.
    pub const EMPTY: AABB = AABB {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of the given half extent around `center`.
    pub fn from_center_half_size(center: Vec3, half_size: Vec3) -> Self {
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    /// True when the box holds no point at all.
    pub fn is_empty(&self) -> bool {
        !(self.min.is_finite() && self.max.is_finite())
            || self.min.x > self.max.x
            || self.min.y > self.max.y
            || self.min.z > self.max.z
    }

    /// Non-empty and strictly positive extent on every axis.
    pub fn has_volume(&self) -> bool {
        !self.is_empty()
            && self.max.x > self.min.x
            && self.max.y > self.min.y
            && self.max.z > self.min.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn half_size(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Volume, 0 for empty boxes.
    pub fn volume(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let size = self.size();
        size.x * size.y * size.z
    }

    /// The 8 corners. Corner `i` takes max on X when bit0 is set, on Y for bit1, on Z for bit2.
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// Transform this local-space AABB by a matrix, returning a new AABB.
    ///
    /// Uses the Arvo method: projects each matrix axis onto the AABB extents
    /// for an exact (tight) result without transforming all 8 corners.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        if self.is_empty() {
            return AABB::EMPTY;
        }

        let translation = matrix.col(3).truncate();
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = matrix.col(i).truncate();
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        AABB { min: new_min, max: new_max }
    }

    /// Smallest box containing both.
    pub fn merged(&self, other: &AABB) -> AABB {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        AABB {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow by `margin` on each side.
    pub fn expanded(&self, margin: Vec3) -> AABB {
        if self.is_empty() {
            return *self;
        }
        AABB {
            min: self.min - margin,
            max: self.max + margin,
        }
    }

    /// Overlap of the two boxes (empty if they are disjoint).
    pub fn intersection(&self, other: &AABB) -> AABB {
        if !self.intersects(other) {
            return AABB::EMPTY;
        }
        AABB {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    /// Test if this AABB fully contains another AABB (boundaries included).
    pub fn contains(&self, other: &AABB) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x <= other.min.x && self.max.x >= other.max.x
        && self.min.y <= other.min.y && self.max.y >= other.max.y
        && self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// Test if a point lies inside or on the boundary.
    pub fn contains_point(&self, point: Vec3) -> bool {
        !self.is_empty()
            && point.x >= self.min.x && point.x <= self.max.x
            && point.y >= self.min.y && point.y <= self.max.y
            && point.z >= self.min.z && point.z <= self.max.z
    }

    /// Test if a point lies strictly inside (boundary excluded).
    pub fn strictly_contains_point(&self, point: Vec3) -> bool {
        !self.is_empty()
            && point.x > self.min.x && point.x < self.max.x
            && point.y > self.min.y && point.y < self.max.y
            && point.z > self.min.z && point.z < self.max.z
    }

    /// Test if this AABB intersects (overlaps) another AABB.
    ///
    /// Returns `true` if the two AABBs overlap or touch.
    pub fn intersects(&self, other: &AABB) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x <= other.max.x && self.max.x >= other.min.x
        && self.min.y <= other.max.y && self.max.y >= other.min.y
        && self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

impl Default for AABB {
    fn default() -> Self {
        AABB::EMPTY
    }
}

#[cfg(test)]
#[path = "aabb_tests.rs"]
mod tests;
