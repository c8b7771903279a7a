/// Plane in Hessian normal form.
///
/// `distance(p) = normal · p + d`. The positive half-space (where the normal
/// points) is the *inside* for every culling volume in this crate.

use glam::{Vec3, Vec4};
use super::aabb::AABB;

/// Which side of a plane a point or box lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Exactly on the plane (points only)
    NoSide,
    /// In front of the plane (normal side)
    Positive,
    /// Behind the plane
    Negative,
    /// Straddles the plane (boxes only)
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Plane with the given normal passing through `point`.
    pub fn from_normal_point(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal,
            d: -normal.dot(point),
        }
    }

    /// Plane through three points, normal = (p1 - p0) × (p2 - p0), normalized.
    pub fn from_points(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        let mut plane = Self::new(Vec3::Z, 0.0);
        plane.redefine(p0, p1, p2);
        plane
    }

    /// Redefine in place from three points (same winding as `from_points`).
    pub fn redefine(&mut self, p0: Vec3, p1: Vec3, p2: Vec3) {
        self.normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        self.d = -self.normal.dot(p0);
    }

    /// Frustum-style `(A, B, C, D)` plane.
    pub fn from_vec4(plane: Vec4) -> Self {
        Self {
            normal: plane.truncate(),
            d: plane.w,
        }
    }

    pub fn to_vec4(&self) -> Vec4 {
        self.normal.extend(self.d)
    }

    /// Same plane, opposite orientation.
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            d: -self.d,
        }
    }

    /// Signed distance (scaled by the normal length).
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    pub fn side_of_point(&self, point: Vec3) -> PlaneSide {
        let distance = self.distance(point);
        if distance < 0.0 {
            PlaneSide::Negative
        } else if distance > 0.0 {
            PlaneSide::Positive
        } else {
            PlaneSide::NoSide
        }
    }

    /// Side of a box given by center and half extent.
    ///
    /// Projects the half extent onto the normal; the box straddles the plane
    /// when the center distance lies within that projected radius.
    pub fn side_of_box(&self, center: Vec3, half_size: Vec3) -> PlaneSide {
        let distance = self.distance(center);
        let max_abs_distance = self.normal.abs().dot(half_size.abs());

        if distance < -max_abs_distance {
            PlaneSide::Negative
        } else if distance > max_abs_distance {
            PlaneSide::Positive
        } else {
            PlaneSide::Both
        }
    }

    /// Side of an AABB. Empty boxes report `NoSide`.
    pub fn side_of_aabb(&self, aabb: &AABB) -> PlaneSide {
        if aabb.is_empty() {
            return PlaneSide::NoSide;
        }
        self.side_of_box(aabb.center(), aabb.half_size())
    }
}

#[cfg(test)]
#[path = "plane_tests.rs"]
mod tests;
