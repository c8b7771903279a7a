use glam::Vec3;
use super::aabb::AABB;
use super::plane::Plane;

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }

    pub fn intersects_sphere(&self, other: &Sphere) -> bool {
        let reach = self.radius + other.radius;
        self.center.distance_squared(other.center) <= reach * reach
    }

    /// Closest-point test against a box. Empty boxes never intersect.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_empty() {
            return false;
        }
        let closest = self.center.clamp(aabb.min, aabb.max);
        self.center.distance_squared(closest) <= self.radius * self.radius
    }

    /// True when every corner of the box is strictly inside the sphere.
    pub fn encloses_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_empty() {
            return false;
        }
        let r2 = self.radius * self.radius;
        aabb.corners()
            .iter()
            .all(|corner| self.center.distance_squared(*corner) < r2)
    }

    pub fn intersects_plane(&self, plane: &Plane) -> bool {
        plane.distance(self.center).abs() <= self.radius
    }
}
