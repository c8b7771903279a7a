use glam::Vec3;
use super::aabb::AABB;
use super::plane::{Plane, PlaneSide};
use super::sphere::Sphere;

/// Convex volume bounded by planes.
///
/// A point is inside when it is not on the `outside` side of any plane.
/// The default orientation treats the negative half-space as outside.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneBoundedVolume {
    pub planes: Vec<Plane>,
    pub outside: PlaneSide,
}

impl PlaneBoundedVolume {
    pub fn new(planes: Vec<Plane>) -> Self {
        Self {
            planes,
            outside: PlaneSide::Negative,
        }
    }

    /// Volume from a box: six inward facing planes.
    pub fn from_aabb(aabb: &AABB) -> Self {
        Self::new(vec![
            Plane::from_normal_point(Vec3::X, aabb.min),
            Plane::from_normal_point(Vec3::NEG_X, aabb.max),
            Plane::from_normal_point(Vec3::Y, aabb.min),
            Plane::from_normal_point(Vec3::NEG_Y, aabb.max),
            Plane::from_normal_point(Vec3::Z, aabb.min),
            Plane::from_normal_point(Vec3::NEG_Z, aabb.max),
        ])
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.side_of_point(point) != self.outside)
    }

    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_empty() {
            return false;
        }
        self.planes
            .iter()
            .all(|plane| plane.side_of_aabb(aabb) != self.outside)
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.planes.iter().all(|plane| {
            let mut distance = plane.distance(sphere.center);
            if self.outside == PlaneSide::Negative {
                distance = -distance;
            }
            distance - sphere.radius <= 0.0
        })
    }

    /// Every given point lies on the outside of one single plane.
    pub fn culls_points(&self, points: &[Vec3]) -> bool {
        self.planes.iter().any(|plane| {
            points
                .iter()
                .all(|point| plane.side_of_point(*point) == self.outside)
        })
    }
}
