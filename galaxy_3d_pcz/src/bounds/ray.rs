use glam::Vec3;
use super::aabb::AABB;
use super::plane::Plane;
use super::sphere::Sphere;

/// Below this, a direction component is treated as parallel to the slab.
const PARALLEL_EPSILON: f32 = 1e-5;

/// Half-line `origin + t * direction`, `t >= 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test. Returns the entry distance (0 when the origin is inside).
    pub fn intersect_aabb(&self, aabb: &AABB) -> Option<f32> {
        if aabb.is_empty() {
            return None;
        }

        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            let (lo, hi) = (aabb.min[axis], aabb.max[axis]);

            if direction.abs() < PARALLEL_EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / direction;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }

    /// Distance along the ray to the plane, if the ray hits it in front of the origin.
    pub fn intersect_plane(&self, plane: &Plane) -> Option<f32> {
        let denom = plane.normal.dot(self.direction);
        if denom.abs() < f32::EPSILON {
            return None;
        }
        let t = -plane.distance(self.origin) / denom;
        (t >= 0.0).then_some(t)
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let to_center = sphere.center - self.origin;
        let r2 = sphere.radius * sphere.radius;
        if to_center.length_squared() <= r2 {
            return true;
        }
        let length_squared = self.direction.length_squared();
        if length_squared == 0.0 {
            return false;
        }
        let t = to_center.dot(self.direction) / length_squared;
        if t < 0.0 {
            return false;
        }
        self.point_at(t).distance_squared(sphere.center) <= r2
    }
}
