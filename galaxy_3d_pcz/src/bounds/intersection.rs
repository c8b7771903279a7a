/// Three-way classification of a box against a query shape.
///
/// Used by the octree range queries:
/// - `Outside` → prune the subtree
/// - `Inside` → accept everything below without further tests
/// - `Intersect` → test objects individually and recurse
///
/// An empty box (or a shape with no extent) is always `Outside`.

use super::aabb::AABB;
use super::plane::PlaneSide;
use super::ray::Ray;
use super::sphere::Sphere;
use super::volume::PlaneBoundedVolume;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// Box and shape are disjoint
    Outside,
    /// Box lies entirely inside the shape
    Inside,
    /// Box and shape partially overlap
    Intersect,
}

/// Query shape accepted by octree and zone range queries
#[derive(Debug, Clone, PartialEq)]
pub enum BoundingShape {
    Aabb(AABB),
    Sphere(Sphere),
    Ray(Ray),
    Volume(PlaneBoundedVolume),
}

impl BoundingShape {
    /// Classify `aabb` against this shape.
    pub fn classify(&self, aabb: &AABB) -> Intersection {
        match self {
            BoundingShape::Aabb(shape) => classify_aabb(shape, aabb),
            BoundingShape::Sphere(shape) => classify_sphere(shape, aabb),
            BoundingShape::Ray(shape) => classify_ray(shape, aabb),
            BoundingShape::Volume(shape) => classify_volume(shape, aabb),
        }
    }

    /// `classify(aabb) != Outside`
    pub fn touches(&self, aabb: &AABB) -> bool {
        self.classify(aabb) != Intersection::Outside
    }
}

impl From<AABB> for BoundingShape {
    fn from(aabb: AABB) -> Self {
        BoundingShape::Aabb(aabb)
    }
}

impl From<Sphere> for BoundingShape {
    fn from(sphere: Sphere) -> Self {
        BoundingShape::Sphere(sphere)
    }
}

impl From<Ray> for BoundingShape {
    fn from(ray: Ray) -> Self {
        BoundingShape::Ray(ray)
    }
}

impl From<PlaneBoundedVolume> for BoundingShape {
    fn from(volume: PlaneBoundedVolume) -> Self {
        BoundingShape::Volume(volume)
    }
}

/// How `aabb` sits relative to the query box `query`.
///
/// `Inside` only when `aabb` is strictly inside `query` on every axis.
pub fn classify_aabb(query: &AABB, aabb: &AABB) -> Intersection {
    if query.is_empty() || aabb.is_empty() || !query.intersects(aabb) {
        return Intersection::Outside;
    }

    let inside = aabb.min.x > query.min.x && aabb.max.x < query.max.x
        && aabb.min.y > query.min.y && aabb.max.y < query.max.y
        && aabb.min.z > query.min.z && aabb.max.z < query.max.z;

    if inside { Intersection::Inside } else { Intersection::Intersect }
}

pub fn classify_sphere(sphere: &Sphere, aabb: &AABB) -> Intersection {
    if aabb.is_empty() || sphere.radius <= 0.0 {
        return Intersection::Outside;
    }
    if sphere.encloses_aabb(aabb) {
        return Intersection::Inside;
    }
    if sphere.intersects_aabb(aabb) {
        Intersection::Intersect
    } else {
        Intersection::Outside
    }
}

/// A ray fully contains nothing, so `Inside` means the origin is strictly inside the box.
pub fn classify_ray(ray: &Ray, aabb: &AABB) -> Intersection {
    if aabb.is_empty() || ray.direction.length_squared() == 0.0 {
        return Intersection::Outside;
    }
    if aabb.strictly_contains_point(ray.origin) {
        return Intersection::Inside;
    }
    match ray.intersect_aabb(aabb) {
        Some(_) => Intersection::Intersect,
        None => Intersection::Outside,
    }
}

/// Per-plane center ± half-size test.
pub fn classify_volume(volume: &PlaneBoundedVolume, aabb: &AABB) -> Intersection {
    if aabb.is_empty() || volume.planes.is_empty() {
        return Intersection::Outside;
    }

    let center = aabb.center();
    let half_size = aabb.half_size();
    let mut all_inside = true;

    for plane in &volume.planes {
        let side = plane.side_of_box(center, half_size);
        if side == volume.outside {
            return Intersection::Outside;
        }
        if side == PlaneSide::Both {
            all_inside = false;
        }
    }

    if all_inside { Intersection::Inside } else { Intersection::Intersect }
}

#[cfg(test)]
#[path = "intersection_tests.rs"]
mod tests;
