//! Bounding volumes and intersection classification.
//!
//! Pure value types and functions, no state. Everything is in world space.

mod aabb;
mod intersection;
mod plane;
mod ray;
mod segment;
mod sphere;
mod volume;

pub use aabb::AABB;
pub use intersection::{
    BoundingShape, Intersection,
    classify_aabb, classify_ray, classify_sphere, classify_volume,
};
pub use plane::{Plane, PlaneSide};
pub use ray::Ray;
pub use segment::{Capsule, Segment};
pub use sphere::Sphere;
pub use volume::PlaneBoundedVolume;

#[cfg(test)]
#[path = "bounds_tests.rs"]
mod tests;
