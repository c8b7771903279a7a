/// Line segments and swept spheres.
///
/// Portals and moving objects are modelled as segments from their previous
/// to their current position; a portal sweeps a sphere of its radius along
/// that segment (a capsule).

use glam::Vec3;

const DEGENERATE_EPSILON: f32 = 1e-12;

/// Segment from `origin` to `origin + direction`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Segment {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self {
            origin: start,
            direction: end - start,
        }
    }

    pub fn end(&self) -> Vec3 {
        self.origin + self.direction
    }

    pub fn distance_squared_to_point(&self, point: Vec3) -> f32 {
        let length_squared = self.direction.length_squared();
        if length_squared <= DEGENERATE_EPSILON {
            return self.origin.distance_squared(point);
        }
        let t = ((point - self.origin).dot(self.direction) / length_squared).clamp(0.0, 1.0);
        (self.origin + self.direction * t).distance_squared(point)
    }

    /// Squared distance between the closest points of two segments.
    pub fn distance_squared(&self, other: &Segment) -> f32 {
        let d1 = self.direction;
        let d2 = other.direction;
        let r = self.origin - other.origin;
        let a = d1.length_squared();
        let e = d2.length_squared();
        let f = d2.dot(r);

        if a <= DEGENERATE_EPSILON && e <= DEGENERATE_EPSILON {
            return r.length_squared();
        }

        let (s, t) = if a <= DEGENERATE_EPSILON {
            (0.0, (f / e).clamp(0.0, 1.0))
        } else {
            let c = d1.dot(r);
            if e <= DEGENERATE_EPSILON {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else {
                let b = d1.dot(d2);
                let denom = a * e - b * b;
                // Parallel segments: any s works, start from the origin
                let mut s = if denom > DEGENERATE_EPSILON {
                    ((b * f - c * e) / denom).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let mut t = (b * s + f) / e;
                if t < 0.0 {
                    t = 0.0;
                    s = (-c / a).clamp(0.0, 1.0);
                } else if t > 1.0 {
                    t = 1.0;
                    s = ((b - c) / a).clamp(0.0, 1.0);
                }
                (s, t)
            }
        };

        let closest_self = self.origin + d1 * s;
        let closest_other = other.origin + d2 * t;
        closest_self.distance_squared(closest_other)
    }
}

/// Sphere of `radius` swept along `segment`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub segment: Segment,
    pub radius: f32,
}

impl Capsule {
    pub fn new(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self {
            segment: Segment::new(start, end),
            radius,
        }
    }

    pub fn intersects_segment(&self, segment: &Segment) -> bool {
        self.segment.distance_squared(segment) <= self.radius * self.radius
    }

    pub fn intersects_capsule(&self, other: &Capsule) -> bool {
        let reach = self.radius + other.radius;
        self.segment.distance_squared(&other.segment) <= reach * reach
    }
}
