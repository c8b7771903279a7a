/// Portal — directed doorway from a home zone into a target zone.
///
/// A doorway between two zones is modelled as a pair of twin portals, one
/// per side, each pointing at the other. The shape is either a planar quad
/// whose direction points into the home zone, or a box / sphere volume that
/// is crossed by entering it (`VolumeFacing::Entry`) or leaving it
/// (`VolumeFacing::Exit`).
///
/// World-space ("derived") values are recomputed once per frame by
/// `update_derived_values()`. The previous frame's center and plane are kept
/// so a moving portal sweeps a capsule used for crossing detection.

use glam::{Mat4, Vec3};
use slotmap::new_key_type;
use crate::bounds::{BoundingShape, Capsule, Plane, PlaneSide, Ray, Segment, Sphere, AABB};
use super::scene_object::SceneObject;
use super::zone::ZoneKey;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a Portal within a PczSceneManager.
    pub struct PortalKey;
}

/// Which way a box or sphere portal is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFacing {
    /// Crossed when an object center moves inside the volume
    Entry,
    /// Crossed when an object center moves outside the volume
    Exit,
}

impl VolumeFacing {
    /// Entry portals point along +Z, exit portals along -Z.
    pub fn direction(self) -> Vec3 {
        match self {
            VolumeFacing::Entry => Vec3::Z,
            VolumeFacing::Exit => Vec3::NEG_Z,
        }
    }
}

/// Local-space portal geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PortalShape {
    /// Four corners, direction = (c1 - c0) × (c2 - c0)
    Quad([Vec3; 4]),
    Aabb { min: Vec3, max: Vec3, facing: VolumeFacing },
    Sphere { center: Vec3, surface_point: Vec3, facing: VolumeFacing },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalKind {
    Quad,
    Aabb,
    Sphere,
}

/// Object-vs-portal classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalIntersection {
    NoIntersect,
    /// Touches the portal but stays on its front side
    IntersectNoCross,
    /// Touches the portal from its back side
    IntersectBackNoCross,
    /// Went through the portal since the previous update
    IntersectCross,
}

#[derive(Debug, Clone)]
pub struct Portal {
    name: String,
    shape: PortalShape,
    transform: Mat4,
    transform_changed: bool,
    open: bool,

    home_zone: Option<ZoneKey>,
    target_zone: Option<ZoneKey>,
    target_portal: Option<PortalKey>,
    new_home_zone: Option<ZoneKey>,

    derived_corners: [Vec3; 4],
    derived_center: Vec3,
    derived_direction: Vec3,
    derived_radius: f32,
    derived_plane: Plane,
    derived_aabb: AABB,
    prev_derived_center: Vec3,
    prev_derived_plane: Plane,
    derived_initialized: bool,
    moved: bool,
}

impl Portal {
    /// Create a portal. Derived values are computed immediately with an
    /// identity transform.
    pub fn new(name: impl Into<String>, shape: PortalShape) -> Self {
        let mut portal = Self {
            name: name.into(),
            shape,
            transform: Mat4::IDENTITY,
            transform_changed: false,
            open: true,
            home_zone: None,
            target_zone: None,
            target_portal: None,
            new_home_zone: None,
            derived_corners: [Vec3::ZERO; 4],
            derived_center: Vec3::ZERO,
            derived_direction: Vec3::Z,
            derived_radius: 0.0,
            derived_plane: Plane::new(Vec3::Z, 0.0),
            derived_aabb: AABB::EMPTY,
            prev_derived_center: Vec3::ZERO,
            prev_derived_plane: Plane::new(Vec3::Z, 0.0),
            derived_initialized: false,
            moved: false,
        };
        portal.update_derived_values();
        portal
    }

    pub fn quad(name: impl Into<String>, corners: [Vec3; 4]) -> Self {
        Self::new(name, PortalShape::Quad(corners))
    }

    pub fn aabb(name: impl Into<String>, min: Vec3, max: Vec3, facing: VolumeFacing) -> Self {
        Self::new(name, PortalShape::Aabb { min, max, facing })
    }

    pub fn sphere(name: impl Into<String>, center: Vec3, surface_point: Vec3, facing: VolumeFacing) -> Self {
        Self::new(name, PortalShape::Sphere { center, surface_point, facing })
    }

    // ===== GETTERS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &PortalShape {
        &self.shape
    }

    pub fn kind(&self) -> PortalKind {
        match self.shape {
            PortalShape::Quad(_) => PortalKind::Quad,
            PortalShape::Aabb { .. } => PortalKind::Aabb,
            PortalShape::Sphere { .. } => PortalKind::Sphere,
        }
    }

    /// Facing of a volume portal, `None` for quads.
    pub fn facing(&self) -> Option<VolumeFacing> {
        match self.shape {
            PortalShape::Quad(_) => None,
            PortalShape::Aabb { facing, .. } | PortalShape::Sphere { facing, .. } => Some(facing),
        }
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Closed portals never intersect anything and are never visible.
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn home_zone(&self) -> Option<ZoneKey> {
        self.home_zone
    }

    pub fn target_zone(&self) -> Option<ZoneKey> {
        self.target_zone
    }

    /// Twin portal on the other side of the doorway.
    pub fn target_portal(&self) -> Option<PortalKey> {
        self.target_portal
    }

    /// Zone this portal will be moved to at the end of the portal update.
    pub fn new_home_zone(&self) -> Option<ZoneKey> {
        self.new_home_zone
    }

    pub fn derived_corners(&self) -> &[Vec3; 4] {
        &self.derived_corners
    }

    pub fn derived_center(&self) -> Vec3 {
        self.derived_center
    }

    pub fn derived_direction(&self) -> Vec3 {
        self.derived_direction
    }

    pub fn derived_radius(&self) -> f32 {
        self.derived_radius
    }

    pub fn derived_plane(&self) -> &Plane {
        &self.derived_plane
    }

    /// World box of the portal (the quad's corners, the volume box, or the sphere's box).
    pub fn derived_aabb(&self) -> AABB {
        self.derived_aabb
    }

    pub fn derived_sphere(&self) -> Sphere {
        Sphere::new(self.derived_center, self.derived_radius)
    }

    pub fn prev_derived_center(&self) -> Vec3 {
        self.prev_derived_center
    }

    pub fn prev_derived_plane(&self) -> &Plane {
        &self.prev_derived_plane
    }

    /// Swept sphere from the previous to the current center.
    pub fn capsule(&self) -> Capsule {
        Capsule::new(self.prev_derived_center, self.derived_center, self.derived_radius)
    }

    /// Transform changed during the last derived update.
    pub fn moved(&self) -> bool {
        self.moved
    }

    // ===== SETTERS =====

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Attach the portal to a world transform. Takes effect on the next update.
    pub fn set_transform(&mut self, transform: Mat4) {
        if transform != self.transform {
            self.transform = transform;
            self.transform_changed = true;
        }
    }

    pub fn set_target_zone(&mut self, zone: Option<ZoneKey>) {
        self.target_zone = zone;
    }

    pub fn set_target_portal(&mut self, portal: Option<PortalKey>) {
        self.target_portal = portal;
    }

    pub(crate) fn set_home_zone(&mut self, zone: Option<ZoneKey>) {
        self.home_zone = zone;
    }

    pub(crate) fn set_new_home_zone(&mut self, zone: Option<ZoneKey>) {
        self.new_home_zone = zone;
    }

    // ===== DERIVED VALUES =====

    /// Recompute world-space values from the local shape and transform.
    ///
    /// The current center and plane become the previous ones, except on the
    /// very first update where previous = current.
    pub fn update_derived_values(&mut self) {
        let transform = self.transform;
        let (corners, center, direction, radius, aabb) = match self.shape {
            PortalShape::Quad(local) => {
                let corners = local.map(|corner| transform.transform_point3(corner));
                let center = (corners[0] + corners[1] + corners[2] + corners[3]) * 0.25;
                let side1 = local[1] - local[0];
                let side2 = local[2] - local[0];
                let direction = transform.transform_vector3(side1.cross(side2)).normalize_or_zero();
                let radius = corners
                    .iter()
                    .map(|corner| corner.distance(center))
                    .fold(0.0f32, f32::max);
                let aabb = corners
                    .iter()
                    .fold(AABB::EMPTY, |acc, c| acc.merged(&AABB::new(*c, *c)));
                (corners, center, direction, radius, aabb)
            }
            PortalShape::Aabb { min, max, facing } => {
                let aabb = AABB::new(min, max).transformed(&transform);
                let center = aabb.center();
                let radius = aabb.half_size().length();
                (
                    [aabb.min, aabb.max, aabb.min, aabb.max],
                    center,
                    facing.direction(),
                    radius,
                    aabb,
                )
            }
            PortalShape::Sphere { center, surface_point, facing } => {
                let center = transform.transform_point3(center);
                let surface = transform.transform_point3(surface_point);
                let radius = (surface - center).length();
                let aabb = AABB::from_center_half_size(center, Vec3::splat(radius));
                ([center, surface, center, surface], center, facing.direction(), radius, aabb)
            }
        };

        let plane = Plane::from_normal_point(direction, center);

        if self.derived_initialized {
            self.prev_derived_center = self.derived_center;
            self.prev_derived_plane = self.derived_plane;
        } else {
            self.prev_derived_center = center;
            self.prev_derived_plane = plane;
        }

        self.derived_corners = corners;
        self.derived_center = center;
        self.derived_direction = direction;
        self.derived_radius = radius;
        self.derived_plane = plane;
        self.derived_aabb = aabb;

        self.moved = !self.derived_initialized || self.transform_changed;
        self.transform_changed = false;
        self.derived_initialized = true;
    }

    // ===== INTERSECTION =====

    /// Crossing rule of volume portals applied to `point`.
    fn volume_crossed(&self, point: Vec3) -> bool {
        let inside = match self.shape {
            PortalShape::Quad(_) => return false,
            PortalShape::Aabb { .. } => self.derived_aabb.contains_point(point),
            PortalShape::Sphere { .. } => {
                self.derived_center.distance_squared(point) < self.derived_radius * self.derived_radius
            }
        };
        match self.facing() {
            Some(VolumeFacing::Entry) => inside,
            Some(VolumeFacing::Exit) => !inside,
            None => false,
        }
    }

    /// Did a point moving from `previous` to `position` pass through the portal?
    ///
    /// Quads need the motion to reach the portal and end on its back side;
    /// volume portals apply their entry or exit rule to the end point.
    pub fn crossed_by(&self, previous: Vec3, position: Vec3) -> bool {
        if !self.open {
            return false;
        }
        match self.shape {
            PortalShape::Quad(_) => {
                self.capsule().intersects_segment(&Segment::new(previous, position))
                    && self.derived_plane.side_of_point(position) == PlaneSide::Negative
                    && self.prev_derived_plane.side_of_point(previous) != PlaneSide::Negative
            }
            PortalShape::Aabb { .. } | PortalShape::Sphere { .. } => self.volume_crossed(position),
        }
    }

    /// Classify an object's motion since the previous update against this portal.
    pub fn intersects_object(&self, object: &SceneObject) -> PortalIntersection {
        if !self.open {
            return PortalIntersection::NoIntersect;
        }

        let position = object.position();
        let object_aabb = object
            .world_aabb()
            .unwrap_or_else(|| AABB::from_center_half_size(position, Vec3::ZERO));

        match self.shape {
            PortalShape::Quad(_) => {
                if self.crossed_by(object.previous_position(), position)
                    && object_aabb.half_size().x < self.derived_radius
                {
                    return PortalIntersection::IntersectCross;
                }

                if self.derived_sphere().intersects_aabb(&object_aabb)
                    && self.derived_plane.side_of_aabb(&object_aabb) == PlaneSide::Both
                {
                    if self.derived_plane.side_of_point(position) != PlaneSide::Negative {
                        return PortalIntersection::IntersectNoCross;
                    }
                    return PortalIntersection::IntersectBackNoCross;
                }
                PortalIntersection::NoIntersect
            }
            PortalShape::Aabb { .. } => {
                if self.crossed_by(object.previous_position(), position) {
                    return PortalIntersection::IntersectCross;
                }
                // Touching only counts when the object is not fully contained
                if self.derived_aabb.intersects(&object_aabb)
                    && self.derived_aabb.intersection(&object_aabb) != object_aabb
                {
                    return PortalIntersection::IntersectNoCross;
                }
                PortalIntersection::NoIntersect
            }
            PortalShape::Sphere { .. } => {
                if self.crossed_by(object.previous_position(), position) {
                    return PortalIntersection::IntersectCross;
                }
                let sphere = self.derived_sphere();
                if sphere.intersects_aabb(&object_aabb) && !sphere.encloses_aabb(&object_aabb) {
                    return PortalIntersection::IntersectNoCross;
                }
                PortalIntersection::NoIntersect
            }
        }
    }

    /// Does `shape` touch the portal surface? Closed portals touch nothing.
    pub fn intersects_shape(&self, shape: &BoundingShape) -> bool {
        if !self.open {
            return false;
        }

        let sphere = self.derived_sphere();
        match self.shape {
            PortalShape::Quad(_) => match shape {
                BoundingShape::Aabb(aabb) => {
                    sphere.intersects_aabb(aabb)
                        && self.derived_plane.side_of_aabb(aabb) == PlaneSide::Both
                }
                BoundingShape::Sphere(query) => {
                    query.intersects_sphere(&sphere) && query.intersects_plane(&self.derived_plane)
                }
                BoundingShape::Volume(volume) => {
                    volume.intersects_sphere(&sphere) && !volume.culls_points(&self.derived_corners)
                }
                BoundingShape::Ray(ray) => self.ray_hits_quad(ray),
            },
            PortalShape::Aabb { .. } => match shape {
                BoundingShape::Aabb(aabb) => aabb.intersects(&self.derived_aabb),
                BoundingShape::Sphere(query) => query.intersects_aabb(&self.derived_aabb),
                BoundingShape::Volume(volume) => volume.intersects_aabb(&self.derived_aabb),
                BoundingShape::Ray(ray) => ray.intersect_aabb(&self.derived_aabb).is_some(),
            },
            PortalShape::Sphere { .. } => match shape {
                BoundingShape::Aabb(aabb) => sphere.intersects_aabb(aabb),
                BoundingShape::Sphere(query) => sphere.intersects_sphere(query),
                BoundingShape::Volume(volume) => volume.intersects_sphere(&sphere),
                BoundingShape::Ray(ray) => ray.intersects_sphere(&sphere),
            },
        }
    }

    /// Ray from the front side hits the plane inside the quad outline.
    fn ray_hits_quad(&self, ray: &Ray) -> bool {
        if self.derived_plane.side_of_point(ray.origin) == PlaneSide::Negative {
            return false;
        }
        let Some(t) = ray.intersect_plane(&self.derived_plane) else {
            return false;
        };

        let hit = ray.point_at(t);
        let c = &self.derived_corners;
        let reference = (c[2] - c[1]).cross(hit - c[1]);
        [(0, 1), (2, 3), (3, 0)].iter().all(|&(i, j)| {
            (c[j] - c[i]).cross(hit - c[i]).dot(reference) >= 0.0
        })
    }

    /// Did this portal move through `other` since the previous update?
    ///
    /// Assumes this is the smaller portal moving across the bigger `other`.
    pub fn crossed_portal(&self, other: &Portal) -> bool {
        if !other.open || !self.capsule().intersects_capsule(&other.capsule()) {
            return false;
        }

        match other.shape {
            PortalShape::Quad(_) => {
                other.derived_plane.side_of_point(self.derived_center) == PlaneSide::Negative
                    && other.prev_derived_plane.side_of_point(self.prev_derived_center) != PlaneSide::Negative
            }
            _ => other.volume_crossed(self.derived_center),
        }
    }

    /// Is `other` at the same place, ready to be linked as a twin?
    pub fn close_to(&self, other: &Portal) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match self.kind() {
            PortalKind::Quad => {
                let quarter = Sphere::new(self.derived_center, self.derived_radius * 0.25);
                let other_quarter = Sphere::new(other.derived_center, other.derived_radius * 0.25);
                quarter.intersects_sphere(&other_quarter)
            }
            PortalKind::Aabb => {
                self.derived_center == other.derived_center && self.derived_aabb == other.derived_aabb
            }
            PortalKind::Sphere => {
                self.derived_center == other.derived_center && self.derived_radius == other.derived_radius
            }
        }
    }
}

#[cfg(test)]
#[path = "portal_tests.rs"]
mod tests;
