/// PortalFrustum — stack of extra culling planes contributed by portals.
///
/// While the visibility (or light) flood walks through a portal, the portal
/// adds planes that narrow every later test to the region seen through the
/// doorway. Each plane remembers which portal added it so the planes can be
/// removed again when the recursion returns.
///
/// Every portal pushed on the current path is remembered, even when it adds
/// no plane, and is never visible again until it is popped. This is what
/// stops cyclic portal graphs from recursing forever.

use glam::Vec3;
use crate::bounds::{Plane, PlaneSide, Sphere, AABB};
use crate::scene::{Portal, PortalKey, PortalKind};

/// Camera projection, decides how portal edge planes are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    Perspective,
    Orthographic,
}

/// Visibility of a box against a camera and its portal planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Completely culled
    None,
    /// Straddles at least one plane
    Partial,
    /// Inside every plane
    Full,
}

#[derive(Debug, Clone, Copy)]
struct CullingPlane {
    plane: Plane,
    portal: PortalKey,
}

#[derive(Debug, Clone)]
pub struct PortalFrustum {
    origin: Vec3,
    origin_plane: Plane,
    use_origin_plane: bool,
    projection_type: ProjectionType,
    culling_planes: Vec<CullingPlane>,
    portal_path: Vec<PortalKey>,
}

impl PortalFrustum {
    /// Frustum at `origin` with no culling planes and no origin plane.
    pub fn new(origin: Vec3) -> Self {
        Self {
            origin,
            origin_plane: Plane::from_normal_point(Vec3::NEG_Z, origin),
            use_origin_plane: false,
            projection_type: ProjectionType::Perspective,
            culling_planes: Vec::new(),
            portal_path: Vec::new(),
        }
    }

    // ===== ORIGIN =====

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    pub fn origin_plane(&self) -> &Plane {
        &self.origin_plane
    }

    /// Plane through `point` facing `normal`; everything behind it is culled when enabled.
    pub fn set_origin_plane(&mut self, normal: Vec3, point: Vec3) {
        self.origin_plane = Plane::from_normal_point(normal, point);
    }

    pub fn uses_origin_plane(&self) -> bool {
        self.use_origin_plane
    }

    pub fn set_use_origin_plane(&mut self, enabled: bool) {
        self.use_origin_plane = enabled;
    }

    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.projection_type = projection_type;
    }

    // ===== STACK STATE =====

    /// Number of active culling planes.
    pub fn plane_count(&self) -> usize {
        self.culling_planes.len()
    }

    /// Number of portals pushed on the current path.
    pub fn depth(&self) -> usize {
        self.portal_path.len()
    }

    /// True while `portal` is pushed on the current path.
    pub fn contains_portal(&self, portal: PortalKey) -> bool {
        self.portal_path.contains(&portal)
    }

    /// Drop every plane and every pushed portal.
    pub fn clear(&mut self) {
        self.culling_planes.clear();
        self.portal_path.clear();
    }

    fn active_planes(&self) -> impl Iterator<Item = &Plane> {
        let origin = self.use_origin_plane.then_some(&self.origin_plane);
        origin.into_iter().chain(self.culling_planes.iter().map(|entry| &entry.plane))
    }

    // ===== VISIBILITY TESTS =====

    /// Classify a box against the origin plane and every culling plane.
    ///
    /// With no culling planes the frustum does not restrict anything.
    pub fn visibility(&self, aabb: &AABB) -> Visibility {
        if aabb.is_empty() {
            return Visibility::None;
        }
        if self.culling_planes.is_empty() {
            return Visibility::Full;
        }

        let center = aabb.center();
        let half_size = aabb.half_size();
        let mut all_inside = true;

        for plane in self.active_planes() {
            match plane.side_of_box(center, half_size) {
                PlaneSide::Negative => return Visibility::None,
                PlaneSide::Both => all_inside = false,
                _ => {}
            }
        }

        if all_inside { Visibility::Full } else { Visibility::Partial }
    }

    pub fn is_aabb_visible(&self, aabb: &AABB) -> bool {
        self.visibility(aabb) != Visibility::None
    }

    pub fn is_sphere_visible(&self, sphere: &Sphere) -> bool {
        if self.culling_planes.is_empty() {
            return true;
        }
        self.active_planes()
            .all(|plane| plane.distance(sphere.center) >= -sphere.radius)
    }

    /// Can `portal` be seen through the planes accumulated so far?
    ///
    /// Closed portals and portals already on the current path are never visible.
    pub fn is_portal_visible(&self, key: PortalKey, portal: &Portal) -> bool {
        if !portal.is_open() || self.contains_portal(key) {
            return false;
        }
        if self.culling_planes.is_empty() {
            return true;
        }

        match portal.kind() {
            PortalKind::Aabb => self.is_aabb_visible(&portal.derived_aabb()),
            PortalKind::Sphere => self.is_sphere_visible(&portal.derived_sphere()),
            PortalKind::Quad => {
                // Quads facing away from the origin are seen from behind
                let origin_to_portal = portal.derived_center() - self.origin;
                if origin_to_portal.dot(portal.derived_direction()) > 0.0 {
                    return false;
                }

                let corners = portal.derived_corners();
                self.active_planes().all(|plane| {
                    corners
                        .iter()
                        .any(|corner| plane.side_of_point(*corner) != PlaneSide::Negative)
                })
            }
        }
    }

    // ===== PLANE STACK =====

    /// Push the culling planes of `portal`. Returns the number of planes added.
    ///
    /// Volume portals add a copy of the origin plane when it is in use. Quad portals add one
    /// plane per edge that is not hidden behind an existing plane, plus the
    /// portal plane itself when any edge plane was added.
    pub fn add_portal_planes(&mut self, key: PortalKey, portal: &Portal) -> usize {
        self.portal_path.push(key);

        if portal.kind() != PortalKind::Quad {
            if !self.use_origin_plane {
                return 0;
            }
            self.culling_planes.push(CullingPlane {
                plane: self.origin_plane,
                portal: key,
            });
            return 1;
        }

        let corners = *portal.derived_corners();
        let mut edge_planes = Vec::with_capacity(4);

        for i in 0..4 {
            let j = (i + 1) % 4;

            let hidden = self.culling_planes.iter().any(|entry| {
                entry.plane.side_of_point(corners[i]) == PlaneSide::Negative
                    && entry.plane.side_of_point(corners[j]) == PlaneSide::Negative
            });
            if hidden {
                continue;
            }

            let apex = match self.projection_type {
                ProjectionType::Perspective => self.origin,
                // Parallel projection: virtual apex one unit behind the edge
                ProjectionType::Orthographic => corners[j] - self.origin_plane.normal,
            };
            edge_planes.push(Plane::from_points(apex, corners[j], corners[i]));
        }

        if edge_planes.is_empty() {
            return 0;
        }

        edge_planes.push(Plane::from_points(corners[2], corners[1], corners[0]));
        let added = edge_planes.len();
        self.culling_planes.extend(
            edge_planes
                .into_iter()
                .map(|plane| CullingPlane { plane, portal: key }),
        );
        added
    }

    /// Remove every plane added by `portal` and pop it from the path.
    /// Returns the number of planes removed.
    pub fn remove_portal_planes(&mut self, key: PortalKey) -> usize {
        let before = self.culling_planes.len();
        self.culling_planes.retain(|entry| entry.portal != key);

        if let Some(index) = self.portal_path.iter().rposition(|pushed| *pushed == key) {
            self.portal_path.remove(index);
        }

        before - self.culling_planes.len()
    }
}

#[cfg(test)]
#[path = "portal_frustum_tests.rs"]
mod tests;
