/// PczCamera — camera data consumed by the zone visibility flood.
///
/// The caller computes the view and projection matrices; the camera only
/// derives what culling needs from them (frustum planes, eye position,
/// view direction) and carries the portal plane stack used while the
/// flood recurses through doorways.
///
/// The scene manager does NOT own cameras. They are created and driven by
/// the caller and lent to `PczSceneManager::find_visible_objects`.

use std::sync::atomic::{AtomicU64, Ordering};
use glam::{Mat4, Vec3};
use crate::bounds::{Sphere, AABB};
use crate::scene::{Portal, PortalKey, PortalKind, ZoneKey};
use super::frustum::{Frustum, FrustumTest};
use super::portal_frustum::{PortalFrustum, ProjectionType, Visibility};

static NEXT_CAMERA_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct PczCamera {
    id: u64,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    projection_type: ProjectionType,
    frustum: Frustum,
    position: Vec3,
    /// Eye position at the last visibility pass
    previous_position: Vec3,
    direction: Vec3,
    portal_frustum: PortalFrustum,
    home_zone: Option<ZoneKey>,
}

impl PczCamera {
    /// Create a camera from caller-computed matrices.
    ///
    /// Each camera gets a process-unique id used to stamp visible zones and objects.
    pub fn new(view: Mat4, projection: Mat4, projection_type: ProjectionType) -> Self {
        let mut camera = Self {
            id: NEXT_CAMERA_ID.fetch_add(1, Ordering::Relaxed),
            view_matrix: view,
            projection_matrix: projection,
            projection_type,
            frustum: Frustum::from_view_projection(&(projection * view)),
            position: Vec3::ZERO,
            previous_position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            portal_frustum: PortalFrustum::new(Vec3::ZERO),
            home_zone: None,
        };
        camera.refresh();
        camera.previous_position = camera.position;
        camera
    }

    /// Right-handed perspective camera at `eye` looking at `target`.
    pub fn perspective(eye: Vec3, target: Vec3, up: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::new(
            Mat4::look_at_rh(eye, target, up),
            Mat4::perspective_rh(fov_y, aspect, near, far),
            ProjectionType::Perspective,
        )
    }

    /// Right-handed orthographic camera at `eye` looking at `target`.
    pub fn orthographic(eye: Vec3, target: Vec3, up: Vec3, half_width: f32, half_height: f32, near: f32, far: f32) -> Self {
        Self::new(
            Mat4::look_at_rh(eye, target, up),
            Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, near, far),
            ProjectionType::Orthographic,
        )
    }

    /// Recompute frustum, eye position, direction and the portal frustum origin.
    fn refresh(&mut self) {
        self.frustum = Frustum::from_view_projection(&(self.projection_matrix * self.view_matrix));

        let world = self.view_matrix.inverse();
        self.position = world.col(3).truncate();
        self.direction = (-world.col(2).truncate()).normalize_or_zero();

        // Behind-the-eye culling only makes sense when the eye is the projection center
        let frustum = &mut self.portal_frustum;
        frustum.set_origin(self.position);
        frustum.set_origin_plane(self.direction, self.position);
        frustum.set_use_origin_plane(self.projection_type == ProjectionType::Perspective);
        frustum.set_projection_type(self.projection_type);
    }

    // ===== GETTERS =====

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Eye position in world space.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Eye position at the last visibility pass, or at creation.
    pub fn previous_position(&self) -> Vec3 {
        self.previous_position
    }

    /// Unit view direction in world space.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn portal_frustum(&self) -> &PortalFrustum {
        &self.portal_frustum
    }

    /// Zone the camera is in, if the caller set one.
    ///
    /// Once set, the scene manager moves it through the portals the eye
    /// crosses between visibility passes.
    pub fn home_zone(&self) -> Option<ZoneKey> {
        self.home_zone
    }

    // ===== SETTERS =====

    pub fn set_view(&mut self, matrix: Mat4) {
        self.view_matrix = matrix;
        self.refresh();
    }

    pub fn set_projection(&mut self, matrix: Mat4, projection_type: ProjectionType) {
        self.projection_matrix = matrix;
        self.projection_type = projection_type;
        self.refresh();
    }

    pub fn set_home_zone(&mut self, zone: Option<ZoneKey>) {
        self.home_zone = zone;
    }

    pub(crate) fn save_previous_position(&mut self) {
        self.previous_position = self.position;
    }

    // ===== VISIBILITY =====

    /// Classify a box against the six frustum planes and the portal planes.
    pub fn visibility(&self, aabb: &AABB) -> Visibility {
        let frustum_test = self.frustum.classify_aabb(aabb);
        if frustum_test == FrustumTest::Outside {
            return Visibility::None;
        }

        match self.portal_frustum.visibility(aabb) {
            Visibility::None => Visibility::None,
            Visibility::Partial => Visibility::Partial,
            Visibility::Full if frustum_test == FrustumTest::Inside => Visibility::Full,
            Visibility::Full => Visibility::Partial,
        }
    }

    pub fn is_aabb_visible(&self, aabb: &AABB) -> bool {
        self.frustum.intersects_aabb(aabb) && self.portal_frustum.is_aabb_visible(aabb)
    }

    pub fn is_sphere_visible(&self, sphere: &Sphere) -> bool {
        self.frustum.intersects_sphere(sphere) && self.portal_frustum.is_sphere_visible(sphere)
    }

    /// Is the portal shape itself visible from this camera?
    pub fn is_portal_visible(&self, key: PortalKey, portal: &Portal) -> bool {
        if !portal.is_open() || self.portal_frustum.contains_portal(key) {
            return false;
        }

        match portal.kind() {
            PortalKind::Aabb => self.is_aabb_visible(&portal.derived_aabb()),
            PortalKind::Sphere => self.is_sphere_visible(&portal.derived_sphere()),
            PortalKind::Quad => {
                let camera_to_portal = portal.derived_center() - self.position;
                if camera_to_portal.dot(portal.derived_direction()) > 0.0 {
                    return false;
                }
                if self.frustum.culls_points(portal.derived_corners()) {
                    return false;
                }
                self.portal_frustum.is_portal_visible(key, portal)
            }
        }
    }

    // ===== PORTAL PLANE STACK =====

    /// Push the culling planes of a traversed portal. Returns the number of planes added.
    pub fn push_portal_planes(&mut self, key: PortalKey, portal: &Portal) -> usize {
        self.portal_frustum.add_portal_planes(key, portal)
    }

    /// Pop the planes pushed for `key`. Returns the number of planes removed.
    pub fn pop_portal_planes(&mut self, key: PortalKey) -> usize {
        self.portal_frustum.remove_portal_planes(key)
    }

    /// Run `f` with the planes of `portal` pushed, popping them afterwards.
    pub fn with_portal_planes<R>(
        &mut self,
        key: PortalKey,
        portal: &Portal,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.push_portal_planes(key, portal);
        let result = f(self);
        self.pop_portal_planes(key);
        result
    }

    /// Number of portals currently pushed.
    pub fn portal_depth(&self) -> usize {
        self.portal_frustum.depth()
    }

    /// Number of extra culling planes currently active.
    pub fn extra_plane_count(&self) -> usize {
        self.portal_frustum.plane_count()
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
