/// SceneObject — a movable object indexed by the zone octrees.
///
/// The caller sets the world matrix and attaches local-space bounds; the
/// scene manager maintains the zone membership (home zone, visiting zones)
/// and the per-frame visibility stamp.

use bitflags::bitflags;
use glam::{Mat4, Vec3};
use slotmap::new_key_type;
use crate::bounds::AABB;
use super::zone::ZoneKey;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a SceneObject within a PczSceneManager.
    ///
    /// Keys remain valid even after other objects are removed.
    pub struct ObjectKey;
}

bitflags! {
    /// Per-object behaviour switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectFlags: u32 {
        /// Updated by the scene manager each frame
        const ENABLED = 1 << 0;
        /// Can be returned by the visibility flood
        const VISIBLE = 1 << 1;
        /// May be registered as a visitor in neighbouring zones
        const ALLOW_TO_VISIT = 1 << 2;
        /// Never leaves its home zone (zone enclosures, skies)
        const ANCHORED = 1 << 3;
    }
}

impl Default for ObjectFlags {
    fn default() -> Self {
        ObjectFlags::ENABLED | ObjectFlags::VISIBLE | ObjectFlags::ALLOW_TO_VISIT
    }
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    name: String,
    local_bounds: Vec<AABB>,
    world_matrix: Mat4,
    world_aabb: Option<AABB>,
    position: Vec3,
    previous_position: Vec3,
    home_zone: Option<ZoneKey>,
    visiting_zones: Vec<ZoneKey>,
    flags: ObjectFlags,
    last_visible_frame: u64,
    last_visible_from_camera: Option<u64>,
}

impl SceneObject {
    /// Object at the origin with no bounds attached yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_bounds: Vec::new(),
            world_matrix: Mat4::IDENTITY,
            world_aabb: None,
            position: Vec3::ZERO,
            previous_position: Vec3::ZERO,
            home_zone: None,
            visiting_zones: Vec::new(),
            flags: ObjectFlags::default(),
            last_visible_frame: 0,
            last_visible_from_camera: None,
        }
    }

    /// Object placed at `position` with one local-space box attached.
    pub fn with_bounds(name: impl Into<String>, local_bounds: AABB, position: Vec3) -> Self {
        let mut object = Self::new(name);
        object.attach_bounds(local_bounds);
        object.set_world_matrix(Mat4::from_translation(position));
        object.previous_position = position;
        object
    }

    fn recompute_world_aabb(&mut self) {
        let merged = self
            .local_bounds
            .iter()
            .fold(AABB::EMPTY, |acc, local| acc.merged(&local.transformed(&self.world_matrix)));
        self.world_aabb = (!merged.is_empty()).then_some(merged);
    }

    // ===== GETTERS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// World bounds merged from every attached box, `None` without bounds.
    pub fn world_aabb(&self) -> Option<AABB> {
        self.world_aabb
    }

    pub fn local_bounds(&self) -> &[AABB] {
        &self.local_bounds
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Position at the end of the previous scene update.
    pub fn previous_position(&self) -> Vec3 {
        self.previous_position
    }

    pub fn home_zone(&self) -> Option<ZoneKey> {
        self.home_zone
    }

    pub fn visiting_zones(&self) -> &[ZoneKey] {
        &self.visiting_zones
    }

    pub fn is_visiting(&self, zone: ZoneKey) -> bool {
        self.visiting_zones.contains(&zone)
    }

    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(ObjectFlags::ENABLED)
    }

    pub fn is_visible(&self) -> bool {
        self.flags.contains(ObjectFlags::VISIBLE)
    }

    pub fn allows_visiting(&self) -> bool {
        self.flags.contains(ObjectFlags::ALLOW_TO_VISIT)
    }

    pub fn is_anchored(&self) -> bool {
        self.flags.contains(ObjectFlags::ANCHORED)
    }

    pub fn last_visible_frame(&self) -> u64 {
        self.last_visible_frame
    }

    pub fn last_visible_from_camera(&self) -> Option<u64> {
        self.last_visible_from_camera
    }

    /// Already accepted by this camera during this frame?
    pub fn was_visible_in(&self, frame: u64, camera_id: u64) -> bool {
        self.last_visible_frame == frame && self.last_visible_from_camera == Some(camera_id)
    }

    // ===== SETTERS =====

    pub fn set_world_matrix(&mut self, matrix: Mat4) {
        self.world_matrix = matrix;
        self.position = matrix.col(3).truncate();
        self.recompute_world_aabb();
    }

    /// Move to `position`, keeping rotation and scale.
    pub fn set_position(&mut self, position: Vec3) {
        let mut matrix = self.world_matrix;
        matrix.w_axis = position.extend(1.0);
        self.set_world_matrix(matrix);
    }

    /// Attach one more local-space box.
    pub fn attach_bounds(&mut self, local_bounds: AABB) {
        self.local_bounds.push(local_bounds);
        self.recompute_world_aabb();
    }

    pub fn clear_bounds(&mut self) {
        self.local_bounds.clear();
        self.world_aabb = None;
    }

    pub fn set_flags(&mut self, flags: ObjectFlags) {
        self.flags = flags;
    }

    pub fn set_flag(&mut self, flag: ObjectFlags, enabled: bool) {
        self.flags.set(flag, enabled);
    }

    // ===== ZONE BOOKKEEPING (scene manager only) =====

    pub(crate) fn set_home_zone(&mut self, zone: Option<ZoneKey>) {
        self.home_zone = zone;
    }

    pub(crate) fn add_visiting_zone(&mut self, zone: ZoneKey) {
        if !self.visiting_zones.contains(&zone) {
            self.visiting_zones.push(zone);
        }
    }

    pub(crate) fn remove_visiting_zone(&mut self, zone: ZoneKey) {
        self.visiting_zones.retain(|visited| *visited != zone);
    }

    pub(crate) fn take_visiting_zones(&mut self) -> Vec<ZoneKey> {
        std::mem::take(&mut self.visiting_zones)
    }

    pub(crate) fn save_previous_position(&mut self) {
        self.previous_position = self.position;
    }

    pub(crate) fn mark_visible(&mut self, frame: u64, camera_id: u64) {
        self.last_visible_frame = frame;
        self.last_visible_from_camera = Some(camera_id);
    }
}

#[cfg(test)]
#[path = "scene_object_tests.rs"]
mod tests;
