/// RenderView — result of one zone visibility flood.
///
/// Created by `PczSceneManager::find_visible_objects()`. Records which
/// camera and frame produced it, the visible objects in discovery order,
/// and the zones the flood reached.
///
/// Ephemeral: lives for one frame. No Arc, no Mutex.

use crate::scene::{ObjectKey, ZoneKey};

#[derive(Debug, Clone)]
pub struct RenderView {
    camera_id: u64,
    frame: u64,
    visible_objects: Vec<ObjectKey>,
    visible_zones: Vec<ZoneKey>,
    sky_visible: bool,
}

impl RenderView {
    /// Create a new RenderView (crate-internal: only the scene manager creates these).
    pub(crate) fn new(
        camera_id: u64,
        frame: u64,
        visible_objects: Vec<ObjectKey>,
        visible_zones: Vec<ZoneKey>,
        sky_visible: bool,
    ) -> Self {
        Self {
            camera_id,
            frame,
            visible_objects,
            visible_zones,
            sky_visible,
        }
    }

    /// Id of the camera the flood ran for.
    pub fn camera_id(&self) -> u64 {
        self.camera_id
    }

    /// Frame stamp of the flood.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Visible objects, each listed once.
    pub fn visible_objects(&self) -> &[ObjectKey] {
        &self.visible_objects
    }

    /// Zones reached by the flood, each listed once, camera zone first.
    pub fn visible_zones(&self) -> &[ZoneKey] {
        &self.visible_zones
    }

    pub fn is_object_visible(&self, key: ObjectKey) -> bool {
        self.visible_objects.contains(&key)
    }

    pub fn is_zone_visible(&self, key: ZoneKey) -> bool {
        self.visible_zones.contains(&key)
    }

    /// A reached zone is flagged as having a sky.
    pub fn sky_visible(&self) -> bool {
        self.sky_visible
    }

    /// Number of visible objects.
    pub fn visible_count(&self) -> usize {
        self.visible_objects.len()
    }
}

#[cfg(test)]
#[path = "render_view_tests.rs"]
mod tests;
