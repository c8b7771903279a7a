/// Zone — a cell of the world owning one loose octree and a list of portals.
///
/// Every object touching a zone is in exactly one of its two sets: the home
/// set when the zone is the object's home zone, the visitor set otherwise.
/// Visitors are rebuilt from scratch on every scene update.
///
/// The octree is fully replaced on `resize()`; all home and visitor objects
/// are then re-inserted.

use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};
use crate::bounds::{BoundingShape, AABB};
use crate::error::Galaxy3dResult;
use crate::{engine_debug, engine_err, engine_trace};
use super::octree::{ObjectFilter, Octree};
use super::portal::PortalKey;
use super::scene_object::{ObjectKey, SceneObject};

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a Zone within a PczSceneManager.
    pub struct ZoneKey;
}

/// Octree depth used when none is given.
pub const DEFAULT_MAX_DEPTH: u32 = 8;

/// Deepest octree a zone accepts.
pub const MAX_OCTREE_DEPTH: u32 = 16;

/// Zone construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDesc {
    /// Unique within a scene manager
    pub name: String,
    /// Initial octree bounds
    pub bounds: AABB,
    /// Octree depth (root = 0), 1..=MAX_OCTREE_DEPTH
    pub max_depth: u32,
}

impl ZoneDesc {
    pub fn new(name: impl Into<String>, bounds: AABB) -> Self {
        Self {
            name: name.into(),
            bounds,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn validate(bounds: &AABB, max_depth: u32) -> Galaxy3dResult<()> {
    if !bounds.has_volume() {
        return Err(engine_err!("galaxy3d::Zone", InvalidConfiguration =>
            "Zone bounds {:?} are empty or degenerate", bounds));
    }
    if max_depth == 0 || max_depth > MAX_OCTREE_DEPTH {
        return Err(engine_err!("galaxy3d::Zone", InvalidConfiguration =>
            "Octree depth {} outside 1..={}", max_depth, MAX_OCTREE_DEPTH));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Zone {
    key: ZoneKey,
    name: String,
    octree: Octree,
    home_objects: FxHashSet<ObjectKey>,
    visitor_objects: FxHashSet<ObjectKey>,
    portals: Vec<PortalKey>,
    enclosure_object: Option<ObjectKey>,
    has_sky: bool,
    portals_updated: bool,
    last_visible_frame: u64,
    last_visible_from_camera: Option<u64>,
}

impl Zone {
    /// Create a zone from its description.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for degenerate bounds or an out-of-range depth.
    pub(crate) fn new(key: ZoneKey, desc: ZoneDesc) -> Galaxy3dResult<Self> {
        validate(&desc.bounds, desc.max_depth)?;

        engine_debug!("galaxy3d::Zone", "Created zone '{}' with bounds {:?}", desc.name, desc.bounds);

        Ok(Self {
            key,
            name: desc.name,
            octree: Octree::new(desc.bounds, desc.max_depth),
            home_objects: FxHashSet::default(),
            visitor_objects: FxHashSet::default(),
            portals: Vec::new(),
            enclosure_object: None,
            has_sky: false,
            portals_updated: true,
            last_visible_frame: 0,
            last_visible_from_camera: None,
        })
    }

    // ===== GETTERS =====

    pub fn key(&self) -> ZoneKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Bounds of the octree root.
    pub fn bounds(&self) -> AABB {
        self.octree.bounds()
    }

    pub fn max_depth(&self) -> u32 {
        self.octree.max_depth()
    }

    pub fn home_objects(&self) -> &FxHashSet<ObjectKey> {
        &self.home_objects
    }

    pub fn visitor_objects(&self) -> &FxHashSet<ObjectKey> {
        &self.visitor_objects
    }

    pub fn contains_object(&self, key: ObjectKey) -> bool {
        self.home_objects.contains(&key) || self.visitor_objects.contains(&key)
    }

    pub fn portals(&self) -> &[PortalKey] {
        &self.portals
    }

    pub fn enclosure_object(&self) -> Option<ObjectKey> {
        self.enclosure_object
    }

    pub fn has_sky(&self) -> bool {
        self.has_sky
    }

    /// One of the zone's portals moved or changed zone since the flag was cleared.
    pub fn portals_updated(&self) -> bool {
        self.portals_updated
    }

    pub fn last_visible_frame(&self) -> u64 {
        self.last_visible_frame
    }

    pub fn last_visible_from_camera(&self) -> Option<u64> {
        self.last_visible_from_camera
    }

    /// No objects and no portals: nothing to walk.
    pub fn is_empty(&self) -> bool {
        self.home_objects.is_empty() && self.visitor_objects.is_empty() && self.portals.is_empty()
    }

    // ===== SETTERS =====

    pub fn set_has_sky(&mut self, has_sky: bool) {
        self.has_sky = has_sky;
    }

    pub(crate) fn set_portals_updated(&mut self, updated: bool) {
        self.portals_updated = updated;
    }

    pub(crate) fn set_enclosure_object(&mut self, key: Option<ObjectKey>) {
        self.enclosure_object = key;
    }

    pub(crate) fn mark_visible(&mut self, frame: u64, camera_id: u64) {
        self.last_visible_frame = frame;
        self.last_visible_from_camera = Some(camera_id);
    }

    // ===== PORTALS =====

    pub(crate) fn add_portal(&mut self, portal: PortalKey) -> bool {
        if self.portals.contains(&portal) {
            return false;
        }
        self.portals.push(portal);
        self.portals_updated = true;
        true
    }

    pub(crate) fn remove_portal(&mut self, portal: PortalKey) -> bool {
        let before = self.portals.len();
        self.portals.retain(|p| *p != portal);
        let removed = self.portals.len() != before;
        if removed {
            self.portals_updated = true;
        }
        removed
    }

    // ===== OBJECTS =====

    /// Register an object in the home or visitor set.
    ///
    /// The object is not placed in the octree until `update_object_octant()`.
    pub fn add_object(&mut self, key: ObjectKey, object: &SceneObject) {
        if object.home_zone() == Some(self.key) {
            self.visitor_objects.remove(&key);
            self.home_objects.insert(key);
        } else {
            self.visitor_objects.insert(key);
        }
    }

    /// Detach from the octree and drop from whichever set holds the object.
    pub fn remove_object(&mut self, key: ObjectKey) -> bool {
        self.octree.remove_object(key);
        let home = self.home_objects.remove(&key);
        let visitor = self.visitor_objects.remove(&key);
        home || visitor
    }

    /// Drop every visitor.
    pub(crate) fn clear_visitors(&mut self) {
        for key in self.visitor_objects.drain() {
            self.octree.remove_object(key);
        }
    }

    /// Keep the object in an octant that loosely fits its current world bounds.
    pub fn update_object_octant(&mut self, key: ObjectKey, object: &SceneObject) {
        let Some(aabb) = object.world_aabb() else {
            return;
        };
        let before = self.octree.location(key);
        self.octree.update_object(key, &aabb);
        let after = self.octree.location(key);
        if before != after {
            engine_trace!("galaxy3d::Zone", "Object {:?} moved to octant {:?} in '{}'", key, after, self.name);
        }
    }

    /// Replace the octree with one covering `bounds` and re-insert every object.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when `bounds` is empty, degenerate or non-finite.
    pub fn resize(&mut self, bounds: AABB, objects: &SlotMap<ObjectKey, SceneObject>) -> Galaxy3dResult<()> {
        self.rebuild(bounds, self.octree.max_depth(), objects)?;
        engine_debug!("galaxy3d::Zone", "Resized zone '{}' to {:?}", self.name, bounds);
        Ok(())
    }

    /// Rebuild the octree with a new depth.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the depth is 0 or above `MAX_OCTREE_DEPTH`.
    pub fn set_max_depth(&mut self, max_depth: u32, objects: &SlotMap<ObjectKey, SceneObject>) -> Galaxy3dResult<()> {
        self.rebuild(self.octree.bounds(), max_depth, objects)?;
        engine_debug!("galaxy3d::Zone", "Zone '{}' octree depth set to {}", self.name, max_depth);
        Ok(())
    }

    fn rebuild(&mut self, bounds: AABB, max_depth: u32, objects: &SlotMap<ObjectKey, SceneObject>) -> Galaxy3dResult<()> {
        validate(&bounds, max_depth)?;

        self.octree = Octree::new(bounds, max_depth);

        let members: Vec<ObjectKey> = self
            .home_objects
            .iter()
            .chain(self.visitor_objects.iter())
            .copied()
            .collect();
        for key in members {
            if let Some(object) = objects.get(key) {
                self.update_object_octant(key, object);
            }
        }
        Ok(())
    }

    // ===== QUERIES =====

    /// Objects of this zone's octree touching `shape`.
    pub fn find_local_objects(
        &self,
        shape: &BoundingShape,
        objects: &SlotMap<ObjectKey, SceneObject>,
        include_visitors: bool,
        exclude: Option<ObjectKey>,
        results: &mut Vec<ObjectKey>,
    ) {
        let filter = ObjectFilter {
            exclude,
            home_zone: (!include_visitors).then_some(self.key),
        };
        self.octree.find_objects(shape, objects, filter, results);
    }
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod tests;
