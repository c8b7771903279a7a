/// Octree — loose octree spatial index owned by a zone.
///
/// Each object is stored in exactly one node: the deepest node whose own
/// bounds are at least twice the object's world AABB on every axis, bounded
/// by `max_depth`. Only the object's center decides which child to descend
/// into, so a node's culling bounds are its bounds expanded by `half_size`
/// (the "loose" margin) on each side.
///
/// Nodes live in a flat array with the root at index 0. Children are
/// created lazily on first descent and never deleted, so objects that
/// oscillate across a boundary do not churn allocations. Every node keeps
/// the number of objects stored at or below it, which lets traversals skip
/// empty subtrees in O(1).

use rustc_hash::FxHashMap;
use glam::Vec3;
use slotmap::SlotMap;
use crate::bounds::{BoundingShape, Intersection, AABB};
use crate::camera::{PczCamera, Visibility};
use super::scene_object::{ObjectKey, SceneObject};
use super::zone::ZoneKey;

/// Index of the root node in the flat node array.
pub const ROOT: usize = 0;

/// A single node of the loose octree.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// Region owned by this node
    bounds: AABB,
    /// Half extent of `bounds`, used as the loose margin
    half_size: Vec3,
    /// Children indexed by octant (bit0 = X, bit1 = Y, bit2 = Z)
    children: [Option<usize>; 8],
    /// Objects attached directly to this node
    objects: Vec<ObjectKey>,
    /// Objects stored at or below this node
    object_count: usize,
    /// Parent index, `None` for the root
    parent: Option<usize>,
    depth: u32,
}

impl OctreeNode {
    fn new(bounds: AABB, parent: Option<usize>, depth: u32) -> Self {
        Self {
            bounds,
            half_size: bounds.half_size(),
            children: [None; 8],
            objects: Vec::new(),
            object_count: 0,
            parent,
            depth,
        }
    }

    pub fn bounds(&self) -> &AABB {
        &self.bounds
    }

    pub fn half_size(&self) -> Vec3 {
        self.half_size
    }

    /// Bounds expanded by the loose margin on each side.
    pub fn culling_bounds(&self) -> AABB {
        self.bounds.expanded(self.half_size)
    }

    pub fn children(&self) -> &[Option<usize>; 8] {
        &self.children
    }

    pub fn objects(&self) -> &[ObjectKey] {
        &self.objects
    }

    /// Number of objects stored at or below this node.
    pub fn object_count(&self) -> usize {
        self.object_count
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Root = 0
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

/// Filter applied to every candidate object of a range query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectFilter {
    /// Never returned
    pub exclude: Option<ObjectKey>,
    /// When set, only objects whose home zone is this zone are returned
    pub home_zone: Option<ZoneKey>,
}

impl ObjectFilter {
    fn accepts(&self, key: ObjectKey, object: &SceneObject) -> bool {
        if self.exclude == Some(key) {
            return false;
        }
        match self.home_zone {
            Some(zone) => object.home_zone() == Some(zone),
            None => true,
        }
    }
}

/// Loose octree over object keys.
///
/// Object bounds are read from the scene object arena at query time, the
/// tree only remembers where each key is stored.
#[derive(Debug, Clone)]
pub struct Octree {
    /// Flat array of nodes, root at index 0
    nodes: Vec<OctreeNode>,
    /// Maximum depth of the tree (root = depth 0)
    max_depth: u32,
    /// Reverse lookup: object key → node index
    object_locations: FxHashMap<ObjectKey, usize>,
}

impl Octree {
    /// Create an octree with a single root node covering `bounds`.
    pub fn new(bounds: AABB, max_depth: u32) -> Self {
        Self {
            nodes: vec![OctreeNode::new(bounds, None, 0)],
            max_depth,
            object_locations: FxHashMap::default(),
        }
    }

    // ===== ACCESSORS =====

    /// Bounds of the root node.
    pub fn bounds(&self) -> AABB {
        self.nodes[ROOT].bounds
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, index: usize) -> Option<&OctreeNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of objects stored anywhere in the tree.
    pub fn object_count(&self) -> usize {
        self.nodes[ROOT].object_count
    }

    /// Node currently holding `key`.
    pub fn location(&self, key: ObjectKey) -> Option<usize> {
        self.object_locations.get(&key).copied()
    }

    pub fn contains_object(&self, key: ObjectKey) -> bool {
        self.object_locations.contains_key(&key)
    }

    /// Depth of the node currently holding `key`.
    pub fn depth_of(&self, key: ObjectKey) -> Option<u32> {
        self.location(key).map(|index| self.nodes[index].depth)
    }

    // ===== FIT TESTS =====

    /// Node bounds are at least twice `aabb`'s extent on every axis.
    pub fn is_twice_size(&self, node: usize, aabb: &AABB) -> bool {
        if aabb.is_empty() {
            return false;
        }
        let half_node = self.nodes[node].bounds.size() * 0.5;
        let size = aabb.size();
        half_node.x >= size.x && half_node.y >= size.y && half_node.z >= size.z
    }

    /// Octant of `node` containing the center of `aabb`.
    ///
    /// Bit layout: bit0 = X, bit1 = Y, bit2 = Z (1 when strictly above the node center).
    pub fn child_index(&self, node: usize, aabb: &AABB) -> usize {
        let center = self.nodes[node].bounds.center();
        let point = aabb.center();
        (point.x > center.x) as usize
            | ((point.y > center.y) as usize) << 1
            | ((point.z > center.z) as usize) << 2
    }

    /// Does `aabb` still loosely fit `node`?
    ///
    /// The box center must lie strictly inside the node bounds and the box
    /// must be strictly smaller than the node on every axis.
    pub fn is_in(&self, node: usize, aabb: &AABB) -> bool {
        let bounds = &self.nodes[node].bounds;
        if bounds.is_empty() || aabb.is_empty() {
            return false;
        }
        if !bounds.strictly_contains_point(aabb.center()) {
            return false;
        }
        let node_size = bounds.size();
        let size = aabb.size();
        size.x < node_size.x && size.y < node_size.y && size.z < node_size.z
    }

    /// Compute the AABB of a specific octant (0–7).
    fn octant_aabb(parent: &AABB, center: Vec3, octant: usize) -> AABB {
        AABB {
            min: Vec3::new(
                if octant & 1 == 0 { parent.min.x } else { center.x },
                if octant & 2 == 0 { parent.min.y } else { center.y },
                if octant & 4 == 0 { parent.min.z } else { center.z },
            ),
            max: Vec3::new(
                if octant & 1 == 0 { center.x } else { parent.max.x },
                if octant & 2 == 0 { center.y } else { parent.max.y },
                if octant & 4 == 0 { center.z } else { parent.max.z },
            ),
        }
    }

    /// Return the child of `node` in `octant`, creating it on first use.
    fn child_or_create(&mut self, node: usize, octant: usize) -> usize {
        if let Some(child) = self.nodes[node].children[octant] {
            return child;
        }

        let parent = &self.nodes[node];
        let bounds = Self::octant_aabb(&parent.bounds, parent.bounds.center(), octant);
        let depth = parent.depth + 1;

        let child = self.nodes.len();
        self.nodes.push(OctreeNode::new(bounds, Some(node), depth));
        self.nodes[node].children[octant] = Some(child);
        child
    }

    // ===== ATTACH / DETACH =====

    /// Walk from `node` to the root, adjusting every subtree count.
    fn propagate_count(&mut self, node: usize, added: bool) {
        let mut current = Some(node);
        while let Some(index) = current {
            let entry = &mut self.nodes[index];
            if added {
                entry.object_count += 1;
            } else {
                entry.object_count = entry.object_count.saturating_sub(1);
            }
            current = entry.parent;
        }
    }

    /// Attach `key` to `node`, detaching it from its previous node first.
    ///
    /// No-op when the object is already attached there.
    pub fn add_object(&mut self, node: usize, key: ObjectKey) {
        match self.object_locations.get(&key) {
            Some(&current) if current == node => return,
            Some(_) => {
                self.remove_object(key);
            }
            None => {}
        }

        self.nodes[node].objects.push(key);
        self.object_locations.insert(key, node);
        self.propagate_count(node, true);
    }

    /// Detach `key` from whichever node holds it. Empty nodes are kept.
    ///
    /// Returns `false` when the object was not in the tree.
    pub fn remove_object(&mut self, key: ObjectKey) -> bool {
        let Some(node) = self.object_locations.remove(&key) else {
            return false;
        };

        let objects = &mut self.nodes[node].objects;
        if let Some(pos) = objects.iter().position(|&k| k == key) {
            objects.swap_remove(pos);
        }
        self.propagate_count(node, false);
        true
    }

    /// Descend from `node` while the box is at most half the node size,
    /// creating children on the way, then attach.
    pub fn add_object_recursive(&mut self, key: ObjectKey, aabb: &AABB, node: usize, depth: u32) {
        if depth < self.max_depth && self.is_twice_size(node, aabb) {
            let octant = self.child_index(node, aabb);
            let child = self.child_or_create(node, octant);
            self.add_object_recursive(key, aabb, child, depth + 1);
        } else {
            self.add_object(node, key);
        }
    }

    /// Keep `key` in a node that loosely fits `aabb`.
    ///
    /// Objects that do not fit the root are attached to the root. Empty
    /// boxes are never placed.
    pub fn update_object(&mut self, key: ObjectKey, aabb: &AABB) {
        if aabb.is_empty() {
            return;
        }

        match self.location(key) {
            None => {
                if self.is_in(ROOT, aabb) {
                    self.add_object_recursive(key, aabb, ROOT, 0);
                } else {
                    self.add_object(ROOT, key);
                }
            }
            Some(octant) if !self.is_in(octant, aabb) => {
                if self.is_in(ROOT, aabb) {
                    self.add_object_recursive(key, aabb, ROOT, 0);
                } else {
                    // add_object is a no-op when it already sits in the root
                    self.add_object(ROOT, key);
                }
            }
            Some(_) => {}
        }
    }

    /// Drop every object. Nodes are kept.
    pub fn clear(&mut self) {
        for node in &mut self.nodes {
            node.objects.clear();
            node.object_count = 0;
        }
        self.object_locations.clear();
    }

    // ===== RANGE QUERY =====

    /// Append every object whose world AABB touches `shape` to `results`.
    ///
    /// 3-way classification of each node's culling bounds:
    /// - `Outside` → skip the subtree
    /// - `Inside` → accept every object below without further testing
    /// - `Intersect` → test objects individually and recurse
    pub fn find_objects(
        &self,
        shape: &BoundingShape,
        objects: &SlotMap<ObjectKey, SceneObject>,
        filter: ObjectFilter,
        results: &mut Vec<ObjectKey>,
    ) {
        if self.nodes[ROOT].object_count == 0 {
            return;
        }
        self.find_recursive(ROOT, shape, objects, filter, false, results);
    }

    fn find_recursive(
        &self,
        node_idx: usize,
        shape: &BoundingShape,
        objects: &SlotMap<ObjectKey, SceneObject>,
        filter: ObjectFilter,
        mut full: bool,
        results: &mut Vec<ObjectKey>,
    ) {
        let node = &self.nodes[node_idx];

        if !full {
            match shape.classify(&node.culling_bounds()) {
                Intersection::Outside => return,
                Intersection::Inside => full = true,
                Intersection::Intersect => {}
            }
        }

        for &key in &node.objects {
            let Some(object) = objects.get(key) else {
                continue;
            };
            if !filter.accepts(key, object) {
                continue;
            }
            let accepted = full || object.world_aabb().is_some_and(|aabb| shape.touches(&aabb));
            if accepted {
                results.push(key);
            }
        }

        for child in node.children.iter().flatten() {
            if self.nodes[*child].object_count > 0 {
                self.find_recursive(*child, shape, objects, filter, full, results);
            }
        }
    }

    // ===== CAMERA WALK =====

    /// Collect objects visible from `camera`, stamping each accepted object
    /// with `(frame, camera id)` so no zone can return it twice.
    ///
    /// The root is never culled. Children of a fully visible node are
    /// fully visible without testing.
    pub(crate) fn walk_visible(
        &self,
        camera: &PczCamera,
        objects: &mut SlotMap<ObjectKey, SceneObject>,
        frame: u64,
        visible: &mut Vec<ObjectKey>,
    ) {
        if self.nodes[ROOT].object_count == 0 {
            return;
        }
        self.walk_node(ROOT, camera, objects, frame, false, visible);
    }

    fn walk_node(
        &self,
        node_idx: usize,
        camera: &PczCamera,
        objects: &mut SlotMap<ObjectKey, SceneObject>,
        frame: u64,
        found_visible: bool,
        visible: &mut Vec<ObjectKey>,
    ) {
        let node = &self.nodes[node_idx];

        let visibility = if node_idx == ROOT {
            Visibility::Partial
        } else if found_visible {
            Visibility::Full
        } else {
            camera.visibility(&node.culling_bounds())
        };

        if visibility == Visibility::None {
            return;
        }

        for &key in &node.objects {
            let Some(object) = objects.get_mut(key) else {
                continue;
            };
            if !object.is_visible() || object.was_visible_in(frame, camera.id()) {
                continue;
            }
            if visibility == Visibility::Partial {
                let in_view = object
                    .world_aabb()
                    .is_some_and(|aabb| camera.is_aabb_visible(&aabb));
                if !in_view {
                    continue;
                }
            }
            object.mark_visible(frame, camera.id());
            visible.push(key);
        }

        let fully_visible = visibility == Visibility::Full;
        for child in node.children.iter().flatten() {
            if self.nodes[*child].object_count > 0 {
                self.walk_node(*child, camera, objects, frame, fully_visible, visible);
            }
        }
    }
}

#[cfg(test)]
#[path = "octree_tests.rs"]
mod tests;
