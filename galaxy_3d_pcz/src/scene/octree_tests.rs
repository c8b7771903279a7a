use glam::Vec3;
use slotmap::SlotMap;
use super::*;
use crate::bounds::{Ray, Sphere};
use crate::scene::ObjectFlags;

fn world() -> AABB {
    AABB::new(Vec3::ZERO, Vec3::splat(100.0))
}

fn cube(center: Vec3, size: f32) -> AABB {
    AABB::from_center_half_size(center, Vec3::splat(size * 0.5))
}

/// Insert an object of edge `size` centered at `center` and place it.
fn place(
    tree: &mut Octree,
    objects: &mut SlotMap<ObjectKey, SceneObject>,
    center: Vec3,
    size: f32,
) -> ObjectKey {
    let local = cube(Vec3::ZERO, size);
    let key = objects.insert(SceneObject::with_bounds("object", local, center));
    let aabb = objects[key].world_aabb().unwrap();
    tree.update_object(key, &aabb);
    key
}

/// Recount every subtree and compare with the stored counts.
fn assert_counts_consistent(tree: &Octree) {
    fn recount(tree: &Octree, index: usize) -> usize {
        let node = tree.node(index).unwrap();
        let below: usize = node.children().iter().flatten().map(|child| recount(tree, *child)).sum();
        let total = node.objects().len() + below;
        assert_eq!(node.object_count(), total, "node {} count mismatch", index);
        total
    }
    let total = recount(tree, ROOT);
    assert_eq!(total, tree.object_count());
}

// ============================================================================
// Tests: Construction
// ============================================================================

#[test]
fn test_new_octree_has_only_root() {
    let tree = Octree::new(world(), 8);
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.object_count(), 0);
    assert_eq!(tree.bounds(), world());
    assert_eq!(tree.root().depth(), 0);
    assert!(tree.root().parent().is_none());
    assert_eq!(tree.root().half_size(), Vec3::splat(50.0));
}

#[test]
fn test_culling_bounds_expand_by_half_size() {
    let tree = Octree::new(world(), 8);
    let loose = tree.root().culling_bounds();
    assert_eq!(loose.min, Vec3::splat(-50.0));
    assert_eq!(loose.max, Vec3::splat(150.0));
}

// ============================================================================
// Tests: Fit Tests
// ============================================================================

#[test]
fn test_is_twice_size() {
    let tree = Octree::new(world(), 8);
    assert!(tree.is_twice_size(ROOT, &cube(Vec3::splat(50.0), 50.0)));
    assert!(!tree.is_twice_size(ROOT, &cube(Vec3::splat(50.0), 50.1)));
    assert!(!tree.is_twice_size(ROOT, &AABB::EMPTY));
}

#[test]
fn test_child_index_uses_center_strictly() {
    let tree = Octree::new(world(), 8);
    assert_eq!(tree.child_index(ROOT, &cube(Vec3::splat(10.0), 1.0)), 0);
    assert_eq!(tree.child_index(ROOT, &cube(Vec3::new(60.0, 10.0, 10.0), 1.0)), 1);
    assert_eq!(tree.child_index(ROOT, &cube(Vec3::new(10.0, 60.0, 10.0), 1.0)), 2);
    assert_eq!(tree.child_index(ROOT, &cube(Vec3::new(10.0, 10.0, 60.0), 1.0)), 4);
    assert_eq!(tree.child_index(ROOT, &cube(Vec3::splat(90.0), 1.0)), 7);
    // Exactly on the center goes low
    assert_eq!(tree.child_index(ROOT, &cube(Vec3::splat(50.0), 1.0)), 0);
}

#[test]
fn test_is_in() {
    let tree = Octree::new(world(), 8);
    assert!(tree.is_in(ROOT, &cube(Vec3::splat(50.0), 10.0)));
    // Center on the boundary
    assert!(!tree.is_in(ROOT, &cube(Vec3::new(100.0, 50.0, 50.0), 10.0)));
    // As large as the node
    assert!(!tree.is_in(ROOT, &cube(Vec3::splat(50.0), 100.0)));
}

// ============================================================================
// Tests: Placement
// ============================================================================

#[test]
fn test_loose_fit_depths() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();

    let big = place(&mut tree, &mut objects, Vec3::splat(50.0), 60.0);
    let medium = place(&mut tree, &mut objects, Vec3::splat(25.0), 10.0);
    let small = place(&mut tree, &mut objects, Vec3::splat(10.0), 1.0);

    assert_eq!(tree.depth_of(big), Some(0));
    assert_eq!(tree.depth_of(medium), Some(3));
    assert_eq!(tree.depth_of(small), Some(6));
    assert_counts_consistent(&tree);
}

#[test]
fn test_max_depth_bounds_descent() {
    let mut tree = Octree::new(world(), 2);
    let mut objects = SlotMap::with_key();

    let small = place(&mut tree, &mut objects, Vec3::splat(10.0), 1.0);
    assert_eq!(tree.depth_of(small), Some(2));
}

#[test]
fn test_object_outside_root_is_forced_into_root() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();

    let outside = place(&mut tree, &mut objects, Vec3::splat(500.0), 1.0);
    assert_eq!(tree.location(outside), Some(ROOT));
    assert_eq!(tree.object_count(), 1);
}

#[test]
fn test_object_without_bounds_is_not_placed() {
    let mut tree = Octree::new(world(), 8);
    let mut objects: SlotMap<ObjectKey, SceneObject> = SlotMap::with_key();
    let key = objects.insert(SceneObject::new("no bounds"));

    tree.update_object(key, &AABB::EMPTY);
    assert!(!tree.contains_object(key));
}

#[test]
fn test_children_tile_parent_exactly() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    for x in [10.0, 60.0] {
        for y in [10.0, 60.0] {
            for z in [10.0, 60.0] {
                place(&mut tree, &mut objects, Vec3::new(x, y, z), 1.0);
            }
        }
    }

    for node in tree.nodes() {
        let center = node.bounds().center();
        for (octant, child) in node.children().iter().enumerate() {
            let Some(child) = child else { continue };
            let child = tree.node(*child).unwrap();
            let expected_min = Vec3::new(
                if octant & 1 == 0 { node.bounds().min.x } else { center.x },
                if octant & 2 == 0 { node.bounds().min.y } else { center.y },
                if octant & 4 == 0 { node.bounds().min.z } else { center.z },
            );
            assert_eq!(child.bounds().min, expected_min);
            assert_eq!(child.bounds().size(), node.bounds().size() * 0.5);
            assert_eq!(child.half_size(), child.bounds().size() * 0.5);
            assert_eq!(child.depth(), node.depth() + 1);
        }
    }
    // Every root octant was created
    assert!(tree.root().children().iter().all(Option::is_some));
}

#[test]
fn test_add_object_twice_is_noop() {
    let mut tree = Octree::new(world(), 8);
    let mut objects: SlotMap<ObjectKey, SceneObject> = SlotMap::with_key();
    let key = objects.insert(SceneObject::new("a"));

    tree.add_object(ROOT, key);
    tree.add_object(ROOT, key);
    assert_eq!(tree.root().objects().len(), 1);
    assert_eq!(tree.object_count(), 1);
}

#[test]
fn test_counts_after_add_remove_sequence() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();

    let keys: Vec<ObjectKey> = (0..20)
        .map(|i| {
            let t = i as f32 * 4.5 + 2.0;
            place(&mut tree, &mut objects, Vec3::new(t, 100.0 - t, t * 0.5 + 1.0), 1.0 + (i % 4) as f32 * 5.0)
        })
        .collect();
    assert_eq!(tree.object_count(), 20);
    assert_counts_consistent(&tree);

    for key in keys.iter().step_by(3) {
        assert!(tree.remove_object(*key));
    }
    assert_counts_consistent(&tree);
    assert_eq!(tree.object_count(), 20 - keys.iter().step_by(3).count());

    // Removing again reports absence
    assert!(!tree.remove_object(keys[0]));

    let nodes_before = tree.node_count();
    for key in &keys {
        tree.remove_object(*key);
    }
    assert_eq!(tree.object_count(), 0);
    // Empty children are kept
    assert_eq!(tree.node_count(), nodes_before);
    assert_counts_consistent(&tree);
}

#[test]
fn test_update_moves_object_that_left_its_octant() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    let key = place(&mut tree, &mut objects, Vec3::splat(10.0), 1.0);
    let before = tree.location(key).unwrap();

    objects[key].set_position(Vec3::splat(90.0));
    let aabb = objects[key].world_aabb().unwrap();
    tree.update_object(key, &aabb);

    let after = tree.location(key).unwrap();
    assert_ne!(before, after);
    assert!(tree.node(after).unwrap().bounds().contains_point(Vec3::splat(90.0)));
    assert_counts_consistent(&tree);
}

#[test]
fn test_update_keeps_object_still_fitting() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    let key = place(&mut tree, &mut objects, Vec3::splat(10.0), 1.0);
    let before = tree.location(key);

    objects[key].set_position(Vec3::splat(10.2));
    let aabb = objects[key].world_aabb().unwrap();
    tree.update_object(key, &aabb);

    assert_eq!(tree.location(key), before);
}

#[test]
fn test_clear_keeps_nodes() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    place(&mut tree, &mut objects, Vec3::splat(10.0), 1.0);
    let nodes = tree.node_count();

    tree.clear();
    assert_eq!(tree.object_count(), 0);
    assert_eq!(tree.node_count(), nodes);
    assert_counts_consistent(&tree);
}

// ============================================================================
// Tests: Range Queries
// ============================================================================

#[test]
fn test_whole_world_query_returns_every_object_once() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    let mut keys = Vec::new();
    for i in 0..30 {
        let t = (i as f32 * 7.3) % 95.0 + 2.0;
        keys.push(place(&mut tree, &mut objects, Vec3::new(t, (t * 3.0) % 95.0 + 2.0, 50.0), 1.0 + (i % 5) as f32));
    }
    // One object outside the root too
    keys.push(place(&mut tree, &mut objects, Vec3::splat(300.0), 2.0));

    let shape = BoundingShape::Aabb(AABB::new(Vec3::splat(-1000.0), Vec3::splat(1000.0)));
    let mut results = Vec::new();
    tree.find_objects(&shape, &objects, ObjectFilter::default(), &mut results);

    assert_eq!(results.len(), keys.len());
    for key in &keys {
        assert_eq!(results.iter().filter(|k| *k == key).count(), 1);
    }
}

#[test]
fn test_box_query_returns_only_touching_objects() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    let near = place(&mut tree, &mut objects, Vec3::splat(10.0), 2.0);
    let far = place(&mut tree, &mut objects, Vec3::splat(90.0), 2.0);

    let shape = BoundingShape::Aabb(cube(Vec3::splat(12.0), 4.0));
    let mut results = Vec::new();
    tree.find_objects(&shape, &objects, ObjectFilter::default(), &mut results);

    assert_eq!(results, vec![near]);
    assert!(!results.contains(&far));
}

#[test]
fn test_sphere_and_ray_queries() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    let a = place(&mut tree, &mut objects, Vec3::new(20.0, 50.0, 50.0), 2.0);
    let b = place(&mut tree, &mut objects, Vec3::new(80.0, 50.0, 50.0), 2.0);
    let c = place(&mut tree, &mut objects, Vec3::new(50.0, 90.0, 50.0), 2.0);

    let mut results = Vec::new();
    let sphere = BoundingShape::Sphere(Sphere::new(Vec3::new(20.0, 50.0, 50.0), 5.0));
    tree.find_objects(&sphere, &objects, ObjectFilter::default(), &mut results);
    assert_eq!(results, vec![a]);

    results.clear();
    let ray = BoundingShape::Ray(Ray::new(Vec3::new(0.0, 50.0, 50.0), Vec3::X));
    tree.find_objects(&ray, &objects, ObjectFilter::default(), &mut results);
    assert!(results.contains(&a));
    assert!(results.contains(&b));
    assert!(!results.contains(&c));
}

#[test]
fn test_empty_query_shape_finds_nothing() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    place(&mut tree, &mut objects, Vec3::splat(50.0), 2.0);

    let mut results = Vec::new();
    tree.find_objects(&BoundingShape::Aabb(AABB::EMPTY), &objects, ObjectFilter::default(), &mut results);
    assert!(results.is_empty());
}

#[test]
fn test_query_filter_excludes_object() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    let a = place(&mut tree, &mut objects, Vec3::splat(40.0), 2.0);
    let b = place(&mut tree, &mut objects, Vec3::splat(42.0), 2.0);

    let shape = BoundingShape::Aabb(cube(Vec3::splat(41.0), 10.0));
    let filter = ObjectFilter { exclude: Some(a), home_zone: None };
    let mut results = Vec::new();
    tree.find_objects(&shape, &objects, filter, &mut results);
    assert_eq!(results, vec![b]);
}

// ============================================================================
// Tests: Camera Walk
// ============================================================================

fn overview_camera() -> PczCamera {
    PczCamera::perspective(
        Vec3::new(50.0, 50.0, 250.0),
        Vec3::splat(50.0),
        Vec3::Y,
        std::f32::consts::FRAC_PI_2,
        1.0,
        0.1,
        1000.0,
    )
}

#[test]
fn test_walk_visible_stamps_and_dedups() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    let a = place(&mut tree, &mut objects, Vec3::splat(10.0), 2.0);
    let b = place(&mut tree, &mut objects, Vec3::splat(70.0), 20.0);
    let camera = overview_camera();

    let mut visible = Vec::new();
    tree.walk_visible(&camera, &mut objects, 5, &mut visible);
    assert_eq!(visible.len(), 2);
    assert!(visible.contains(&a) && visible.contains(&b));
    assert!(objects[a].was_visible_in(5, camera.id()));

    // Same frame, same camera: already stamped
    let mut again = Vec::new();
    tree.walk_visible(&camera, &mut objects, 5, &mut again);
    assert!(again.is_empty());

    // Next frame
    tree.walk_visible(&camera, &mut objects, 6, &mut again);
    assert_eq!(again.len(), 2);
}

#[test]
fn test_walk_visible_skips_hidden_and_culled_objects() {
    let mut tree = Octree::new(world(), 8);
    let mut objects = SlotMap::with_key();
    let hidden = place(&mut tree, &mut objects, Vec3::splat(30.0), 2.0);
    objects[hidden].set_flag(ObjectFlags::VISIBLE, false);
    let shown = place(&mut tree, &mut objects, Vec3::splat(60.0), 2.0);

    // Looking away from the box
    let camera = PczCamera::perspective(
        Vec3::new(50.0, 50.0, 250.0),
        Vec3::new(50.0, 50.0, 400.0),
        Vec3::Y,
        std::f32::consts::FRAC_PI_2,
        1.0,
        0.1,
        1000.0,
    );
    let mut visible = Vec::new();
    tree.walk_visible(&camera, &mut objects, 1, &mut visible);
    assert!(visible.is_empty());

    let camera = overview_camera();
    tree.walk_visible(&camera, &mut objects, 1, &mut visible);
    assert_eq!(visible, vec![shown]);
}
