use glam::Vec3;
use slotmap::SlotMap;
use super::*;
use crate::galaxy3d::Galaxy3dError;
use crate::galaxy3d::scene::ROOT;

fn room_bounds() -> AABB {
    AABB::new(Vec3::ZERO, Vec3::splat(100.0))
}

/// A zone plus the arena its key lives in.
fn make_zone(desc: ZoneDesc) -> Galaxy3dResult<Zone> {
    let mut keys: SlotMap<ZoneKey, ()> = SlotMap::with_key();
    Zone::new(keys.insert(()), desc)
}

fn object_in(
    objects: &mut SlotMap<ObjectKey, SceneObject>,
    home: Option<ZoneKey>,
    position: Vec3,
) -> ObjectKey {
    let mut object = SceneObject::with_bounds(
        "object",
        AABB::from_center_half_size(Vec3::ZERO, Vec3::ONE),
        position,
    );
    object.set_home_zone(home);
    objects.insert(object)
}

// ============================================================================
// Tests: Construction
// ============================================================================

#[test]
fn test_zone_desc_defaults() {
    let desc = ZoneDesc::new("hall", room_bounds());
    assert_eq!(desc.max_depth, DEFAULT_MAX_DEPTH);
    assert_eq!(desc.with_max_depth(4).max_depth, 4);
}

#[test]
fn test_new_zone() {
    let zone = make_zone(ZoneDesc::new("hall", room_bounds())).unwrap();
    assert_eq!(zone.name(), "hall");
    assert_eq!(zone.bounds(), room_bounds());
    assert_eq!(zone.max_depth(), DEFAULT_MAX_DEPTH);
    assert!(zone.is_empty());
    assert!(zone.portals_updated());
    assert!(!zone.has_sky());
    assert!(zone.enclosure_object().is_none());
    assert_eq!(zone.last_visible_frame(), 0);
}

#[test]
fn test_degenerate_bounds_rejected() {
    let flat = AABB::new(Vec3::ZERO, Vec3::new(100.0, 0.0, 100.0));
    let result = make_zone(ZoneDesc::new("flat", flat));
    assert!(matches!(result, Err(Galaxy3dError::InvalidConfiguration(_))));

    let result = make_zone(ZoneDesc::new("empty", AABB::EMPTY));
    assert!(matches!(result, Err(Galaxy3dError::InvalidConfiguration(_))));
}

#[test]
fn test_depth_out_of_range_rejected() {
    let result = make_zone(ZoneDesc::new("shallow", room_bounds()).with_max_depth(0));
    assert!(matches!(result, Err(Galaxy3dError::InvalidConfiguration(_))));

    let result = make_zone(ZoneDesc::new("deep", room_bounds()).with_max_depth(MAX_OCTREE_DEPTH + 1));
    assert!(matches!(result, Err(Galaxy3dError::InvalidConfiguration(_))));

    assert!(make_zone(ZoneDesc::new("deepest", room_bounds()).with_max_depth(MAX_OCTREE_DEPTH)).is_ok());
}

// ============================================================================
// Tests: Objects
// ============================================================================

#[test]
fn test_add_object_home_or_visitor() {
    let mut zone = make_zone(ZoneDesc::new("hall", room_bounds())).unwrap();
    let mut objects = SlotMap::with_key();
    let resident = object_in(&mut objects, Some(zone.key()), Vec3::splat(10.0));
    let guest = object_in(&mut objects, None, Vec3::splat(20.0));

    zone.add_object(resident, &objects[resident]);
    zone.add_object(guest, &objects[guest]);

    assert!(zone.home_objects().contains(&resident));
    assert!(zone.visitor_objects().contains(&guest));
    assert!(!zone.visitor_objects().contains(&resident));
    assert!(!zone.is_empty());
    // Not placed until the octant update
    assert_eq!(zone.octree().object_count(), 0);
}

#[test]
fn test_remove_object_detaches_from_octree() {
    let mut zone = make_zone(ZoneDesc::new("hall", room_bounds())).unwrap();
    let mut objects = SlotMap::with_key();
    let key = object_in(&mut objects, Some(zone.key()), Vec3::splat(10.0));

    zone.add_object(key, &objects[key]);
    zone.update_object_octant(key, &objects[key]);
    assert!(zone.octree().contains_object(key));

    assert!(zone.remove_object(key));
    assert!(!zone.contains_object(key));
    assert!(!zone.octree().contains_object(key));
    assert!(!zone.remove_object(key));
}

#[test]
fn test_clear_visitors_keeps_home_objects() {
    let mut zone = make_zone(ZoneDesc::new("hall", room_bounds())).unwrap();
    let mut objects = SlotMap::with_key();
    let resident = object_in(&mut objects, Some(zone.key()), Vec3::splat(10.0));
    let guest = object_in(&mut objects, None, Vec3::splat(20.0));
    for key in [resident, guest] {
        zone.add_object(key, &objects[key]);
        zone.update_object_octant(key, &objects[key]);
    }

    zone.clear_visitors();
    assert!(zone.visitor_objects().is_empty());
    assert!(!zone.octree().contains_object(guest));
    assert!(zone.octree().contains_object(resident));
}

// ============================================================================
// Tests: Portals
// ============================================================================

#[test]
fn test_portal_list() {
    let mut zone = make_zone(ZoneDesc::new("hall", room_bounds())).unwrap();
    let mut portals: SlotMap<PortalKey, ()> = SlotMap::with_key();
    let door = portals.insert(());

    zone.set_portals_updated(false);
    assert!(zone.add_portal(door));
    assert!(!zone.add_portal(door));
    assert!(zone.portals_updated());
    assert_eq!(zone.portals(), &[door]);

    zone.set_portals_updated(false);
    assert!(zone.remove_portal(door));
    assert!(zone.portals_updated());
    assert!(zone.portals().is_empty());
}

// ============================================================================
// Tests: Resize & Queries
// ============================================================================

#[test]
fn test_resize_reinserts_objects() {
    let mut zone = make_zone(ZoneDesc::new("hall", room_bounds())).unwrap();
    let mut objects = SlotMap::with_key();
    let inside = object_in(&mut objects, Some(zone.key()), Vec3::splat(10.0));
    let guest = object_in(&mut objects, None, Vec3::splat(150.0));
    for key in [inside, guest] {
        zone.add_object(key, &objects[key]);
        zone.update_object_octant(key, &objects[key]);
    }

    let bigger = AABB::new(Vec3::ZERO, Vec3::splat(200.0));
    zone.resize(bigger, &objects).unwrap();

    assert_eq!(zone.bounds(), bigger);
    assert_eq!(zone.octree().object_count(), 2);
    // The guest no longer sits in the root
    assert_ne!(zone.octree().location(guest), Some(ROOT));
}

#[test]
fn test_resize_to_degenerate_bounds_fails() {
    let mut zone = make_zone(ZoneDesc::new("hall", room_bounds())).unwrap();
    let objects: SlotMap<ObjectKey, SceneObject> = SlotMap::with_key();

    let result = zone.resize(AABB::EMPTY, &objects);
    assert!(matches!(result, Err(Galaxy3dError::InvalidConfiguration(_))));
    assert_eq!(zone.bounds(), room_bounds());
}

#[test]
fn test_set_max_depth_rebuilds() {
    let mut zone = make_zone(ZoneDesc::new("hall", room_bounds())).unwrap();
    let mut objects = SlotMap::with_key();
    let key = object_in(&mut objects, Some(zone.key()), Vec3::splat(10.0));
    zone.add_object(key, &objects[key]);
    zone.update_object_octant(key, &objects[key]);

    zone.set_max_depth(1, &objects).unwrap();
    assert_eq!(zone.max_depth(), 1);
    assert_eq!(zone.octree().depth_of(key), Some(1));
    assert!(zone.set_max_depth(0, &objects).is_err());
}

#[test]
fn test_find_local_objects_visitor_filter() {
    let mut zone = make_zone(ZoneDesc::new("hall", room_bounds())).unwrap();
    let mut objects = SlotMap::with_key();
    let resident = object_in(&mut objects, Some(zone.key()), Vec3::splat(10.0));
    let guest = object_in(&mut objects, None, Vec3::splat(12.0));
    for key in [resident, guest] {
        zone.add_object(key, &objects[key]);
        zone.update_object_octant(key, &objects[key]);
    }
    let shape = BoundingShape::Aabb(room_bounds());

    let mut results = Vec::new();
    zone.find_local_objects(&shape, &objects, false, None, &mut results);
    assert_eq!(results, vec![resident]);

    results.clear();
    zone.find_local_objects(&shape, &objects, true, None, &mut results);
    assert_eq!(results.len(), 2);

    results.clear();
    zone.find_local_objects(&shape, &objects, true, Some(guest), &mut results);
    assert_eq!(results, vec![resident]);
}
