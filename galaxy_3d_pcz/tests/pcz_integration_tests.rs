//! Integration tests for the portal-connected zone scene
//!
//! These tests drive a PczSceneManager through whole frames: objects moving
//! between rooms, cameras flooding through doorways and lights spreading
//! across zones. No GPU required.
//!
//! Run with: cargo test --test pcz_integration_tests

use galaxy_3d_pcz::galaxy3d::{PczConfig, PczSceneManager};
use galaxy_3d_pcz::galaxy3d::bounds::{BoundingShape, Sphere, AABB};
use galaxy_3d_pcz::galaxy3d::camera::PczCamera;
use galaxy_3d_pcz::galaxy3d::scene::{
    Light, ObjectKey, Portal, PortalKey, SceneObject, VolumeFacing, ZoneDesc, ZoneKey,
};
use galaxy_3d_pcz::glam::Vec3;

// ============================================================================
// HELPERS
// ============================================================================

struct House {
    manager: PczSceneManager,
    a: ZoneKey,
    b: ZoneKey,
    door: PortalKey,
}

/// Rooms A = [0,100]³ and B = [100,200]×[0,100]², doorway at x = 100.
fn house() -> House {
    let mut manager = PczSceneManager::new(PczConfig::default()).unwrap();
    let a = manager.create_zone(ZoneDesc::new("A", AABB::new(Vec3::ZERO, Vec3::splat(100.0)))).unwrap();
    let b = manager
        .create_zone(ZoneDesc::new("B", AABB::new(Vec3::new(100.0, 0.0, 0.0), Vec3::new(200.0, 100.0, 100.0))))
        .unwrap();

    let door = manager
        .create_portal(
            a,
            Portal::quad(
                "door",
                [
                    Vec3::new(100.0, 0.0, 0.0),
                    Vec3::new(100.0, 0.0, 100.0),
                    Vec3::new(100.0, 100.0, 100.0),
                    Vec3::new(100.0, 100.0, 0.0),
                ],
            ),
        )
        .unwrap();
    let door_back = manager
        .create_portal(
            b,
            Portal::quad(
                "door_back",
                [
                    Vec3::new(100.0, 0.0, 0.0),
                    Vec3::new(100.0, 100.0, 0.0),
                    Vec3::new(100.0, 100.0, 100.0),
                    Vec3::new(100.0, 0.0, 100.0),
                ],
            ),
        )
        .unwrap();
    manager.link_portals(door, door_back).unwrap();

    House { manager, a, b, door }
}

fn crate_at(name: &str, position: Vec3, size: f32) -> SceneObject {
    SceneObject::with_bounds(
        name,
        AABB::from_center_half_size(Vec3::ZERO, Vec3::splat(size * 0.5)),
        position,
    )
}

fn camera(eye: Vec3, target: Vec3, far: f32) -> PczCamera {
    PczCamera::perspective(eye, target, Vec3::Y, std::f32::consts::FRAC_PI_2, 1.0, 0.1, far)
}

// ============================================================================
// TWO ROOMS
// ============================================================================

#[test]
fn test_integration_object_walks_through_door() {
    let House { mut manager, a, b, .. } = house();
    let walker = manager.create_object(crate_at("walker", Vec3::new(99.0, 50.0, 50.0), 2.0), None).unwrap();
    manager.update().unwrap();
    assert_eq!(manager.object(walker).unwrap().home_zone(), Some(a));

    manager.object_mut(walker).unwrap().set_position(Vec3::new(101.0, 50.0, 50.0));
    manager.update().unwrap();
    assert_eq!(manager.object(walker).unwrap().home_zone(), Some(b));

    // Well inside B: no longer visiting A
    manager.object_mut(walker).unwrap().set_position(Vec3::new(150.0, 50.0, 50.0));
    manager.update().unwrap();
    assert_eq!(manager.object(walker).unwrap().home_zone(), Some(b));
    assert!(manager.object(walker).unwrap().visiting_zones().is_empty());
    assert!(manager.zone(a).unwrap().visitor_objects().is_empty());
}

#[test]
fn test_integration_cameras_in_both_directions() {
    let House { mut manager, a, b, .. } = house();
    let in_a = manager.create_object(crate_at("chair", Vec3::new(20.0, 50.0, 50.0), 2.0), None).unwrap();
    let near_door = manager.create_object(crate_at("table", Vec3::new(80.0, 50.0, 50.0), 2.0), None).unwrap();
    let in_b = manager.create_object(crate_at("bed", Vec3::new(150.0, 50.0, 50.0), 2.0), None).unwrap();
    manager.update().unwrap();

    // Looking away from the doorway: only room A. Facing +x with far 60 would
    // still reach the doorway 50 units ahead.
    let mut away = camera(Vec3::splat(50.0), Vec3::new(0.0, 50.0, 50.0), 60.0);
    let mut queue: Vec<ObjectKey> = Vec::new();
    let view = manager.find_visible_objects(&mut away, &mut queue).unwrap();
    assert_eq!(view.visible_zones(), &[a]);
    assert_eq!(queue, vec![in_a]);
    assert_eq!(manager.zone(b).unwrap().last_visible_frame(), 0);

    // Looking through the doorway: both rooms
    let mut toward = camera(Vec3::splat(50.0), Vec3::new(100.0, 50.0, 50.0), 120.0);
    let mut queue: Vec<ObjectKey> = Vec::new();
    let view = manager.find_visible_objects(&mut toward, &mut queue).unwrap();
    assert_eq!(view.visible_zones(), &[a, b]);
    assert_eq!(queue, vec![near_door, in_b]);
    assert!(!view.is_object_visible(in_a));
    assert_eq!(toward.portal_depth(), 0);
    assert_eq!(toward.extra_plane_count(), 0);
}

#[test]
fn test_integration_closing_door_hides_next_room() {
    let House { mut manager, b, door, .. } = house();
    let in_b = manager.create_object(crate_at("bed", Vec3::new(150.0, 50.0, 50.0), 2.0), None).unwrap();
    manager.update().unwrap();

    manager.portal_mut(door).unwrap().set_open(false);
    manager.update().unwrap();

    let mut toward = camera(Vec3::splat(50.0), Vec3::new(100.0, 50.0, 50.0), 120.0);
    let mut queue: Vec<ObjectKey> = Vec::new();
    let view = manager.find_visible_objects(&mut toward, &mut queue).unwrap();
    assert!(!view.is_zone_visible(b));
    assert!(queue.is_empty());

    manager.portal_mut(door).unwrap().set_open(true);
    let view = manager.find_visible_objects(&mut toward, &mut queue).unwrap();
    assert_eq!(queue, vec![in_b]);
    assert!(view.is_zone_visible(b));
}

#[test]
fn test_integration_light_follows_visibility() {
    let House { mut manager, a, b, .. } = house();
    let lamp = manager.create_light(Light::point("lamp", Vec3::new(150.0, 50.0, 50.0), 80.0));
    manager.update().unwrap();
    assert_eq!(manager.light(lamp).unwrap().affected_zones(), &[b, a]);

    // Camera in A looking away still sees a zone the lamp reaches
    let mut away = camera(Vec3::splat(50.0), Vec3::new(0.0, 50.0, 50.0), 60.0);
    let mut queue: Vec<ObjectKey> = Vec::new();
    manager.find_visible_objects(&mut away, &mut queue).unwrap();
    manager.update().unwrap();
    assert_eq!(manager.visible_lights().collect::<Vec<_>>(), vec![lamp]);

    // Pulled back out of range of the doorway
    manager.light_mut(lamp).unwrap().set_position(Vec3::new(190.0, 50.0, 50.0));
    manager.light_mut(lamp).unwrap().set_attenuation_range(20.0);
    manager.update().unwrap();
    assert_eq!(manager.light(lamp).unwrap().affected_zones(), &[b]);
    assert_eq!(manager.visible_lights().count(), 0);
}

#[test]
fn test_integration_query_across_door() {
    let House { mut manager, a, .. } = house();
    let left = manager.create_object(crate_at("left", Vec3::new(96.0, 50.0, 50.0), 2.0), None).unwrap();
    let right = manager.create_object(crate_at("right", Vec3::new(104.0, 50.0, 50.0), 2.0), None).unwrap();
    manager.update().unwrap();

    let probe = BoundingShape::Sphere(Sphere::new(Vec3::new(100.0, 50.0, 50.0), 6.0));
    let found = manager.find_objects_in(&probe, Some(a), None).unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.contains(&left));
    assert!(found.contains(&right));
}

// ============================================================================
// CYCLIC GRAPHS
// ============================================================================

#[test]
fn test_integration_portal_ring_terminates() {
    let mut manager = PczSceneManager::new(PczConfig::default()).unwrap();
    let bounds = AABB::new(Vec3::ZERO, Vec3::splat(100.0));
    let zones: Vec<ZoneKey> = ["ring0", "ring1", "ring2"]
        .iter()
        .map(|name| manager.create_zone(ZoneDesc::new(*name, bounds)).unwrap())
        .collect();

    // ring0 -> ring1 -> ring2 -> ring0, all through the same spot in view
    for i in 0..3 {
        let portal = Portal::sphere(
            format!("gate{}", i),
            Vec3::new(80.0, 50.0, 50.0),
            Vec3::new(85.0, 50.0, 50.0),
            VolumeFacing::Entry,
        );
        let key = manager.create_portal(zones[i], portal).unwrap();
        manager.portal_mut(key).unwrap().set_target_zone(Some(zones[(i + 1) % 3]));
    }

    let objects: Vec<ObjectKey> = zones
        .iter()
        .map(|zone| manager.create_object(crate_at("statue", Vec3::new(70.0, 50.0, 50.0), 2.0), Some(*zone)).unwrap())
        .collect();

    let mut cam = camera(Vec3::splat(50.0), Vec3::new(100.0, 50.0, 50.0), 120.0);
    cam.set_home_zone(Some(zones[0]));
    let mut queue: Vec<ObjectKey> = Vec::new();
    let view = manager.find_visible_objects(&mut cam, &mut queue).unwrap();

    assert_eq!(view.visible_zones(), zones.as_slice());
    assert_eq!(queue, objects);
    assert_eq!(cam.portal_depth(), 0);
}

#[test]
fn test_integration_mirror_portal_terminates() {
    let House { mut manager, a, .. } = house();
    let mirror = manager
        .create_portal(
            a,
            Portal::quad(
                "mirror",
                [
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(0.0, 100.0, 0.0),
                    Vec3::new(0.0, 100.0, 100.0),
                    Vec3::new(0.0, 0.0, 100.0),
                ],
            ),
        )
        .unwrap();
    manager.portal_mut(mirror).unwrap().set_target_zone(Some(a));

    let statue = manager.create_object(crate_at("statue", Vec3::new(20.0, 50.0, 50.0), 2.0), None).unwrap();
    let mut cam = camera(Vec3::splat(50.0), Vec3::new(0.0, 50.0, 50.0), 60.0);
    let mut queue: Vec<ObjectKey> = Vec::new();
    let view = manager.find_visible_objects(&mut cam, &mut queue).unwrap();

    assert_eq!(view.visible_zones(), &[a]);
    assert_eq!(queue, vec![statue]);
    assert_eq!(cam.portal_depth(), 0);
}
