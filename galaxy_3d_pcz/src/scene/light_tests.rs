use glam::Vec3;
use slotmap::SlotMap;
use super::*;

fn zone_keys(count: usize) -> Vec<ZoneKey> {
    let mut zones: SlotMap<ZoneKey, ()> = SlotMap::with_key();
    (0..count).map(|_| zones.insert(())).collect()
}

// ============================================================================
// Tests: Construction
// ============================================================================

#[test]
fn test_point_light() {
    let light = Light::point("bulb", Vec3::new(1.0, 2.0, 3.0), 25.0);
    assert_eq!(light.kind(), LightKind::Point);
    assert_eq!(light.position(), Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(light.attenuation_range(), 25.0);
    assert!(light.needs_update());
    assert!(light.affected_zones().is_empty());
}

#[test]
fn test_spot_and_directional_normalize_direction() {
    let spot = Light::spot("torch", Vec3::ZERO, Vec3::new(0.0, 0.0, -4.0), 10.0);
    assert_eq!(spot.direction(), Vec3::NEG_Z);

    let sun = Light::directional("sun", Vec3::new(0.0, -2.0, 0.0));
    assert_eq!(sun.kind(), LightKind::Directional);
    assert_eq!(sun.direction(), Vec3::NEG_Y);
    assert!(sun.attenuation_range().is_infinite());
}

// ============================================================================
// Tests: Update Tracking
// ============================================================================

#[test]
fn test_moved_flag_drives_needs_update() {
    let mut light = Light::point("bulb", Vec3::ZERO, 10.0);
    light.refresh_needs_update(|_| false);
    assert!(light.needs_update());

    // Move consumed by the flood
    light.set_needs_update(false);
    light.refresh_needs_update(|_| false);
    assert!(!light.needs_update());

    // Same value is not a move
    light.set_position(Vec3::ZERO);
    light.refresh_needs_update(|_| false);
    assert!(!light.needs_update());

    light.set_attenuation_range(20.0);
    light.refresh_needs_update(|_| false);
    assert!(light.needs_update());
}

#[test]
fn test_portal_change_in_affected_zone_drives_needs_update() {
    let zones = zone_keys(2);
    let mut light = Light::point("bulb", Vec3::ZERO, 10.0);
    light.add_affected_zone(zones[0]);
    light.refresh_needs_update(|_| false);
    light.set_needs_update(false);

    light.refresh_needs_update(|zone| zone == zones[1]);
    assert!(!light.needs_update());

    light.refresh_needs_update(|zone| zone == zones[0]);
    assert!(light.needs_update());
}

#[test]
fn test_forced_update_survives_refresh() {
    let mut light = Light::point("bulb", Vec3::ZERO, 10.0);
    light.refresh_needs_update(|_| false);
    light.set_needs_update(false);

    light.set_needs_update(true);
    light.refresh_needs_update(|_| false);
    assert!(light.needs_update());
}

#[test]
fn test_crossing_moves_home_without_flagging_a_move() {
    let zones = zone_keys(1);
    let mut light = Light::point("bulb", Vec3::ZERO, 10.0);
    light.refresh_needs_update(|_| false);
    light.set_needs_update(false);

    light.set_position(Vec3::X);
    assert_eq!(light.previous_position(), Vec3::ZERO);
    light.refresh_needs_update(|_| false);
    light.move_home_zone(zones[0]);
    light.save_previous_position();
    light.set_needs_update(false);

    assert_eq!(light.home_zone(), Some(zones[0]));
    assert_eq!(light.previous_position(), Vec3::X);
    light.refresh_needs_update(|_| false);
    assert!(!light.needs_update());
}

// ============================================================================
// Tests: Affected Zones
// ============================================================================

#[test]
fn test_affected_zone_bookkeeping() {
    let zones = zone_keys(3);
    let mut light = Light::point("bulb", Vec3::ZERO, 10.0);

    light.add_affected_zone(zones[0]);
    light.add_affected_zone(zones[1]);
    light.add_affected_zone(zones[0]);
    assert_eq!(light.affected_zones(), &[zones[0], zones[1]]);
    assert!(light.affects_zone(zones[1]));
    assert!(!light.affects_zone(zones[2]));

    light.remove_affected_zone(zones[0]);
    assert_eq!(light.affected_zones(), &[zones[1]]);

    light.set_affects_visible_zone();
    assert!(light.affects_visible_zone());
    light.clear_affected_zones();
    assert!(light.affected_zones().is_empty());
    assert!(!light.affects_visible_zone());
}

#[test]
fn test_refresh_affects_visible_zone() {
    let zones = zone_keys(2);
    let mut light = Light::point("bulb", Vec3::ZERO, 10.0);
    light.add_affected_zone(zones[0]);

    light.refresh_affects_visible_zone(|zone| zone == zones[0]);
    assert!(light.affects_visible_zone());

    light.refresh_affects_visible_zone(|zone| zone == zones[1]);
    assert!(!light.affects_visible_zone());
}
