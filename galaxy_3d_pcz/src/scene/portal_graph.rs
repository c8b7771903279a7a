/// ZoneGraph — zones connected by portals, and every recursive walk over them.
///
/// Zones and portals live in two slot maps so a traversal can hold a portal
/// (read) while mutating zones or scene objects. Objects and lights are
/// stored by the scene manager and passed in.
///
/// All recursions are bounded:
/// - re-homing only recurses into a zone different from both the current
///   zone and the object's home, and every step changes the home zone
/// - camera and light re-homing never re-enters a zone already on its path
/// - visiting-zone propagation never re-enters a zone the object already visits
/// - the camera flood never crosses a portal already on the current path
/// - the light flood never re-enters a zone the light already affects
/// - spatial queries never cross a portal twice

use glam::Vec3;
use slotmap::SlotMap;
use crate::bounds::BoundingShape;
use crate::camera::{PczCamera, PortalFrustum};
use crate::error::Galaxy3dResult;
use crate::{engine_debug, engine_err, engine_info, engine_trace};
use super::light::{Light, LightKind};
use super::portal::{Portal, PortalIntersection, PortalKey, PortalKind};
use super::scene_object::{ObjectKey, SceneObject};
use super::zone::{Zone, ZoneKey};

#[derive(Debug, Default)]
pub struct ZoneGraph {
    pub(crate) zones: SlotMap<ZoneKey, Zone>,
    pub(crate) portals: SlotMap<PortalKey, Portal>,
}

/// Target zone of a portal reached by a traversal.
fn portal_target(key: PortalKey, portal: &Portal) -> Galaxy3dResult<ZoneKey> {
    portal.target_zone().ok_or_else(|| {
        engine_err!("galaxy3d::PortalGraph", "Portal '{}' ({:?}) has no target zone", portal.name(), key)
    })
}

impl ZoneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== ACCESS =====

    pub fn zones(&self) -> &SlotMap<ZoneKey, Zone> {
        &self.zones
    }

    pub fn portals(&self) -> &SlotMap<PortalKey, Portal> {
        &self.portals
    }

    pub fn zone(&self, key: ZoneKey) -> Galaxy3dResult<&Zone> {
        self.zones
            .get(key)
            .ok_or_else(|| engine_err!("galaxy3d::PortalGraph", InvalidKey => "Zone {:?} does not exist", key))
    }

    pub fn zone_mut(&mut self, key: ZoneKey) -> Galaxy3dResult<&mut Zone> {
        self.zones
            .get_mut(key)
            .ok_or_else(|| engine_err!("galaxy3d::PortalGraph", InvalidKey => "Zone {:?} does not exist", key))
    }

    pub fn portal(&self, key: PortalKey) -> Galaxy3dResult<&Portal> {
        self.portals
            .get(key)
            .ok_or_else(|| engine_err!("galaxy3d::PortalGraph", InvalidKey => "Portal {:?} does not exist", key))
    }

    pub fn portal_mut(&mut self, key: PortalKey) -> Galaxy3dResult<&mut Portal> {
        self.portals
            .get_mut(key)
            .ok_or_else(|| engine_err!("galaxy3d::PortalGraph", InvalidKey => "Portal {:?} does not exist", key))
    }

    /// Smallest zone whose bounds contain `point`, `fallback` when none does.
    pub fn zone_for_point(&self, point: Vec3, fallback: ZoneKey) -> ZoneKey {
        self.zones
            .iter()
            .filter(|(_, zone)| zone.bounds().contains_point(point))
            .min_by(|(_, a), (_, b)| a.bounds().volume().total_cmp(&b.bounds().volume()))
            .map_or(fallback, |(key, _)| key)
    }

    // ===== OBJECT RE-HOMING =====

    /// Follow the portals an object crossed, starting in `zone`.
    ///
    /// The object's home zone is updated at every crossing. Returns the
    /// final home zone.
    pub fn update_object_home_zone(
        &self,
        zone: ZoneKey,
        key: ObjectKey,
        objects: &mut SlotMap<ObjectKey, SceneObject>,
        allow_back_touches: bool,
    ) -> Galaxy3dResult<Option<ZoneKey>> {
        let zone_ref = self.zone(zone)?;
        let mut new_home = objects
            .get(key)
            .ok_or_else(|| engine_err!("galaxy3d::PortalGraph", InvalidKey => "Object {:?} does not exist", key))?
            .home_zone();

        for &portal_key in zone_ref.portals() {
            let Some(portal) = self.portals.get(portal_key) else {
                continue;
            };
            let Some(object) = objects.get(key) else {
                break;
            };

            let next_allow_back = match portal.intersects_object(object) {
                PortalIntersection::IntersectCross => true,
                PortalIntersection::IntersectBackNoCross if allow_back_touches => false,
                _ => continue,
            };

            let target = portal_target(portal_key, portal)?;
            if target == zone || Some(target) == object.home_zone() {
                continue;
            }

            engine_trace!("galaxy3d::PortalGraph", "Object {:?} crossed portal '{}'", key, portal.name());
            if let Some(object) = objects.get_mut(key) {
                object.set_home_zone(Some(target));
            }
            new_home = self.update_object_home_zone(target, key, objects, next_allow_back)?;
        }

        Ok(new_home)
    }

    /// Register the object as a visitor of every zone whose portal it touches,
    /// recursing through those zones.
    ///
    /// The zone's enclosure object and objects without `ALLOW_TO_VISIT` are skipped.
    pub fn check_object_against_portals(
        &mut self,
        zone: ZoneKey,
        key: ObjectKey,
        objects: &mut SlotMap<ObjectKey, SceneObject>,
        ignore_portal: Option<PortalKey>,
    ) -> Galaxy3dResult<()> {
        let zone_ref = self.zone(zone)?;
        if zone_ref.enclosure_object() == Some(key) {
            return Ok(());
        }
        match objects.get(key) {
            Some(object) if object.allows_visiting() => {}
            _ => return Ok(()),
        }

        let portal_keys = zone_ref.portals().to_vec();
        for portal_key in portal_keys {
            if Some(portal_key) == ignore_portal {
                continue;
            }
            let Some(portal) = self.portals.get(portal_key) else {
                continue;
            };
            let Some(object) = objects.get_mut(key) else {
                break;
            };
            if portal.intersects_object(object) == PortalIntersection::NoIntersect {
                continue;
            }

            let target = portal_target(portal_key, portal)?;
            let twin = portal.target_portal();
            if Some(target) == object.home_zone() || object.is_visiting(target) {
                continue;
            }

            object.add_visiting_zone(target);
            self.zone_mut(target)?.add_object(key, object);
            self.check_object_against_portals(target, key, objects, twin)?;
        }

        Ok(())
    }

    /// Follow the portals a point crossed moving from `previous` to
    /// `position`, starting in `zone`. Returns the zone it ends up in.
    ///
    /// Used for cameras and lights, which have no bounds of their own.
    pub fn update_point_home_zone(&self, zone: ZoneKey, previous: Vec3, position: Vec3) -> Galaxy3dResult<ZoneKey> {
        let mut path = vec![zone];
        self.follow_point_crossings(zone, previous, position, &mut path)?;
        Ok(path.last().copied().unwrap_or(zone))
    }

    fn follow_point_crossings(
        &self,
        zone: ZoneKey,
        previous: Vec3,
        position: Vec3,
        path: &mut Vec<ZoneKey>,
    ) -> Galaxy3dResult<()> {
        for &portal_key in self.zone(zone)?.portals() {
            let Some(portal) = self.portals.get(portal_key) else {
                continue;
            };
            if !portal.crossed_by(previous, position) {
                continue;
            }

            let target = portal_target(portal_key, portal)?;
            if path.contains(&target) {
                continue;
            }

            engine_trace!("galaxy3d::PortalGraph", "Point crossed portal '{}'", portal.name());
            path.push(target);
            return self.follow_point_crossings(target, previous, position, path);
        }
        Ok(())
    }

    // ===== CAMERA VISIBILITY FLOOD =====

    /// Collect objects visible from `camera`, starting in `zone` and recursing
    /// through every visible portal.
    ///
    /// Each reached zone is appended once to `visible_zones`; objects are
    /// de-duplicated by their `(frame, camera)` stamp.
    pub fn find_visible_objects(
        &mut self,
        zone: ZoneKey,
        camera: &mut PczCamera,
        objects: &mut SlotMap<ObjectKey, SceneObject>,
        frame: u64,
        visible: &mut Vec<ObjectKey>,
        visible_zones: &mut Vec<ZoneKey>,
    ) -> Galaxy3dResult<()> {
        flood_visible(&mut self.zones, &self.portals, zone, camera, objects, frame, visible, visible_zones)
    }

    // ===== SPATIAL QUERIES =====

    /// Objects touching `shape` in `zone`, optionally following portals the
    /// shape intersects. `visited_portals` records crossed portals.
    ///
    /// Results may contain the same object twice when it is visible from
    /// several zones.
    #[allow(clippy::too_many_arguments)]
    pub fn find_objects(
        &self,
        zone: ZoneKey,
        shape: &BoundingShape,
        objects: &SlotMap<ObjectKey, SceneObject>,
        visited_portals: &mut Vec<PortalKey>,
        include_visitors: bool,
        recurse_through_portals: bool,
        exclude: Option<ObjectKey>,
        results: &mut Vec<ObjectKey>,
    ) -> Galaxy3dResult<()> {
        let zone_ref = self.zone(zone)?;

        if let Some(enclosure) = zone_ref.enclosure_object() {
            let outside = objects
                .get(enclosure)
                .and_then(SceneObject::world_aabb)
                .is_some_and(|aabb| !shape.touches(&aabb));
            if outside {
                return Ok(());
            }
        }

        zone_ref.find_local_objects(shape, objects, include_visitors, exclude, results);

        if !recurse_through_portals {
            return Ok(());
        }

        for &portal_key in zone_ref.portals() {
            if visited_portals.contains(&portal_key) {
                continue;
            }
            let Some(portal) = self.portals.get(portal_key) else {
                continue;
            };
            if !portal.intersects_shape(shape) {
                continue;
            }

            visited_portals.push(portal_key);
            let target = portal_target(portal_key, portal)?;
            self.find_objects(
                target,
                shape,
                objects,
                visited_portals,
                include_visitors,
                recurse_through_portals,
                exclude,
                results,
            )?;
        }

        Ok(())
    }

    // ===== LIGHT FLOOD =====

    /// Rebuild the affected-zone list of `light`, starting in `home_zone`.
    ///
    /// `frame` is the frame of the last visibility flood; reaching a zone
    /// stamped with it marks the light as affecting a visible zone.
    pub fn update_light_zones(&self, light: &mut Light, home_zone: ZoneKey, frame: u64) -> Galaxy3dResult<()> {
        light.clear_affected_zones();

        let home = self.zone(home_zone)?;
        light.add_affected_zone(home_zone);
        if home.last_visible_frame() == frame {
            light.set_affects_visible_zone();
        }

        let mut frustum = PortalFrustum::new(light.position());
        self.flood_light(home_zone, light, frame, &mut frustum, None)?;

        engine_trace!("galaxy3d::PortalGraph", "Light '{}' affects {} zone(s)",
            light.name(), light.affected_zones().len());
        Ok(())
    }

    /// Spread `light` through every portal of `zone` that it reaches.
    pub fn flood_light(
        &self,
        zone: ZoneKey,
        light: &mut Light,
        frame: u64,
        frustum: &mut PortalFrustum,
        ignore_portal: Option<PortalKey>,
    ) -> Galaxy3dResult<()> {
        let zone_ref = self.zone(zone)?;

        for &portal_key in zone_ref.portals() {
            if Some(portal_key) == ignore_portal {
                continue;
            }
            let Some(portal) = self.portals.get(portal_key) else {
                continue;
            };
            if !frustum.is_portal_visible(portal_key, portal) {
                continue;
            }

            let light_to_portal = portal.derived_center() - light.position();
            let reached = match light.kind() {
                LightKind::Point | LightKind::Spot => light_to_portal.length() <= light.attenuation_range(),
                LightKind::Directional => light_to_portal.dot(light.direction()) >= 0.0,
            };
            if !reached {
                continue;
            }
            // Quads must face the light
            if portal.kind() == PortalKind::Quad && light_to_portal.dot(portal.derived_direction()) >= 0.0 {
                continue;
            }

            let target = portal_target(portal_key, portal)?;
            if light.affects_zone(target) {
                continue;
            }

            light.add_affected_zone(target);
            if self.zone(target)?.last_visible_frame() == frame {
                light.set_affects_visible_zone();
            }

            frustum.add_portal_planes(portal_key, portal);
            let result = self.flood_light(target, light, frame, frustum, portal.target_portal());
            frustum.remove_portal_planes(portal_key);
            result?;
        }

        Ok(())
    }

    // ===== PORTAL UPDATE =====

    /// Recompute every portal's world values, flagging zones whose portals moved.
    pub fn update_portal_derived_values(&mut self) {
        for portal in self.portals.values_mut() {
            portal.update_derived_values();
            if !portal.moved() {
                continue;
            }
            if let Some(zone) = portal.home_zone().and_then(|home| self.zones.get_mut(home)) {
                zone.set_portals_updated(true);
            }
        }
    }

    /// Move portals that crossed a bigger portal of their zone into that
    /// portal's target zone, and retarget portals that crossed a bigger
    /// portal of their target zone.
    pub fn update_portals_zone_data(&mut self) -> Galaxy3dResult<()> {
        let zone_keys: Vec<ZoneKey> = self.zones.keys().collect();

        for zone_key in zone_keys {
            let portal_keys = self.zone(zone_key)?.portals().to_vec();
            let mut pending_homes = Vec::new();
            let mut retargets = Vec::new();

            for &portal_key in &portal_keys {
                let Some(portal) = self.portals.get(portal_key) else {
                    continue;
                };
                let radius = portal.derived_radius();

                // Bigger portals of the same zone leading elsewhere
                for &other_key in &portal_keys {
                    let Some(other) = self.portals.get(other_key) else {
                        continue;
                    };
                    if radius < other.derived_radius()
                        && other.target_zone() != Some(zone_key)
                        && portal.crossed_portal(other)
                    {
                        pending_homes.push((portal_key, other.target_zone()));
                        break;
                    }
                }

                // Bigger portals of the target zone
                let Some(target) = portal.target_zone().filter(|target| *target != zone_key) else {
                    continue;
                };
                let Some(target_zone) = self.zones.get(target) else {
                    continue;
                };
                for &other_key in target_zone.portals() {
                    let Some(other) = self.portals.get(other_key) else {
                        continue;
                    };
                    if radius < other.derived_radius()
                        && portal.crossed_portal(other)
                        && portal.home_zone() != other.target_zone()
                    {
                        retargets.push((portal_key, other.target_zone()));
                        break;
                    }
                }
            }

            for (portal_key, target) in retargets {
                let portal = self.portal_mut(portal_key)?;
                engine_debug!("galaxy3d::PortalGraph", "Portal '{}' now targets {:?}", portal.name(), target);
                portal.set_target_zone(target);
            }

            for (portal_key, new_home) in pending_homes {
                self.portal_mut(portal_key)?.set_new_home_zone(new_home);
            }
            for portal_key in portal_keys {
                if let Some(new_home) = self.portal(portal_key)?.new_home_zone() {
                    self.transfer_portal(portal_key, zone_key, new_home)?;
                }
            }
        }

        Ok(())
    }

    /// Move a portal from one zone's portal list to another's.
    fn transfer_portal(&mut self, portal_key: PortalKey, from: ZoneKey, to: ZoneKey) -> Galaxy3dResult<()> {
        self.zone_mut(from)?.remove_portal(portal_key);
        self.zone_mut(to)?.add_portal(portal_key);

        let portal = self.portal_mut(portal_key)?;
        portal.set_home_zone(Some(to));
        portal.set_new_home_zone(None);
        engine_debug!("galaxy3d::PortalGraph", "Portal '{}' transferred to zone {:?}", portal.name(), to);
        Ok(())
    }

    // ===== PORTAL CONNECTION =====

    /// Link every portal without a target to a matching portal of another zone.
    ///
    /// Two portals match when both lack a target, are `close_to` each other
    /// and face opposite ways. Returns the number of links made.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when a portal has no match.
    pub fn connect_portals_by_location(&mut self) -> Galaxy3dResult<usize> {
        let mut linked = 0;
        let zone_keys: Vec<ZoneKey> = self.zones.keys().collect();

        for &zone_key in &zone_keys {
            let portal_keys = self.zone(zone_key)?.portals().to_vec();

            for portal_key in portal_keys {
                let portal = self.portal(portal_key)?;
                if portal.target_zone().is_some() {
                    continue;
                }

                let matched = zone_keys
                    .iter()
                    .filter(|other_zone| **other_zone != zone_key)
                    .find_map(|other_zone| {
                        let candidates = self.zones.get(*other_zone)?.portals();
                        candidates.iter().copied().find(|candidate_key| {
                            self.portals.get(*candidate_key).is_some_and(|candidate| {
                                candidate.target_zone().is_none()
                                    && portal.close_to(candidate)
                                    && portal.derived_direction().dot(candidate.derived_direction()) < -0.9
                            })
                        })
                        .map(|candidate_key| (*other_zone, candidate_key))
                    });

                let Some((other_zone, other_key)) = matched else {
                    return Err(engine_err!("galaxy3d::PortalGraph", InvalidConfiguration =>
                        "Could not find matching portal for portal '{}'", portal.name()));
                };

                let other_name = self.portal(other_key)?.name().to_string();
                engine_info!("galaxy3d::PortalGraph", "Connecting portal {} to portal {}", portal.name(), other_name);

                let portal = self.portal_mut(portal_key)?;
                portal.set_target_zone(Some(other_zone));
                portal.set_target_portal(Some(other_key));
                let other = self.portal_mut(other_key)?;
                other.set_target_zone(Some(zone_key));
                other.set_target_portal(Some(portal_key));
                linked += 1;
            }
        }

        Ok(linked)
    }
}

#[allow(clippy::too_many_arguments)]
fn flood_visible(
    zones: &mut SlotMap<ZoneKey, Zone>,
    portals: &SlotMap<PortalKey, Portal>,
    zone: ZoneKey,
    camera: &mut PczCamera,
    objects: &mut SlotMap<ObjectKey, SceneObject>,
    frame: u64,
    visible: &mut Vec<ObjectKey>,
    visible_zones: &mut Vec<ZoneKey>,
) -> Galaxy3dResult<()> {
    let zone_ref = zones
        .get(zone)
        .ok_or_else(|| engine_err!("galaxy3d::PortalGraph", InvalidKey => "Zone {:?} does not exist", zone))?;

    if !visible_zones.contains(&zone) {
        visible_zones.push(zone);
    }
    if zone_ref.is_empty() {
        return Ok(());
    }

    zone_ref.octree().walk_visible(camera, objects, frame, visible);

    // Nearest portals first
    let eye = camera.position();
    let mut visible_portals: Vec<PortalKey> = zone_ref
        .portals()
        .iter()
        .copied()
        .filter(|key| portals.get(*key).is_some_and(|portal| camera.is_portal_visible(*key, portal)))
        .collect();
    visible_portals.sort_by(|a, b| {
        let da = portals[*a].derived_center().distance_squared(eye);
        let db = portals[*b].derived_center().distance_squared(eye);
        da.total_cmp(&db)
    });

    for portal_key in visible_portals {
        let portal = &portals[portal_key];
        let target = portal_target(portal_key, portal)?;

        zones
            .get_mut(target)
            .ok_or_else(|| engine_err!("galaxy3d::PortalGraph",
                "Portal '{}' targets destroyed zone {:?}", portal.name(), target))?
            .mark_visible(frame, camera.id());

        engine_trace!("galaxy3d::PortalGraph", "Camera {} enters zone {:?} through '{}'",
            camera.id(), target, portal.name());

        camera.with_portal_planes(portal_key, portal, |camera| {
            flood_visible(zones, portals, target, camera, objects, frame, visible, visible_zones)
        })?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "portal_graph_tests.rs"]
mod tests;
