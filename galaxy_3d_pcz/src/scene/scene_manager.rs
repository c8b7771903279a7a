//! PczSceneManager — owner of every zone, portal, scene object and light.
//!
//! The manager is the only entry point that mutates zone membership. A frame
//! is driven by the caller in two steps:
//!
//! 1. `update()`: portals refresh their world values and change zone when
//!    they crossed a bigger portal, moved objects are re-homed and placed in
//!    the octrees, visitors are re-registered, lights flood their zones and
//!    enclosed zones follow their enclosure object.
//! 2. `find_visible_objects()` once per camera: the recursive zone flood
//!    starting in the camera's zone; accepted objects go to the caller's
//!    render queue.
//!
//! Cameras are not owned by the manager, the caller drives them. A camera
//! without a home zone is located on every call in the smallest zone
//! containing its eye. A camera with one follows the portals its eye
//! crossed since its previous pass, and so does a light pinned to a zone.

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use crate::bounds::{BoundingShape, AABB};
use crate::camera::{PczCamera, RenderView};
use crate::error::Galaxy3dResult;
use crate::{engine_bail, engine_debug, engine_err, engine_info, engine_trace, engine_warn};
use super::light::{Light, LightKey};
use super::portal::{Portal, PortalKey};
use super::portal_graph::ZoneGraph;
use super::render_queue::RenderQueue;
use super::scene_object::{ObjectFlags, ObjectKey, SceneObject};
use super::zone::{Zone, ZoneDesc, ZoneKey, DEFAULT_MAX_DEPTH};

/// Name of the zone created with every scene manager.
pub const DEFAULT_ZONE_NAME: &str = "Default_Zone";

/// Scene manager construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PczConfig {
    /// Bounds of the default zone
    pub default_zone_bounds: AABB,
    /// Octree depth of the default zone
    pub max_depth: u32,
}

impl Default for PczConfig {
    fn default() -> Self {
        Self {
            default_zone_bounds: AABB::new(Vec3::splat(-10000.0), Vec3::splat(10000.0)),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

pub struct PczSceneManager {
    config: PczConfig,
    /// Zones and portals
    graph: ZoneGraph,
    objects: SlotMap<ObjectKey, SceneObject>,
    lights: SlotMap<LightKey, Light>,
    zone_names: FxHashMap<String, ZoneKey>,
    default_zone: ZoneKey,
    /// Stamp of the current visibility pass
    frame: u64,
    /// Cameras already flooded with the current stamp
    flooded_cameras: FxHashSet<u64>,
}

impl PczSceneManager {
    /// Create a scene manager holding only the default zone.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the default zone bounds or depth are invalid.
    pub fn new(config: PczConfig) -> Galaxy3dResult<Self> {
        let mut graph = ZoneGraph::new();
        let desc = ZoneDesc::new(DEFAULT_ZONE_NAME, config.default_zone_bounds)
            .with_max_depth(config.max_depth);
        let default_zone = graph.zones.try_insert_with_key(|key| Zone::new(key, desc))?;

        let mut zone_names = FxHashMap::default();
        zone_names.insert(DEFAULT_ZONE_NAME.to_string(), default_zone);

        engine_info!("galaxy3d::PczSceneManager", "Scene manager created");

        Ok(Self {
            config,
            graph,
            objects: SlotMap::with_key(),
            lights: SlotMap::with_key(),
            zone_names,
            default_zone,
            frame: 1,
            flooded_cameras: FxHashSet::default(),
        })
    }

    // ===== GETTERS =====

    pub fn config(&self) -> &PczConfig {
        &self.config
    }

    /// Stamp given to the next visibility pass.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn default_zone(&self) -> ZoneKey {
        self.default_zone
    }

    /// Zones and portals, read-only.
    pub fn graph(&self) -> &ZoneGraph {
        &self.graph
    }

    // ===== ZONES =====

    /// Create a zone. Names are unique.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` for a taken name, `InvalidConfiguration` for bad bounds or depth.
    pub fn create_zone(&mut self, desc: ZoneDesc) -> Galaxy3dResult<ZoneKey> {
        if self.zone_names.contains_key(&desc.name) {
            engine_bail!("galaxy3d::PczSceneManager", AlreadyExists =>
                "Zone '{}' already exists", desc.name);
        }

        let name = desc.name.clone();
        let key = self.graph.zones.try_insert_with_key(|key| Zone::new(key, desc))?;
        self.zone_names.insert(name, key);
        Ok(key)
    }

    /// Destroy a zone and every portal it owns.
    ///
    /// Home objects fall back to the default zone. Portals leading into the
    /// zone lose their target and are closed. Lights forget the zone and are
    /// flooded again on the next `update()`.
    ///
    /// # Errors
    ///
    /// `InvalidKey` for an unknown zone, `InvalidConfiguration` for the default zone.
    pub fn destroy_zone(&mut self, key: ZoneKey) -> Galaxy3dResult<()> {
        if key == self.default_zone {
            engine_bail!("galaxy3d::PczSceneManager", InvalidConfiguration =>
                "The default zone cannot be destroyed");
        }
        let zone = self.graph.zones.remove(key).ok_or_else(|| {
            engine_err!("galaxy3d::PczSceneManager", InvalidKey => "Zone {:?} does not exist", key)
        })?;
        self.zone_names.remove(zone.name());

        for portal in zone.portals().to_vec() {
            self.destroy_portal(portal)?;
        }
        let mut cut_off = Vec::new();
        for portal in self.graph.portals.values_mut() {
            if portal.target_zone() == Some(key) {
                portal.set_target_zone(None);
                portal.set_target_portal(None);
                portal.set_open(false);
                cut_off.extend(portal.home_zone());
            }
        }
        for zone in cut_off {
            if let Some(zone) = self.graph.zones.get_mut(zone) {
                zone.set_portals_updated(true);
            }
        }

        let default_zone = self.default_zone;
        for (object_key, object) in self.objects.iter_mut() {
            object.remove_visiting_zone(key);
            if object.home_zone() == Some(key) {
                object.set_home_zone(Some(default_zone));
                self.graph.zone_mut(default_zone)?.add_object(object_key, object);
            }
        }
        for light in self.lights.values_mut() {
            if light.home_zone() == Some(key) {
                light.set_home_zone(None);
            }
            light.remove_affected_zone(key);
            light.set_needs_update(true);
        }

        engine_debug!("galaxy3d::PczSceneManager", "Destroyed zone '{}'", zone.name());
        Ok(())
    }

    pub fn zone(&self, key: ZoneKey) -> Option<&Zone> {
        self.graph.zones.get(key)
    }

    pub fn zone_by_name(&self, name: &str) -> Option<ZoneKey> {
        self.zone_names.get(name).copied()
    }

    pub fn zone_count(&self) -> usize {
        self.graph.zones.len()
    }

    pub fn zone_keys(&self) -> impl Iterator<Item = ZoneKey> + '_ {
        self.graph.zones.keys()
    }

    pub fn set_zone_has_sky(&mut self, key: ZoneKey, has_sky: bool) -> Galaxy3dResult<()> {
        self.graph.zone_mut(key)?.set_has_sky(has_sky);
        Ok(())
    }

    /// Replace the zone's octree with one covering `bounds`.
    pub fn resize_zone(&mut self, key: ZoneKey, bounds: AABB) -> Galaxy3dResult<()> {
        let zone = self.graph.zones.get_mut(key).ok_or_else(|| {
            engine_err!("galaxy3d::PczSceneManager", InvalidKey => "Zone {:?} does not exist", key)
        })?;
        zone.resize(bounds, &self.objects)
    }

    /// Rebuild the zone's octree with a new depth.
    pub fn set_zone_max_depth(&mut self, key: ZoneKey, max_depth: u32) -> Galaxy3dResult<()> {
        let zone = self.graph.zones.get_mut(key).ok_or_else(|| {
            engine_err!("galaxy3d::PczSceneManager", InvalidKey => "Zone {:?} does not exist", key)
        })?;
        zone.set_max_depth(max_depth, &self.objects)
    }

    /// Make `object` the enclosure of `zone`.
    ///
    /// The object is anchored to the zone, and the zone is resized to the
    /// object's world bounds now and whenever they change.
    pub fn set_enclosure_object(&mut self, zone: ZoneKey, object: ObjectKey) -> Galaxy3dResult<()> {
        self.graph.zone(zone)?;
        let enclosure = self.object_ref(object)?;
        let aabb = enclosure.world_aabb();

        self.rehome_object(object, zone)?;
        if let Some(enclosure) = self.objects.get_mut(object) {
            enclosure.set_flag(ObjectFlags::ANCHORED, true);
        }

        let zone_ref = self.graph.zone_mut(zone)?;
        zone_ref.set_enclosure_object(Some(object));
        if let Some(aabb) = aabb {
            zone_ref.resize(aabb, &self.objects)?;
        }
        Ok(())
    }

    /// Smallest zone whose bounds contain `point`, the default zone when none does.
    pub fn find_zone_for_point(&self, point: Vec3) -> ZoneKey {
        self.graph.zone_for_point(point, self.default_zone)
    }

    // ===== PORTALS =====

    /// Add a portal to `zone`. The portal keeps its target settings.
    pub fn create_portal(&mut self, zone: ZoneKey, mut portal: Portal) -> Galaxy3dResult<PortalKey> {
        self.graph.zone(zone)?;
        portal.set_home_zone(Some(zone));
        portal.update_derived_values();

        let key = self.graph.portals.insert(portal);
        self.graph.zone_mut(zone)?.add_portal(key);
        Ok(key)
    }

    /// Remove a portal from its zone. Its twin keeps its target zone but
    /// loses the twin link.
    pub fn destroy_portal(&mut self, key: PortalKey) -> Galaxy3dResult<Portal> {
        let portal = self.graph.portals.remove(key).ok_or_else(|| {
            engine_err!("galaxy3d::PczSceneManager", InvalidKey => "Portal {:?} does not exist", key)
        })?;

        if let Some(zone) = portal.home_zone().and_then(|home| self.graph.zones.get_mut(home)) {
            zone.remove_portal(key);
        }
        if let Some(twin) = portal.target_portal().and_then(|twin| self.graph.portals.get_mut(twin)) {
            twin.set_target_portal(None);
        }
        Ok(portal)
    }

    pub fn portal(&self, key: PortalKey) -> Option<&Portal> {
        self.graph.portals.get(key)
    }

    /// Mutable access for opening, closing and moving a portal.
    pub fn portal_mut(&mut self, key: PortalKey) -> Option<&mut Portal> {
        self.graph.portals.get_mut(key)
    }

    pub fn portal_count(&self) -> usize {
        self.graph.portals.len()
    }

    /// Link two portals as twins leading into each other's home zone.
    pub fn link_portals(&mut self, a: PortalKey, b: PortalKey) -> Galaxy3dResult<()> {
        let home_a = self.graph.portal(a)?.home_zone();
        let home_b = self.graph.portal(b)?.home_zone();

        let portal_a = self.graph.portal_mut(a)?;
        portal_a.set_target_zone(home_b);
        portal_a.set_target_portal(Some(b));
        let portal_b = self.graph.portal_mut(b)?;
        portal_b.set_target_zone(home_a);
        portal_b.set_target_portal(Some(a));
        Ok(())
    }

    /// Link every portal without target to its twin in another zone.
    pub fn connect_portals_by_location(&mut self) -> Galaxy3dResult<usize> {
        self.graph.update_portal_derived_values();
        self.graph.connect_portals_by_location()
    }

    // ===== OBJECTS =====

    /// Add an object to `zone`, or to the smallest zone containing its
    /// position when `None`.
    pub fn create_object(&mut self, mut object: SceneObject, zone: Option<ZoneKey>) -> Galaxy3dResult<ObjectKey> {
        let home = match zone {
            Some(zone) => {
                self.graph.zone(zone)?;
                zone
            }
            None => self.find_zone_for_point(object.position()),
        };

        object.set_home_zone(Some(home));
        object.save_previous_position();

        let key = self.objects.insert(object);
        let zone = self.graph.zone_mut(home)?;
        zone.add_object(key, &self.objects[key]);
        zone.update_object_octant(key, &self.objects[key]);

        engine_trace!("galaxy3d::PczSceneManager", "Object '{}' created in zone '{}'",
            self.objects[key].name(), zone.name());
        Ok(key)
    }

    /// Remove an object from every zone and return it.
    pub fn destroy_object(&mut self, key: ObjectKey) -> Galaxy3dResult<SceneObject> {
        let object = self.objects.remove(key).ok_or_else(|| {
            engine_err!("galaxy3d::PczSceneManager", InvalidKey => "Object {:?} does not exist", key)
        })?;

        for zone in self.graph.zones.values_mut() {
            zone.remove_object(key);
            if zone.enclosure_object() == Some(key) {
                zone.set_enclosure_object(None);
            }
        }
        Ok(object)
    }

    pub fn object(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    /// Mutable access for moving an object. Zone membership follows on the
    /// next `update()`.
    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut SceneObject> {
        self.objects.get_mut(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectKey, &SceneObject)> {
        self.objects.iter()
    }

    fn object_ref(&self, key: ObjectKey) -> Galaxy3dResult<&SceneObject> {
        self.objects.get(key).ok_or_else(|| {
            engine_err!("galaxy3d::PczSceneManager", InvalidKey => "Object {:?} does not exist", key)
        })
    }

    /// Move an object's home to `zone`, fixing both zones' sets.
    fn rehome_object(&mut self, key: ObjectKey, zone: ZoneKey) -> Galaxy3dResult<()> {
        let old_home = self.object_ref(key)?.home_zone();
        if old_home == Some(zone) {
            return Ok(());
        }
        if let Some(old) = old_home.and_then(|old| self.graph.zones.get_mut(old)) {
            old.remove_object(key);
        }

        let object = &mut self.objects[key];
        object.set_home_zone(Some(zone));
        object.remove_visiting_zone(zone);
        let zone_ref = self.graph.zone_mut(zone)?;
        zone_ref.add_object(key, object);
        zone_ref.update_object_octant(key, object);
        Ok(())
    }

    // ===== LIGHTS =====

    pub fn create_light(&mut self, light: Light) -> LightKey {
        self.lights.insert(light)
    }

    pub fn destroy_light(&mut self, key: LightKey) -> Galaxy3dResult<Light> {
        self.lights.remove(key).ok_or_else(|| {
            engine_err!("galaxy3d::PczSceneManager", InvalidKey => "Light {:?} does not exist", key)
        })
    }

    pub fn light(&self, key: LightKey) -> Option<&Light> {
        self.lights.get(key)
    }

    /// Mutable access for moving a light. Its zones are re-flooded on the
    /// next `update()`.
    pub fn light_mut(&mut self, key: LightKey) -> Option<&mut Light> {
        self.lights.get_mut(key)
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Lights reaching a zone seen by the last visibility pass.
    pub fn visible_lights(&self) -> impl Iterator<Item = LightKey> + '_ {
        self.lights
            .iter()
            .filter(|(_, light)| light.affects_visible_zone())
            .map(|(key, _)| key)
    }

    /// Lights whose affected zones include `zone`.
    pub fn lights_affecting_zone(&self, zone: ZoneKey) -> impl Iterator<Item = LightKey> + '_ {
        self.lights
            .iter()
            .filter(move |(_, light)| light.affects_zone(zone))
            .map(|(key, _)| key)
    }

    // ===== FRAME UPDATE =====

    /// Bring zone membership, octrees, lights and zone bounds up to date
    /// with the current portal, object and light state.
    pub fn update(&mut self) -> Galaxy3dResult<()> {
        self.graph.update_portal_derived_values();
        for zone in self.graph.zones.values_mut() {
            zone.clear_visitors();
        }
        self.graph.update_portals_zone_data()?;

        let mut enabled = Vec::with_capacity(self.objects.len());
        for (key, object) in self.objects.iter_mut() {
            object.take_visiting_zones();
            if object.is_enabled() {
                enabled.push(key);
            }
        }
        for key in enabled {
            self.update_object(key)?;
        }

        self.update_lights()?;

        for zone in self.graph.zones.values_mut() {
            zone.set_portals_updated(false);
        }
        self.update_enclosures()?;

        self.frame += 1;
        self.flooded_cameras.clear();
        Ok(())
    }

    /// Re-home one object, register its visits and refresh its octants.
    fn update_object(&mut self, key: ObjectKey) -> Galaxy3dResult<()> {
        let object = self.object_ref(key)?;
        let old_home = object.home_zone().filter(|home| self.graph.zones.contains_key(*home));

        let new_home = match old_home {
            Some(home) if object.is_anchored() => home,
            Some(home) => self
                .graph
                .update_object_home_zone(home, key, &mut self.objects, false)?
                .unwrap_or(home),
            None => self.find_zone_for_point(object.position()),
        };

        if old_home != Some(new_home) {
            if let Some(old) = old_home.and_then(|old| self.graph.zones.get_mut(old)) {
                old.remove_object(key);
            }
            let object = &mut self.objects[key];
            object.set_home_zone(Some(new_home));
            self.graph.zone_mut(new_home)?.add_object(key, object);
            engine_debug!("galaxy3d::PczSceneManager", "Object '{}' moved to zone '{}'",
                object.name(), self.graph.zone(new_home)?.name());
        }

        self.graph.check_object_against_portals(new_home, key, &mut self.objects, None)?;

        let object = &mut self.objects[key];
        self.graph.zone_mut(new_home)?.update_object_octant(key, object);
        for zone in object.visiting_zones() {
            self.graph.zone_mut(*zone)?.update_object_octant(key, object);
        }
        object.save_previous_position();
        Ok(())
    }

    /// Re-flood every light that moved or whose zones' portals changed.
    fn update_lights(&mut self) -> Galaxy3dResult<()> {
        let frame = self.frame;
        let graph = &self.graph;
        let is_visible = |zone: ZoneKey| graph.zones.get(zone).is_some_and(|z| z.last_visible_frame() == frame);

        for light in self.lights.values_mut() {
            light.refresh_needs_update(|zone| graph.zones.get(zone).is_some_and(Zone::portals_updated));
            if !light.needs_update() {
                light.refresh_affects_visible_zone(&is_visible);
                continue;
            }

            let home = match light.home_zone() {
                Some(home) if graph.zones.contains_key(home) => {
                    let new_home = graph.update_point_home_zone(home, light.previous_position(), light.position())?;
                    if new_home != home {
                        engine_debug!("galaxy3d::PczSceneManager", "Light '{}' moved to zone '{}'",
                            light.name(), graph.zone(new_home)?.name());
                        light.move_home_zone(new_home);
                    }
                    new_home
                }
                Some(home) => {
                    engine_warn!("galaxy3d::PczSceneManager",
                        "Light '{}' pinned to destroyed zone {:?}, locating by position", light.name(), home);
                    graph.zone_for_point(light.position(), self.default_zone)
                }
                None => graph.zone_for_point(light.position(), self.default_zone),
            };
            graph.update_light_zones(light, home, frame)?;
            light.save_previous_position();
            light.set_needs_update(false);
        }
        Ok(())
    }

    /// Resize zones whose enclosure object changed bounds.
    fn update_enclosures(&mut self) -> Galaxy3dResult<()> {
        for zone in self.graph.zones.values_mut() {
            let Some(aabb) = zone
                .enclosure_object()
                .and_then(|key| self.objects.get(key))
                .and_then(SceneObject::world_aabb)
            else {
                continue;
            };
            if aabb != zone.bounds() {
                zone.resize(aabb, &self.objects)?;
            }
        }
        Ok(())
    }

    // ===== VISIBILITY =====

    /// Flood visibility from the camera's zone and queue every visible object.
    ///
    /// Each camera is flooded once per stamp; flooding the same camera again
    /// before `update()` starts a new stamp.
    pub fn find_visible_objects(
        &mut self,
        camera: &mut PczCamera,
        queue: &mut dyn RenderQueue,
    ) -> Galaxy3dResult<RenderView> {
        if !self.flooded_cameras.insert(camera.id()) {
            self.frame += 1;
            self.flooded_cameras.clear();
            self.flooded_cameras.insert(camera.id());
        }

        let home = match camera.home_zone() {
            Some(zone) if self.graph.zones.contains_key(zone) => {
                let home = self.graph.update_point_home_zone(zone, camera.previous_position(), camera.position())?;
                if home != zone {
                    engine_debug!("galaxy3d::PczSceneManager", "Camera {} moved to zone '{}'",
                        camera.id(), self.graph.zone(home)?.name());
                    camera.set_home_zone(Some(home));
                }
                home
            }
            _ => self.find_zone_for_point(camera.position()),
        };
        camera.save_previous_position();

        let frame = self.frame;
        self.graph.zone_mut(home)?.mark_visible(frame, camera.id());

        let mut visible = Vec::new();
        let mut visible_zones = Vec::new();
        self.graph.find_visible_objects(home, camera, &mut self.objects, frame, &mut visible, &mut visible_zones)?;

        let sky_visible = visible_zones
            .iter()
            .any(|zone| self.graph.zones.get(*zone).is_some_and(Zone::has_sky));

        for key in &visible {
            queue.enqueue(*key);
        }

        engine_trace!("galaxy3d::PczSceneManager", "Camera {} sees {} object(s) in {} zone(s)",
            camera.id(), visible.len(), visible_zones.len());

        Ok(RenderView::new(camera.id(), frame, visible, visible_zones, sky_visible))
    }

    // ===== SPATIAL QUERIES =====

    /// Objects touching `shape`, each listed once.
    ///
    /// With a start zone the query follows the portals the shape crosses and
    /// includes visitors; without one every zone is searched for its home
    /// objects only.
    pub fn find_objects_in(
        &self,
        shape: &BoundingShape,
        start_zone: Option<ZoneKey>,
        exclude: Option<ObjectKey>,
    ) -> Galaxy3dResult<Vec<ObjectKey>> {
        let mut results = Vec::new();
        let mut visited_portals = Vec::new();

        match start_zone {
            Some(zone) => self.graph.find_objects(
                zone, shape, &self.objects, &mut visited_portals, true, true, exclude, &mut results,
            )?,
            None => {
                for zone in self.graph.zones.keys() {
                    self.graph.find_objects(
                        zone, shape, &self.objects, &mut visited_portals, false, false, exclude, &mut results,
                    )?;
                }
            }
        }

        let mut seen = FxHashSet::default();
        results.retain(|key| seen.insert(*key));
        Ok(results)
    }
}

#[cfg(test)]
#[path = "scene_manager_tests.rs"]
mod tests;
