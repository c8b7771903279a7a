/// Light — a light source and the zones its influence reaches.
///
/// The affected-zone list is rebuilt by the scene manager whenever the
/// light moved or a portal in one of its zones changed. The flood starts in
/// the light's home zone and crosses every portal in range that faces it.

use glam::Vec3;
use slotmap::new_key_type;
use super::zone::ZoneKey;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a Light within a PczSceneManager.
    pub struct LightKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Omnidirectional, limited by the attenuation range
    Point,
    /// Cone, limited by the attenuation range (the cone itself is not tested)
    Spot,
    /// Infinite range, only the direction matters
    Directional,
}

#[derive(Debug, Clone)]
pub struct Light {
    name: String,
    kind: LightKind,
    position: Vec3,
    /// Position at the last flood
    previous_position: Vec3,
    direction: Vec3,
    attenuation_range: f32,
    home_zone: Option<ZoneKey>,
    affected_zones: Vec<ZoneKey>,
    affects_visible_zone: bool,
    moved: bool,
    needs_update: bool,
}

impl Light {
    pub fn new(name: impl Into<String>, kind: LightKind) -> Self {
        Self {
            name: name.into(),
            kind,
            position: Vec3::ZERO,
            previous_position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            attenuation_range: 100.0,
            home_zone: None,
            affected_zones: Vec::new(),
            affects_visible_zone: false,
            moved: true,
            needs_update: true,
        }
    }

    pub fn point(name: impl Into<String>, position: Vec3, range: f32) -> Self {
        let mut light = Self::new(name, LightKind::Point);
        light.position = position;
        light.previous_position = position;
        light.attenuation_range = range;
        light
    }

    pub fn spot(name: impl Into<String>, position: Vec3, direction: Vec3, range: f32) -> Self {
        let mut light = Self::new(name, LightKind::Spot);
        light.position = position;
        light.previous_position = position;
        light.direction = direction.normalize_or_zero();
        light.attenuation_range = range;
        light
    }

    pub fn directional(name: impl Into<String>, direction: Vec3) -> Self {
        let mut light = Self::new(name, LightKind::Directional);
        light.direction = direction.normalize_or_zero();
        light.attenuation_range = f32::INFINITY;
        light
    }

    // ===== GETTERS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn previous_position(&self) -> Vec3 {
        self.previous_position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn attenuation_range(&self) -> f32 {
        self.attenuation_range
    }

    pub fn home_zone(&self) -> Option<ZoneKey> {
        self.home_zone
    }

    /// Zones reached by the last flood, home zone first.
    pub fn affected_zones(&self) -> &[ZoneKey] {
        &self.affected_zones
    }

    pub fn affects_zone(&self, zone: ZoneKey) -> bool {
        self.affected_zones.contains(&zone)
    }

    /// One of the affected zones was visible in the frame of the last flood.
    pub fn affects_visible_zone(&self) -> bool {
        self.affects_visible_zone
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    // ===== SETTERS =====

    pub fn set_position(&mut self, position: Vec3) {
        if position != self.position {
            self.position = position;
            self.moved = true;
        }
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        let direction = direction.normalize_or_zero();
        if direction != self.direction {
            self.direction = direction;
            self.moved = true;
        }
    }

    pub fn set_attenuation_range(&mut self, range: f32) {
        if range != self.attenuation_range {
            self.attenuation_range = range;
            self.moved = true;
        }
    }

    /// Pin the light to a zone. Without one the light is located by position.
    ///
    /// A pinned light follows the portals it crosses when moved.
    pub fn set_home_zone(&mut self, zone: Option<ZoneKey>) {
        self.home_zone = zone;
        self.moved = true;
    }

    // ===== FLOOD BOOKKEEPING (scene manager only) =====

    pub(crate) fn clear_affected_zones(&mut self) {
        self.affected_zones.clear();
        self.affects_visible_zone = false;
    }

    pub(crate) fn add_affected_zone(&mut self, zone: ZoneKey) {
        if !self.affected_zones.contains(&zone) {
            self.affected_zones.push(zone);
        }
    }

    pub(crate) fn remove_affected_zone(&mut self, zone: ZoneKey) {
        self.affected_zones.retain(|z| *z != zone);
    }

    pub(crate) fn set_affects_visible_zone(&mut self) {
        self.affects_visible_zone = true;
    }

    /// Re-derive `affects_visible_zone` without flooding again.
    pub(crate) fn refresh_affects_visible_zone(&mut self, is_visible: impl Fn(ZoneKey) -> bool) {
        self.affects_visible_zone = self.affected_zones.iter().any(|zone| is_visible(*zone));
    }

    /// Raise `needs_update` when the light moved or a portal of an affected
    /// zone changed, then consume the move flag. A pending update is kept.
    pub(crate) fn refresh_needs_update(&mut self, portals_updated: impl Fn(ZoneKey) -> bool) {
        self.needs_update |= self.moved || self.affected_zones.iter().any(|zone| portals_updated(*zone));
        self.moved = false;
    }

    /// Home zone reached by crossing a portal. Not a move.
    pub(crate) fn move_home_zone(&mut self, zone: ZoneKey) {
        self.home_zone = Some(zone);
    }

    pub(crate) fn save_previous_position(&mut self) {
        self.previous_position = self.position;
    }

    pub(crate) fn set_needs_update(&mut self, needs_update: bool) {
        self.needs_update = needs_update;
    }
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
