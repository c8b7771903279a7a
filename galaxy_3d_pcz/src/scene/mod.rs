//! Scene module — zones, portals, the loose octree and the scene manager
//!
//! Zones partition the world and own one octree each. Portals connect
//! zones; visibility, light influence and object membership propagate
//! through them.

mod light;
mod octree;
mod portal;
mod portal_graph;
mod render_queue;
mod scene_manager;
mod scene_object;
mod zone;

pub use light::{Light, LightKey, LightKind};
pub use octree::{ObjectFilter, Octree, OctreeNode, ROOT};
pub use portal::{Portal, PortalIntersection, PortalKey, PortalKind, PortalShape, VolumeFacing};
pub use portal_graph::ZoneGraph;
pub use render_queue::RenderQueue;
pub use scene_manager::{PczConfig, PczSceneManager, DEFAULT_ZONE_NAME};
pub use scene_object::{ObjectFlags, ObjectKey, SceneObject};
pub use zone::{Zone, ZoneDesc, ZoneKey, DEFAULT_MAX_DEPTH, MAX_OCTREE_DEPTH};
