/*!
# Galaxy 3D PCZ

Portal-connected zone scene core for the Galaxy 3D engine.

The world is partitioned into zones, each indexing its movable objects in a
loose octree. Zones are connected by portals (quads, boxes or spheres) through
which camera visibility, light influence and object membership propagate.

## Architecture

- **bounds**: AABB, sphere, ray, plane and plane-bounded volume tests
- **camera**: frustum, portal culling-plane stack, camera and render view
- **scene**: octree, zones, portals, lights and the `PczSceneManager`

A frame is `PczSceneManager::update()` followed by one
`PczSceneManager::find_visible_objects()` per camera.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod bounds;
pub mod camera;
pub mod scene;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Galaxy3dError, Galaxy3dResult};

    // Engine singleton (logger registry)
    pub use crate::engine::Engine;

    // Scene manager entry point
    pub use crate::scene::{PczConfig, PczSceneManager};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Bounding volume sub-module
    pub mod bounds {
        pub use crate::bounds::*;
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
