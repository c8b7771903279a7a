//! Camera module — frustum, portal culling planes, and render view.
//!
//! Cameras are passive tools owned and driven by the caller. The scene
//! manager only borrows them for the duration of a visibility flood.

mod camera;
mod frustum;
mod portal_frustum;
mod render_view;

pub use camera::PczCamera;
pub use frustum::{
    Frustum, FrustumTest,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
pub use portal_frustum::{PortalFrustum, ProjectionType, Visibility};
pub use render_view::RenderView;
