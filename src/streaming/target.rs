//! Abstract render target and texture loader.
//!
//! The engine never owns GPU resources. A host-supplied [`RenderTarget`]
//! holds the actual scene graph behind integer handles, and a
//! [`TextureLoader`] performs the asynchronous image fetches. Both are
//! polled from the single render loop; no callbacks cross the boundary.

use glam::Vec3;

use crate::annotation::{EntityId, FillMesh, Rgba, Stroke};
use crate::camera::Camera;

/// Handle to a decoded texture owned by the loader/target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a panorama sphere instance in the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SphereHandle(pub u64);

/// Identifies one in-flight texture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(pub u64);

/// Poll result for a texture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPoll {
    /// Still loading.
    Pending,
    /// Loaded; the handle is now owned by the caller.
    Ready(TextureHandle),
    /// Load failed; the ticket is spent.
    Failed,
}

/// Asynchronous texture source. Requests may complete in any order and
/// interleave arbitrarily with frame ticks.
pub trait TextureLoader {
    /// Start fetching a texture.
    fn request(&mut self, url: &str) -> LoadTicket;
    /// Check on a request. `Ready`/`Failed` are terminal.
    fn poll(&mut self, ticket: LoadTicket) -> LoadPoll;
    /// Release a texture that will not be used (stale scene results).
    fn release(&mut self, texture: TextureHandle);
}

/// The renderable-scene capability the engine draws through.
///
/// Handles are opaque integers; the target owns every actual resource.
pub trait RenderTarget {
    /// Create a textured panorama sphere at the given opacity.
    fn create_sphere(&mut self, texture: TextureHandle, opacity: f32) -> SphereHandle;
    /// Remove a sphere and free its resources.
    fn remove_sphere(&mut self, sphere: SphereHandle);
    /// Set a sphere's whole-surface opacity (cross-fade).
    fn set_sphere_opacity(&mut self, sphere: SphereHandle, opacity: f32);
    /// Install a high-resolution tile over the sphere's UV patch at
    /// (row, col).
    fn set_sphere_tile(
        &mut self,
        sphere: SphereHandle,
        row: u32,
        col: u32,
        texture: TextureHandle,
        opacity: f32,
    );
    /// Create or update a polygon's surface mesh.
    fn upsert_fill_mesh(&mut self, id: EntityId, mesh: &FillMesh, color: Rgba);
    /// Create or update a path's 3D stroke mesh.
    fn upsert_stroke_mesh(&mut self, id: EntityId, positions: &[Vec3], closed: bool, stroke: &Stroke);
    /// Remove an annotation's meshes.
    fn remove_annotation(&mut self, id: EntityId);
    /// Push the camera used for the 3D pass.
    fn set_camera(&mut self, camera: &Camera);
}
