//! Render backend seam.
//!
//! The backend is the "renderer" member of the registry's root triple. It
//! draws frames and owns whatever GPU objects it created for geometries,
//! materials and textures. The registry tells it when to release them; the
//! backend never decides that on its own.

use arbor_core::{ArborError, ObjectId, Result};

use crate::camera::Camera;
use crate::graph::SceneGraph;
use crate::node::NodeKey;
use crate::resources::{Geometry, GeometryHandle, Material, MaterialHandle, ResourcePool, Texture};

/// Everything a backend needs to draw one frame.
pub struct RenderFrame<'a> {
    pub graph: &'a SceneGraph,
    pub resources: &'a ResourcePool,
    pub root: NodeKey,
    pub camera: &'a Camera,
}

/// Backend that draws frames and releases GPU-side resources.
///
/// Disposal hooks default to no-ops so headless backends only implement
/// [`render`](Self::render). A hook returning `Err` is logged and recorded
/// in the [`DisposalReport`]; disposal of sibling resources continues.
pub trait RenderBackend {
    fn label(&self) -> &str {
        "RenderBackend"
    }

    fn render(&mut self, frame: &RenderFrame<'_>);

    fn dispose_geometry(&mut self, _handle: GeometryHandle, _geometry: &Geometry) -> Result<()> {
        Ok(())
    }

    fn dispose_material(&mut self, _handle: MaterialHandle, _material: &Material) -> Result<()> {
        Ok(())
    }

    fn dispose_texture(&mut self, _texture: &Texture) -> Result<()> {
        Ok(())
    }
}

/// Backend for non-interactive contexts: counts frames, draws nothing.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    pub frames: u64,
}

impl RenderBackend for HeadlessBackend {
    fn label(&self) -> &str {
        "HeadlessBackend"
    }

    fn render(&mut self, _frame: &RenderFrame<'_>) {
        self.frames += 1;
    }
}

/// Outcome of one cascading disposal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisposalReport {
    /// Native nodes freed, registered or not.
    pub nodes: usize,
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
    /// Registered descendants whose entries were dropped with the subtree.
    pub purged: Vec<ObjectId>,
    /// Backend failures, isolated per resource.
    pub failures: Vec<ArborError>,
}

impl DisposalReport {
    pub fn merge(&mut self, other: Self) {
        self.nodes += other.nodes;
        self.geometries += other.geometries;
        self.materials += other.materials;
        self.textures += other.textures;
        self.purged.extend(other.purged);
        self.failures.extend(other.failures);
    }

    /// `true` when the backend reported no failures.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
