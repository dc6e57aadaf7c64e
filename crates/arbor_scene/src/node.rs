use std::fmt;

use arbor_core::ChangeTracker;
use glam::Affine3A;
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::camera::Camera;
use crate::fog::Fog;
use crate::light::Light;
use crate::resources::{GeometryHandle, MaterialHandle};
use crate::transform::Transform;

new_key_type! {
    /// Key of a native node inside a [`SceneGraph`](crate::graph::SceneGraph).
    pub struct NodeKey;
}

/// Closed set of node tags used for typed registry queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Mesh,
    Light,
    Camera,
    Group,
    Particles,
    Fog,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Mesh,
        NodeKind::Light,
        NodeKind::Camera,
        NodeKind::Group,
        NodeKind::Particles,
        NodeKind::Fog,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Mesh => "mesh",
            NodeKind::Light => "light",
            NodeKind::Camera => "camera",
            NodeKind::Group => "group",
            NodeKind::Particles => "particles",
            NodeKind::Fog => "fog",
        }
    }

    /// Parses the lowercase tag (`"mesh"`, `"light"`, ...).
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-length per-instance transform buffer of a batch-rendered mesh.
///
/// The length is the instance count chosen at assembly and never changes;
/// the buffer is reallocated only by destroying and recreating the object.
#[derive(Debug, Clone)]
pub struct InstanceBuffer {
    matrices: Vec<Affine3A>,
    tracker: ChangeTracker,
}

impl InstanceBuffer {
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self {
            matrices: vec![Affine3A::IDENTITY; count as usize],
            tracker: ChangeTracker::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.matrices.len()
    }

    #[inline]
    #[must_use]
    pub fn matrices(&self) -> &[Affine3A] {
        &self.matrices
    }

    /// In-place edit access. Handing out a slice keeps the length fixed.
    pub(crate) fn matrices_mut(&mut self) -> &mut [Affine3A] {
        self.tracker.changed();
        &mut self.matrices
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }
}

/// Resource references of a mesh or particle node.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub(crate) geometry: GeometryHandle,
    pub(crate) materials: SmallVec<[MaterialHandle; 1]>,
    pub(crate) instances: Option<InstanceBuffer>,
}

impl MeshData {
    #[inline]
    #[must_use]
    pub fn geometry(&self) -> GeometryHandle {
        self.geometry
    }

    /// All materials; more than one for multi-material meshes.
    #[inline]
    #[must_use]
    pub fn materials(&self) -> &[MaterialHandle] {
        &self.materials
    }

    #[inline]
    #[must_use]
    pub fn instances(&self) -> Option<&InstanceBuffer> {
        self.instances.as_ref()
    }
}

/// What a native node carries besides its transform.
#[derive(Debug, Clone)]
pub enum NodePayload {
    Group,
    Mesh(MeshData),
    Particles(MeshData),
    Light(Light),
    Camera(Camera),
    Fog(Fog),
}

impl NodePayload {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::Group => NodeKind::Group,
            NodePayload::Mesh(_) => NodeKind::Mesh,
            NodePayload::Particles(_) => NodeKind::Particles,
            NodePayload::Light(_) => NodeKind::Light,
            NodePayload::Camera(_) => NodeKind::Camera,
            NodePayload::Fog(_) => NodeKind::Fog,
        }
    }

    #[must_use]
    pub fn mesh(&self) -> Option<&MeshData> {
        match self {
            NodePayload::Mesh(mesh) | NodePayload::Particles(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub(crate) fn mesh_mut(&mut self) -> Option<&mut MeshData> {
        match self {
            NodePayload::Mesh(mesh) | NodePayload::Particles(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// A native scene-graph node.
///
/// # Hierarchy
///
/// Nodes form a tree through parent-child links:
/// - `parent`: Optional key of the parent node (None for roots and detached nodes)
/// - `children`: Child node keys, in insertion order
///
/// These links are the ground truth for ownership and disposal. Registry
/// bookkeeping is a partial index over them.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub transform: Transform,
    pub visible: bool,
    pub(crate) payload: NodePayload,
}

impl SceneNode {
    #[must_use]
    pub fn new(name: impl Into<String>, payload: NodePayload) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            visible: true,
            payload,
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    #[must_use]
    pub fn mesh(&self) -> Option<&MeshData> {
        self.payload.mesh()
    }

    #[must_use]
    pub fn light(&self) -> Option<&Light> {
        match &self.payload {
            NodePayload::Light(light) => Some(light),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        self.transform.world_matrix()
    }
}
