//! Arbor Scene
//!
//! Native scene graph and the registry that owns it:
//!
//! - [`graph`]: the [`SceneGraph`] arena of [`SceneNode`]s
//! - [`object`]: detached [`Object3D`] trees handed to the registry
//! - [`resources`]: geometry, material, texture and the [`ResourcePool`]
//! - [`backend`]: the [`RenderBackend`] seam and [`DisposalReport`]
//! - [`registry`]: the identifier-keyed [`SceneRegistry`]

pub mod backend;
pub mod camera;
pub mod fog;
pub mod graph;
pub mod light;
pub mod node;
pub mod object;
pub mod patch;
pub mod registry;
pub mod resources;
pub mod transform;

pub use backend::{DisposalReport, HeadlessBackend, RenderBackend, RenderFrame};
pub use camera::{Camera, Projection};
pub use fog::Fog;
pub use graph::SceneGraph;
pub use light::{Light, LightKind};
pub use node::{InstanceBuffer, MeshData, NodeKey, NodeKind, NodePayload, SceneNode};
pub use object::{MeshDesc, Object3D, ObjectPayload};
pub use patch::{AppearancePatch, ObjectPatch, TransformPatch};
pub use registry::{NodeEntry, Registration, SceneRegistry};
pub use resources::{Attribute, Geometry, GeometryHandle, Material, MaterialHandle, MaterialKind, ResourcePool, Texture};
pub use transform::Transform;
