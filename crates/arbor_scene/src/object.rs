//! Detached object trees.
//!
//! An [`Object3D`] is a node tree that is not yet part of any scene. It owns
//! its geometry and materials by value. Registering it moves the whole tree
//! into the registry: resources go to the pool, nodes go to the graph, and
//! from then on the registry alone decides when they are destroyed.
//!
//! Children of an `Object3D` are never registered on their own. They are
//! the "helper" nodes that disposal still has to find by walking native
//! child links.

use glam::Vec3;
use smallvec::{SmallVec, smallvec};

use crate::camera::Camera;
use crate::fog::Fog;
use crate::light::Light;
use crate::node::{InstanceBuffer, MeshData, NodeKind, NodePayload};
use crate::resources::{Geometry, Material, ResourcePool};
use crate::transform::Transform;

/// Owned mesh description, before registration.
#[derive(Debug, Clone)]
pub struct MeshDesc {
    pub geometry: Geometry,
    pub materials: SmallVec<[Material; 1]>,
    /// Fixed instance count for batch-rendered meshes.
    pub instance_count: Option<u32>,
}

#[derive(Debug, Clone)]
pub enum ObjectPayload {
    Group,
    Mesh(MeshDesc),
    Particles(MeshDesc),
    Light(Light),
    Camera(Camera),
    Fog(Fog),
}

impl ObjectPayload {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            ObjectPayload::Group => NodeKind::Group,
            ObjectPayload::Mesh(_) => NodeKind::Mesh,
            ObjectPayload::Particles(_) => NodeKind::Particles,
            ObjectPayload::Light(_) => NodeKind::Light,
            ObjectPayload::Camera(_) => NodeKind::Camera,
            ObjectPayload::Fog(_) => NodeKind::Fog,
        }
    }

    pub(crate) fn into_node_payload(self, pool: &mut ResourcePool) -> NodePayload {
        match self {
            ObjectPayload::Group => NodePayload::Group,
            ObjectPayload::Mesh(desc) => NodePayload::Mesh(desc.into_mesh_data(pool)),
            ObjectPayload::Particles(desc) => NodePayload::Particles(desc.into_mesh_data(pool)),
            ObjectPayload::Light(light) => NodePayload::Light(light),
            ObjectPayload::Camera(camera) => NodePayload::Camera(camera),
            ObjectPayload::Fog(fog) => NodePayload::Fog(fog),
        }
    }
}

impl MeshDesc {
    fn into_mesh_data(self, pool: &mut ResourcePool) -> MeshData {
        MeshData {
            geometry: pool.insert_geometry(self.geometry),
            materials: self
                .materials
                .into_iter()
                .map(|material| pool.insert_material(material))
                .collect(),
            instances: self.instance_count.map(InstanceBuffer::new),
        }
    }
}

/// A detached node tree awaiting registration.
#[derive(Debug, Clone)]
pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub payload: ObjectPayload,
    pub children: Vec<Object3D>,
}

impl Object3D {
    #[must_use]
    pub fn new(name: impl Into<String>, payload: ObjectPayload) -> Self {
        Self {
            name: name.into(),
            transform: Transform::new(),
            visible: true,
            payload,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, ObjectPayload::Group)
    }

    #[must_use]
    pub fn mesh(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self::multi_material_mesh(name, geometry, vec![material])
    }

    #[must_use]
    pub fn multi_material_mesh(name: impl Into<String>, geometry: Geometry, materials: Vec<Material>) -> Self {
        Self::new(
            name,
            ObjectPayload::Mesh(MeshDesc {
                geometry,
                materials: materials.into_iter().collect(),
                instance_count: None,
            }),
        )
    }

    /// Batch mesh drawing `count` instances of the same geometry.
    #[must_use]
    pub fn instanced_mesh(name: impl Into<String>, geometry: Geometry, material: Material, count: u32) -> Self {
        Self::new(
            name,
            ObjectPayload::Mesh(MeshDesc {
                geometry,
                materials: smallvec![material],
                instance_count: Some(count),
            }),
        )
    }

    #[must_use]
    pub fn particles(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self::new(
            name,
            ObjectPayload::Particles(MeshDesc {
                geometry,
                materials: smallvec![material],
                instance_count: None,
            }),
        )
    }

    #[must_use]
    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self::new(name, ObjectPayload::Light(light))
    }

    #[must_use]
    pub fn camera(name: impl Into<String>, camera: Camera) -> Self {
        Self::new(name, ObjectPayload::Camera(camera))
    }

    #[must_use]
    pub fn fog(fog: Fog) -> Self {
        Self::new("Fog", ObjectPayload::Fog(fog))
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.transform.scale = scale;
        self
    }

    /// Appends an unregistered helper child.
    #[must_use]
    pub fn with_child(mut self, child: Object3D) -> Self {
        self.children.push(child);
        self
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    /// Number of nodes in this tree, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Object3D::node_count).sum::<usize>()
    }
}
