//! Object Assembler
//!
//! An [`ObjectAssembler`] turns a shape channel and an appearance channel
//! into one registered node:
//!
//! ```text
//! Unassembled ──(one channel set)──► PartiallyReady ──(both set, registry ready)──► Assembled
//!      │                                   │                                           │
//!      └───────────────────────────────────┴──────────────── destroy ─────────────────►└─► Destroyed
//! ```
//!
//! An object whose parent is not in the scene yet is assembled as a pending
//! entry; [`SceneRegistry::reconcile`] attaches it later, and `Stage` runs
//! that every frame.
//!
//! A registration the registry rejects (the id is taken) is logged once; the
//! assembler stays `PartiallyReady` and only retries after a channel write.
//!
//! Assembly happens at most once. Later channel writes swap the geometry or
//! material of the existing node and dispose the old one; the id and the
//! registry entry stay the same. Structural parameters such as the instance
//! count are frozen at assembly.

use std::cell::Cell;
use std::rc::Rc;

use arbor_core::{ArborError, ObjectId, ResourceChannel, Result, Subscription};
use arbor_scene::{DisposalReport, Geometry, Material, NodeKind, Object3D, Registration, SceneRegistry, Transform};

use crate::render_loop::{FrameState, RenderLoop, UpdateHandle};

/// Lifecycle of an [`ObjectAssembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssemblyState {
    Unassembled,
    PartiallyReady,
    Assembled,
    Destroyed,
}

pub struct ObjectAssembler {
    id: ObjectId,
    kind: NodeKind,
    parent: Option<ObjectId>,
    transform: Transform,

    shape: ResourceChannel<Geometry>,
    appearance: ResourceChannel<Material>,
    instance_count: Option<u32>,

    state: AssemblyState,
    seen_shape: u64,
    seen_appearance: u64,
    dirty: Rc<Cell<bool>>,
    rejected: bool,
    subscriptions: Vec<Subscription>,

    update: Option<UpdateHandle>,
}

impl ObjectAssembler {
    /// Creates an assembler for a mesh (or particle) object.
    ///
    /// `kind` other than [`NodeKind::Mesh`] or [`NodeKind::Particles`] is
    /// assembled as a mesh and logged.
    #[must_use]
    pub fn new(id: impl Into<ObjectId>, kind: NodeKind) -> Self {
        let id = id.into();
        let shape = ResourceChannel::new(&format!("{id}.shape"));
        let appearance = ResourceChannel::new(&format!("{id}.appearance"));
        Self::with_channels(id, kind, shape, appearance)
    }

    /// Creates an assembler reading from existing channels.
    #[must_use]
    pub fn with_channels(
        id: impl Into<ObjectId>,
        kind: NodeKind,
        shape: ResourceChannel<Geometry>,
        appearance: ResourceChannel<Material>,
    ) -> Self {
        let id = id.into();
        if !matches!(kind, NodeKind::Mesh | NodeKind::Particles) {
            log::warn!("Assembler '{id}' created for {kind}; it will assemble a mesh");
        }

        let dirty = Rc::new(Cell::new(true));
        let subscriptions = vec![
            {
                let dirty = Rc::clone(&dirty);
                shape.subscribe(move || dirty.set(true))
            },
            {
                let dirty = Rc::clone(&dirty);
                appearance.subscribe(move || dirty.set(true))
            },
        ];

        Self {
            id,
            kind,
            parent: None,
            transform: Transform::new(),
            shape,
            appearance,
            instance_count: None,
            state: AssemblyState::Unassembled,
            seen_shape: 0,
            seen_appearance: 0,
            dirty,
            rejected: false,
            subscriptions,
            update: None,
        }
    }

    /// Attaches the assembled node below `parent` instead of the scene root.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<ObjectId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Initial transform of the assembled node.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Batch-rendered object drawing `count` instances.
    #[must_use]
    pub fn with_instance_count(mut self, count: u32) -> Self {
        self.instance_count = Some(count);
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> AssemblyState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> &ResourceChannel<Geometry> {
        &self.shape
    }

    #[inline]
    #[must_use]
    pub fn appearance(&self) -> &ResourceChannel<Material> {
        &self.appearance
    }

    #[inline]
    #[must_use]
    pub fn instance_count(&self) -> Option<u32> {
        self.instance_count
    }

    #[inline]
    #[must_use]
    pub fn update_handle(&self) -> Option<&UpdateHandle> {
        self.update.as_ref()
    }

    /// `true` if a channel changed since the last [`sync`](Self::sync), or
    /// assembly is still outstanding and was not rejected.
    #[must_use]
    pub fn needs_sync(&self) -> bool {
        match self.state {
            AssemblyState::Destroyed => false,
            AssemblyState::Assembled => self.dirty.get(),
            AssemblyState::Unassembled | AssemblyState::PartiallyReady => !self.rejected || self.dirty.get(),
        }
    }

    /// `true` after the registry refused this assembler's id, until a
    /// channel write triggers another attempt.
    #[inline]
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    /// Changes the instance count.
    ///
    /// # Errors
    ///
    /// [`ArborError::ImmutableParameter`] once assembled: the instance buffer
    /// was sized at assembly and only destroy-and-recreate can change it.
    pub fn set_instance_count(&mut self, count: u32) -> Result<()> {
        match self.state {
            AssemblyState::Unassembled | AssemblyState::PartiallyReady => {
                self.instance_count = Some(count);
                Ok(())
            }
            AssemblyState::Assembled | AssemblyState::Destroyed if self.instance_count == Some(count) => Ok(()),
            AssemblyState::Assembled | AssemblyState::Destroyed => {
                log::warn!(
                    "Instance count of '{}' is fixed at {:?}; change to {count} rejected",
                    self.id,
                    self.instance_count
                );
                Err(ArborError::ImmutableParameter {
                    id: self.id.clone(),
                    parameter: "instance_count",
                })
            }
        }
    }

    /// Reacts to channel changes: assembles once, then swaps resources.
    pub fn sync(&mut self, registry: &mut SceneRegistry) -> AssemblyState {
        match self.state {
            AssemblyState::Destroyed => {}
            AssemblyState::Assembled => {
                if self.dirty.replace(false) {
                    self.swap_changed(registry);
                }
            }
            AssemblyState::Unassembled | AssemblyState::PartiallyReady => {
                if self.needs_sync() {
                    self.try_assemble(registry);
                }
            }
        }
        self.state
    }

    fn try_assemble(&mut self, registry: &mut SceneRegistry) {
        let (Some(geometry), Some(material)) = (self.shape.get(), self.appearance.get()) else {
            self.state = if self.shape.is_ready() || self.appearance.is_ready() {
                AssemblyState::PartiallyReady
            } else {
                AssemblyState::Unassembled
            };
            return;
        };

        if !registry.is_ready() {
            if self.state != AssemblyState::PartiallyReady {
                log::debug!("'{}' has shape and appearance; waiting for scene readiness", self.id);
            }
            self.state = AssemblyState::PartiallyReady;
            return;
        }

        let name = self.id.as_str();
        let mut object = match (self.kind, self.instance_count) {
            (NodeKind::Particles, Some(count)) => {
                log::warn!("'{}' is a particle object; instance count {count} ignored", self.id);
                Object3D::particles(name, geometry, material)
            }
            (NodeKind::Particles, None) => Object3D::particles(name, geometry, material),
            (_, Some(count)) => Object3D::instanced_mesh(name, geometry, material, count),
            (_, None) => Object3D::mesh(name, geometry, material),
        };
        object.transform = self.transform.clone();

        let kind = object.kind();
        match registry.register(self.id.clone(), object, kind, self.parent.as_ref()) {
            Ok(registration) => {
                if registration == Registration::Pending {
                    log::debug!("'{}' assembled as pending; attached once its parent is", self.id);
                }
                self.seen_shape = self.shape.version();
                self.seen_appearance = self.appearance.version();
                self.dirty.set(false);
                self.rejected = false;
                self.state = AssemblyState::Assembled;
                log::debug!("Assembled '{}'", self.id);
            }
            Err(err) => {
                log::error!("Assembly of '{}' failed: {err}; retrying after the next channel write", self.id);
                self.dirty.set(false);
                self.rejected = true;
                self.state = AssemblyState::PartiallyReady;
            }
        }
    }

    fn swap_changed(&mut self, registry: &mut SceneRegistry) {
        if self.shape.version() != self.seen_shape {
            self.seen_shape = self.shape.version();
            match self.shape.get() {
                Some(geometry) => {
                    registry.replace_geometry(&self.id, geometry);
                }
                None => log::debug!("Shape of '{}' withdrawn; keeping current geometry", self.id),
            }
        }

        if self.appearance.version() != self.seen_appearance {
            self.seen_appearance = self.appearance.version();
            match self.appearance.get() {
                Some(material) => {
                    registry.replace_materials(&self.id, vec![material]);
                }
                None => log::debug!("Appearance of '{}' withdrawn; keeping current material", self.id),
            }
        }
    }

    /// Registers the per-frame callback of this object, keyed by its id.
    ///
    /// Replaces a previously registered callback.
    pub fn on_frame(
        &mut self,
        render_loop: &mut RenderLoop,
        callback: impl FnMut(&mut FrameState<'_>) + 'static,
    ) -> Result<UpdateHandle> {
        if let Some(previous) = self.update.take() {
            previous.unregister();
        }
        let handle = render_loop.register_keyed(self.id.clone(), callback)?;
        self.update = Some(handle.clone());
        Ok(handle)
    }

    /// Tears the object down: unregisters its callback and removes its node.
    ///
    /// Idempotent; returns `None` when there was nothing to remove.
    pub fn destroy(&mut self, registry: &mut SceneRegistry) -> Option<DisposalReport> {
        if self.state == AssemblyState::Destroyed {
            return None;
        }
        let was_assembled = self.state == AssemblyState::Assembled;
        self.state = AssemblyState::Destroyed;

        if let Some(handle) = self.update.take() {
            handle.unregister();
        }
        self.subscriptions.clear();

        log::debug!("Destroying '{}'", self.id);
        if was_assembled { registry.remove(&self.id) } else { None }
    }
}

impl std::fmt::Debug for ObjectAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectAssembler")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("instance_count", &self.instance_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_scene::{Camera, HeadlessBackend};
    use glam::Vec3;

    fn ready_registry() -> SceneRegistry {
        let mut registry = SceneRegistry::new();
        registry.init_root(Camera::default(), Box::new(HeadlessBackend::default()));
        registry
    }

    #[test]
    fn one_channel_is_partially_ready() {
        let mut registry = ready_registry();
        let mut assembler = ObjectAssembler::new("cube", NodeKind::Mesh);
        assert_eq!(assembler.sync(&mut registry), AssemblyState::Unassembled);

        let shape = assembler.shape().producer();
        shape.set(Geometry::new("box"));
        assert_eq!(assembler.sync(&mut registry), AssemblyState::PartiallyReady);
        assert!(!registry.has_object("cube"));
    }

    #[test]
    fn waits_for_registry_readiness() {
        let mut registry = SceneRegistry::new();
        let mut assembler = ObjectAssembler::new("cube", NodeKind::Mesh);
        let shape = assembler.shape().producer();
        let appearance = assembler.appearance().producer();
        shape.set(Geometry::new("box"));
        appearance.set(Material::basic(Vec3::ONE));

        assert_eq!(assembler.sync(&mut registry), AssemblyState::PartiallyReady);
        assert!(registry.is_empty());

        registry.init_root(Camera::default(), Box::new(HeadlessBackend::default()));
        assert_eq!(assembler.sync(&mut registry), AssemblyState::Assembled);
        assert!(registry.is_reachable("cube"));
    }

    #[test]
    fn rejected_id_is_retried_only_after_a_channel_write() {
        let mut registry = ready_registry();
        registry
            .register("cube", Object3D::group("taken"), NodeKind::Group, None)
            .unwrap();

        let mut assembler = ObjectAssembler::new("cube", NodeKind::Mesh);
        let shape = assembler.shape().producer();
        let appearance = assembler.appearance().producer();
        shape.set(Geometry::new("box"));
        appearance.set(Material::default());

        assert_eq!(assembler.sync(&mut registry), AssemblyState::PartiallyReady);
        assert!(assembler.is_rejected());
        assert!(!assembler.needs_sync());
        assert_eq!(registry.resources().geometry_count(), 0);

        registry.remove("cube");
        assert_eq!(assembler.sync(&mut registry), AssemblyState::PartiallyReady);

        shape.set(Geometry::new("sphere"));
        assert!(assembler.needs_sync());
        assert_eq!(assembler.sync(&mut registry), AssemblyState::Assembled);
        assert!(!assembler.is_rejected());
        assert_eq!(registry.get_object("cube").unwrap().kind(), NodeKind::Mesh);
    }

    #[test]
    fn particles_ignore_instance_count() {
        let mut registry = ready_registry();
        let mut assembler = ObjectAssembler::new("sparks", NodeKind::Particles).with_instance_count(32);
        let shape = assembler.shape().producer();
        let appearance = assembler.appearance().producer();
        shape.set(Geometry::new("points"));
        appearance.set(Material::default());

        assert_eq!(assembler.sync(&mut registry), AssemblyState::Assembled);
        let node = registry.get_object("sparks").unwrap();
        assert_eq!(node.kind(), NodeKind::Particles);
        assert!(node.mesh().unwrap().instances().is_none());
    }

    #[test]
    fn instance_count_is_frozen_after_assembly() {
        let mut registry = ready_registry();
        let mut assembler = ObjectAssembler::new("swarm", NodeKind::Mesh).with_instance_count(64);
        assert!(assembler.set_instance_count(128).is_ok());

        let shape = assembler.shape().producer();
        let appearance = assembler.appearance().producer();
        shape.set(Geometry::new("box"));
        appearance.set(Material::default());
        assembler.sync(&mut registry);

        let err = assembler.set_instance_count(256).unwrap_err();
        assert!(matches!(err, ArborError::ImmutableParameter { .. }));
        assert_eq!(assembler.instance_count(), Some(128));
        let instances = registry.get_object("swarm").unwrap().mesh().unwrap().instances().unwrap().count();
        assert_eq!(instances, 128);
    }
}
