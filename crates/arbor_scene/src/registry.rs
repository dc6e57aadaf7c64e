//! Scene-graph registry.
//!
//! [`SceneRegistry`] maps stable [`ObjectId`]s to native nodes and is the
//! only authority that destroys them. It owns:
//!
//! - the native [`SceneGraph`] and the [`ResourcePool`] behind it
//! - the root triple (scene root node, camera, render backend) and the
//!   readiness signal derived from it
//! - the id-keyed bookkeeping ([`NodeEntry`]) over part of the graph
//!
//! # Pending entries
//!
//! Registering before the root triple exists records the entry without
//! attaching it and logs a warning. The caller re-registers the id once
//! [`is_ready`](SceneRegistry::is_ready) turns true, or calls
//! [`reconcile`](SceneRegistry::reconcile). Readiness never attaches
//! anything on its own.
//!
//! # Disposal
//!
//! [`remove`](SceneRegistry::remove) walks native child links, not the
//! id-keyed bookkeeping: helper children that were never registered are
//! freed too, and registered descendants lose their entries in the same
//! call.

use std::borrow::Borrow;
use std::hash::Hash;

use arbor_core::{ArborError, Invalidator, ObjectId, Result, Signal};
use glam::Affine3A;
use rustc_hash::FxHashMap;

use crate::backend::{DisposalReport, RenderBackend, RenderFrame};
use crate::camera::Camera;
use crate::graph::SceneGraph;
use crate::node::{NodeKey, NodeKind, NodePayload, SceneNode};
use crate::object::Object3D;
use crate::patch::ObjectPatch;
use crate::resources::{Geometry, Material, ResourcePool};

/// Outcome of a successful [`SceneRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The node was appended to its target's children.
    Attached,
    /// The entry was recorded but its attach target is unavailable.
    Pending,
}

/// Bookkeeping record of one registered node.
#[derive(Debug, Clone)]
pub struct NodeEntry {
    id: ObjectId,
    node: NodeKey,
    kind: NodeKind,
    parent_id: Option<ObjectId>,
    attached: bool,
    seq: u64,
}

impl NodeEntry {
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeKey {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// `None` means "child of the scene root".
    #[inline]
    #[must_use]
    pub fn parent_id(&self) -> Option<&ObjectId> {
        self.parent_id.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Per-scene registry of live nodes.
///
/// One registry per scene; it is passed to collaborators by reference.
pub struct SceneRegistry {
    graph: SceneGraph,
    resources: ResourcePool,

    entries: FxHashMap<ObjectId, NodeEntry>,
    by_node: FxHashMap<NodeKey, ObjectId>,
    next_seq: u64,

    scene_root: Option<NodeKey>,
    camera: Option<Camera>,
    renderer: Option<Box<dyn RenderBackend>>,

    ready: Signal<bool>,
    invalidator: Invalidator,
}

impl Default for SceneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_invalidator(Invalidator::new())
    }

    /// Creates a registry that reports redraw requests to `invalidator`.
    #[must_use]
    pub fn with_invalidator(invalidator: Invalidator) -> Self {
        Self {
            graph: SceneGraph::new(),
            resources: ResourcePool::new(),
            entries: FxHashMap::default(),
            by_node: FxHashMap::default(),
            next_seq: 0,
            scene_root: None,
            camera: None,
            renderer: None,
            ready: Signal::with_value(false),
            invalidator,
        }
    }

    #[inline]
    #[must_use]
    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    // ========================================================================
    // Root triple
    // ========================================================================

    /// Creates the scene root node. Calling it again returns the existing root.
    pub fn init_scene(&mut self) -> NodeKey {
        if let Some(root) = self.scene_root {
            log::warn!("Scene root already initialized");
            return root;
        }
        let root = self.graph.insert(SceneNode::new("Scene", NodePayload::Group));
        log::debug!("Scene root created");
        self.scene_root = Some(root);
        self.refresh_ready();
        root
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
        self.refresh_ready();
    }

    /// Installs the render backend, returning the previous one.
    pub fn set_renderer(&mut self, renderer: Box<dyn RenderBackend>) -> Option<Box<dyn RenderBackend>> {
        log::debug!("Render backend set: {}", renderer.label());
        let previous = self.renderer.replace(renderer);
        self.refresh_ready();
        previous
    }

    /// Initializes the whole root triple at once.
    pub fn init_root(&mut self, camera: Camera, renderer: Box<dyn RenderBackend>) -> NodeKey {
        let root = self.init_scene();
        self.set_camera(camera);
        self.set_renderer(renderer);
        root
    }

    fn refresh_ready(&mut self) {
        let ready = self.scene_root.is_some() && self.camera.is_some() && self.renderer.is_some();
        if self.ready.set_if_changed(ready) {
            log::info!("Scene registry ready: {ready}");
        }
    }

    /// `true` once scene root, camera and renderer are all set.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.get().unwrap_or(false)
    }

    /// Reactive view of [`is_ready`](Self::is_ready).
    #[must_use]
    pub fn ready(&self) -> Signal<bool> {
        self.ready.clone()
    }

    #[inline]
    #[must_use]
    pub fn scene_root(&self) -> Option<NodeKey> {
        self.scene_root
    }

    #[inline]
    #[must_use]
    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    #[inline]
    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    #[inline]
    #[must_use]
    pub fn renderer(&self) -> Option<&dyn RenderBackend> {
        self.renderer.as_deref()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Moves `object` into the scene under `id`.
    ///
    /// The attach target is the node of `parent` if given, otherwise the
    /// scene root. An unavailable target is not an error: the entry is kept
    /// as [`Registration::Pending`].
    ///
    /// Re-registering a pending id replaces (and disposes) its stale node.
    ///
    /// # Errors
    ///
    /// [`ArborError::DuplicateId`] if `id` is already registered and
    /// attached. The registry is left unchanged and `object` is dropped.
    pub fn register(
        &mut self,
        id: impl Into<ObjectId>,
        object: Object3D,
        kind: NodeKind,
        parent: Option<&ObjectId>,
    ) -> Result<Registration> {
        let id = id.into();

        let mut seq = None;
        if let Some(existing) = self.entries.get(&id) {
            if existing.attached {
                log::error!("Object '{id}' is already registered; registration rejected");
                return Err(ArborError::DuplicateId(id));
            }
            log::debug!("Replacing pending node of '{id}'");
            seq = Some(existing.seq);
            let stale = existing.node;
            self.by_node.remove(&stale);
            self.entries.remove(&id);
            let mut report = DisposalReport::default();
            self.dispose_subtree(stale, &mut report);
        }

        if object.kind() != kind {
            log::warn!("Object '{id}' registered as {kind} but carries a {} payload", object.kind());
        }

        let node = self.graph.insert_tree(object, &mut self.resources);
        let seq = seq.unwrap_or_else(|| {
            let seq = self.next_seq;
            self.next_seq += 1;
            seq
        });

        self.by_node.insert(node, id.clone());
        self.entries.insert(
            id.clone(),
            NodeEntry {
                id: id.clone(),
                node,
                kind,
                parent_id: parent.cloned(),
                attached: false,
                seq,
            },
        );

        let outcome = if self.try_attach(&id, true) {
            log::debug!("Registered '{id}' ({kind})");
            Registration::Attached
        } else {
            Registration::Pending
        };

        self.invalidator.invalidate();
        Ok(outcome)
    }

    fn attach_target(&self, entry: &NodeEntry) -> Option<NodeKey> {
        if !self.is_ready() {
            return None;
        }
        match &entry.parent_id {
            Some(parent) => self.entries.get(parent).filter(|p| p.attached).map(|p| p.node),
            None => self.scene_root,
        }
    }

    fn try_attach(&mut self, id: &ObjectId, warn: bool) -> bool {
        let Some(entry) = self.entries.get(id) else {
            return false;
        };
        let node = entry.node;

        let Some(target) = self.attach_target(entry) else {
            if warn {
                if !self.is_ready() {
                    log::warn!("Scene not ready: '{id}' recorded but not attached; re-register once ready");
                } else if let Some(parent) = &entry.parent_id {
                    log::warn!("Parent '{parent}' of '{id}' is not attached; '{id}' recorded but not attached");
                }
            }
            return false;
        };

        if !self.graph.attach(node, target) {
            return false;
        }
        if let Some(entry) = self.entries.get_mut(id) {
            entry.attached = true;
        }
        true
    }

    /// Attaches every pending entry whose target is now available.
    ///
    /// Parents are attached before their registered children. Returns the
    /// number of entries attached.
    pub fn reconcile(&mut self) -> usize {
        if !self.is_ready() {
            log::debug!("Reconcile skipped: scene not ready");
            return 0;
        }

        let mut attached = 0;
        loop {
            let pending = self.pending_ids();
            let before = attached;
            for id in &pending {
                if self.try_attach(id, false) {
                    attached += 1;
                }
            }
            if attached == before {
                break;
            }
        }

        if attached > 0 {
            log::debug!("Reconciled {attached} pending entries");
            self.invalidator.invalidate();
        }
        attached
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Applies `patch` to the node registered as `id`.
    ///
    /// Unknown ids are ignored. Appearance fields go to every material of a
    /// mesh (marking each dirty) or to the color of a light. Returns `true`
    /// if the node was found.
    pub fn update<Q>(&mut self, id: &Q, patch: &ObjectPatch) -> bool
    where
        ObjectId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(key) = self.entries.get(id).map(|e| e.node) else {
            return false;
        };
        let Some(node) = self.graph.get_mut(key) else {
            return false;
        };

        patch.transform.apply_to(&mut node.transform);
        if let Some(visible) = patch.visible {
            node.visible = visible;
        }

        if !patch.appearance.is_empty() {
            let kind = node.payload.kind();
            match &mut node.payload {
                NodePayload::Mesh(mesh) | NodePayload::Particles(mesh) => {
                    for &handle in &mesh.materials {
                        if let Some(material) = self.resources.material_mut(handle) {
                            patch.appearance.apply_to(material);
                        }
                    }
                }
                NodePayload::Light(light) => {
                    if let Some(color) = patch.appearance.color {
                        light.color = color;
                    }
                }
                _ => log::trace!("Appearance patch ignored for {kind} node"),
            }
        }

        self.invalidator.invalidate();
        true
    }

    /// Edits the instance matrices of a batch mesh in place.
    ///
    /// The buffer length is fixed at assembly. Returns `false` for unknown
    /// ids and nodes without an instance buffer.
    pub fn update_instances<Q>(&mut self, id: &Q, edit: impl FnOnce(&mut [Affine3A])) -> bool
    where
        ObjectId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(instances) = self
            .entries
            .get(id)
            .and_then(|e| self.graph.get_mut(e.node))
            .and_then(|node| node.payload.mesh_mut())
            .and_then(|mesh| mesh.instances.as_mut())
        else {
            return false;
        };

        edit(instances.matrices_mut());
        self.invalidator.invalidate();
        true
    }

    /// Swaps the geometry of a mesh node and disposes the old one.
    ///
    /// Returns `None` for unknown ids and nodes without geometry.
    pub fn replace_geometry<Q>(&mut self, id: &Q, geometry: Geometry) -> Option<DisposalReport>
    where
        ObjectId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let key = self.entries.get(id)?.node;
        let mesh = self.graph.get_mut(key)?.payload.mesh_mut()?;

        let handle = self.resources.insert_geometry(geometry);
        let old = std::mem::replace(&mut mesh.geometry, handle);

        let mut report = DisposalReport::default();
        self.resources.dispose_geometry(old, &mut self.renderer, &mut report);
        self.invalidator.invalidate();
        Some(report)
    }

    /// Swaps all materials of a mesh node and disposes the old ones.
    pub fn replace_materials<Q>(&mut self, id: &Q, materials: Vec<Material>) -> Option<DisposalReport>
    where
        ObjectId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let key = self.entries.get(id)?.node;
        let mesh = self.graph.get_mut(key)?.payload.mesh_mut()?;

        let handles = materials
            .into_iter()
            .map(|material| self.resources.insert_material(material))
            .collect();
        let old = std::mem::replace(&mut mesh.materials, handles);

        let mut report = DisposalReport::default();
        for handle in old {
            self.resources.dispose_material(handle, &mut self.renderer, &mut report);
        }
        self.invalidator.invalidate();
        Some(report)
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Detaches `id` and disposes its whole native subtree.
    ///
    /// Pending entries waiting for `id` (or for a registered descendant of
    /// it) to attach are disposed as well; their parent will never exist.
    ///
    /// Returns `None` if `id` is not registered; removing twice is a no-op.
    pub fn remove<Q>(&mut self, id: &Q) -> Option<DisposalReport>
    where
        ObjectId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.entries.remove(id)?;
        self.by_node.remove(&entry.node);

        let mut report = DisposalReport::default();
        self.dispose_subtree(entry.node, &mut report);
        self.dispose_waiting_children(&entry.id, &mut report);

        log::debug!(
            "Removed '{}': {} nodes, {} geometries, {} materials",
            entry.id,
            report.nodes,
            report.geometries,
            report.materials
        );
        if !report.failures.is_empty() {
            log::warn!("Removing '{}' finished with {} disposal failures", entry.id, report.failures.len());
        }

        self.invalidator.invalidate();
        Some(report)
    }

    /// Disposes pending entries whose parent id is `removed` or was purged
    /// along with it, transitively.
    fn dispose_waiting_children(&mut self, removed: &ObjectId, report: &mut DisposalReport) {
        let mut gone: Vec<ObjectId> = report.purged.clone();
        gone.push(removed.clone());

        while let Some(parent) = gone.pop() {
            let waiting: Vec<ObjectId> = self
                .entries
                .values()
                .filter(|e| e.parent_id.as_ref() == Some(&parent))
                .map(|e| e.id.clone())
                .collect();

            for child in waiting {
                let Some(entry) = self.entries.remove(&child) else {
                    continue;
                };
                self.by_node.remove(&entry.node);
                log::debug!("'{child}' was waiting for '{parent}'; disposed with it");

                let purged_before = report.purged.len();
                self.dispose_subtree(entry.node, report);
                gone.extend(report.purged[purged_before..].iter().cloned());
                report.purged.push(child.clone());
                gone.push(child);
            }
        }
    }

    /// Frees `head` and every native node below it, depth first.
    fn dispose_subtree(&mut self, head: NodeKey, report: &mut DisposalReport) {
        for (key, node) in self.graph.take_subtree(head) {
            report.nodes += 1;

            if key != head
                && let Some(id) = self.by_node.remove(&key)
            {
                log::debug!("'{id}' disposed with its ancestor");
                self.entries.remove(&id);
                report.purged.push(id);
            }

            if let Some(mesh) = node.payload.mesh() {
                self.resources.dispose_geometry(mesh.geometry, &mut self.renderer, report);
                for &material in &mesh.materials {
                    self.resources.dispose_material(material, &mut self.renderer, report);
                }
            }
        }
    }

    /// Disposes every node and resource, then drops the root triple.
    ///
    /// The registry is reusable afterwards: initialize the triple again.
    pub fn clear(&mut self) -> DisposalReport {
        let mut report = DisposalReport::default();

        let mut ids: Vec<(u64, ObjectId)> = self.entries.values().map(|e| (e.seq, e.id.clone())).collect();
        ids.sort_unstable_by_key(|(seq, _)| *seq);
        for (_, id) in ids {
            if let Some(removed) = self.remove(&id) {
                report.merge(removed);
            }
        }

        for orphan in self.graph.orphans() {
            self.dispose_subtree(orphan, &mut report);
        }

        self.scene_root = None;
        self.camera = None;
        self.renderer = None;
        self.refresh_ready();

        log::info!("Scene registry cleared ({} nodes disposed)", report.nodes);
        self.invalidator.invalidate();
        report
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn get_object<Q>(&self, id: &Q) -> Option<&SceneNode>
    where
        ObjectId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(id).and_then(|e| self.graph.get(e.node))
    }

    #[must_use]
    pub fn has_object<Q>(&self, id: &Q) -> bool
    where
        ObjectId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(id)
    }

    #[must_use]
    pub fn entry<Q>(&self, id: &Q) -> Option<&NodeEntry>
    where
        ObjectId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(id)
    }

    fn entries_by_kind(&self, kind: NodeKind) -> Vec<&NodeEntry> {
        let mut entries: Vec<&NodeEntry> = self.entries.values().filter(|e| e.kind == kind).collect();
        entries.sort_unstable_by_key(|e| e.seq);
        entries
    }

    /// Snapshot of every registered node tagged `kind`, in registration order.
    #[must_use]
    pub fn query_by_kind(&self, kind: NodeKind) -> Vec<&SceneNode> {
        self.entries_by_kind(kind)
            .into_iter()
            .filter_map(|e| self.graph.get(e.node))
            .collect()
    }

    #[must_use]
    pub fn ids_by_kind(&self, kind: NodeKind) -> Vec<ObjectId> {
        self.entries_by_kind(kind).into_iter().map(|e| e.id.clone()).collect()
    }

    /// `true` if any entry is recorded but not attached.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.entries.values().any(|e| !e.attached)
    }

    /// Ids recorded but not attached, in registration order.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<ObjectId> {
        let mut pending: Vec<&NodeEntry> = self.entries.values().filter(|e| !e.attached).collect();
        pending.sort_unstable_by_key(|e| e.seq);
        pending.into_iter().map(|e| e.id.clone()).collect()
    }

    /// `true` if the node of `id` is reachable from the scene root.
    #[must_use]
    pub fn is_reachable<Q>(&self, id: &Q) -> bool
    where
        ObjectId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match (self.entries.get(id), self.scene_root) {
            (Some(entry), Some(root)) => self.graph.is_descendant_of(entry.node, root),
            _ => false,
        }
    }

    /// Number of registered entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    #[inline]
    #[must_use]
    pub fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Updates world matrices and hands one frame to the backend.
    ///
    /// Returns `false` if the registry is not ready.
    pub fn render(&mut self) -> bool {
        let Some(root) = self.scene_root else {
            return false;
        };
        self.graph.update_world_matrices(root);

        let (Some(camera), Some(renderer)) = (self.camera.as_ref(), self.renderer.as_mut()) else {
            return false;
        };
        let frame = RenderFrame {
            graph: &self.graph,
            resources: &self.resources,
            root,
            camera,
        };
        renderer.render(&frame);
        true
    }
}

impl std::fmt::Debug for SceneRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRegistry")
            .field("entries", &self.entries.len())
            .field("nodes", &self.graph.len())
            .field("resources", &self.resources)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use glam::Vec3;

    fn ready_registry() -> SceneRegistry {
        let mut registry = SceneRegistry::new();
        registry.init_root(Camera::default(), Box::new(HeadlessBackend::default()));
        registry
    }

    fn cube() -> Object3D {
        Object3D::mesh("cube", Geometry::new("box"), Material::default())
    }

    #[test]
    fn readiness_requires_whole_triple() {
        let mut registry = SceneRegistry::new();
        let ready = registry.ready();
        registry.init_scene();
        registry.set_camera(Camera::default());
        assert!(!registry.is_ready());
        registry.set_renderer(Box::new(HeadlessBackend::default()));
        assert!(registry.is_ready());
        assert_eq!(ready.get(), Some(true));
    }

    #[test]
    fn pending_replacement_disposes_stale_node() {
        let mut registry = SceneRegistry::new();
        registry.register("a", cube(), NodeKind::Mesh, None).unwrap();
        registry.register("a", cube(), NodeKind::Mesh, None).unwrap();
        assert_eq!(registry.resources().geometry_count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn child_waits_for_parent_attachment() {
        let mut registry = SceneRegistry::new();
        let group = ObjectId::new("group");
        registry.register(group.clone(), Object3D::group("g"), NodeKind::Group, None).unwrap();
        registry.register("child", cube(), NodeKind::Mesh, Some(&group)).unwrap();

        registry.init_root(Camera::default(), Box::new(HeadlessBackend::default()));
        assert_eq!(registry.reconcile(), 2);
        assert!(registry.is_reachable("child"));
        assert!(registry.pending_ids().is_empty());
    }

    #[test]
    fn light_color_follows_appearance_patch() {
        let mut registry = ready_registry();
        let light = Object3D::light("sun", crate::light::Light::new_directional(Vec3::ONE, 1.0));
        registry.register("sun", light, NodeKind::Light, None).unwrap();
        registry.update("sun", &ObjectPatch::new().color(Vec3::X));
        assert_eq!(registry.get_object("sun").unwrap().light().unwrap().color, Vec3::X);
    }

    #[test]
    fn clear_drops_triple_and_resources() {
        let mut registry = ready_registry();
        registry.register("a", cube(), NodeKind::Mesh, None).unwrap();
        let report = registry.clear();
        assert_eq!(report.geometries, 1);
        assert!(!registry.is_ready());
        assert!(registry.graph().is_empty());
        assert_eq!(registry.resources().material_count(), 0);
    }
}
