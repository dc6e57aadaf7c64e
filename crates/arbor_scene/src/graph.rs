//! Native scene graph.
//!
//! [`SceneGraph`] is an arena of [`SceneNode`]s linked by parent/child keys.
//! It holds every node the registry owns: the scene root and its subtree,
//! plus detached subtrees whose registration is still pending.
//!
//! Structural mutation is crate-private. Outside code reads the graph; the
//! [`SceneRegistry`](crate::registry::SceneRegistry) is the only writer.

use glam::Affine3A;
use slotmap::SlotMap;

use crate::node::{NodeKey, NodePayload, SceneNode};
use crate::object::Object3D;
use crate::resources::ResourcePool;

#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, SceneNode>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    #[must_use]
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map_or(&[], |n| n.children.as_slice())
    }

    /// Keys of nodes without a parent: the scene root and any detached subtrees.
    #[must_use]
    pub fn orphans(&self) -> Vec<NodeKey> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(key, _)| key)
            .collect()
    }

    pub(crate) fn insert(&mut self, node: SceneNode) -> NodeKey {
        self.nodes.insert(node)
    }

    /// Moves a detached tree into the arena, resources into `pool`.
    ///
    /// The returned root key has no parent yet.
    pub(crate) fn insert_tree(&mut self, object: Object3D, pool: &mut ResourcePool) -> NodeKey {
        let Object3D {
            name,
            transform,
            visible,
            payload,
            children,
        } = object;

        let key = self.nodes.insert(SceneNode {
            name,
            parent: None,
            children: Vec::with_capacity(children.len()),
            transform,
            visible,
            payload: payload.into_node_payload(pool),
        });

        for child in children {
            let child_key = self.insert_tree(child, pool);
            self.link(child_key, key);
        }

        key
    }

    /// Makes `child` the last child of `parent`, detaching it from any
    /// previous parent first.
    ///
    /// Returns `false` (and changes nothing) if either node is missing or
    /// the link would create a cycle.
    pub(crate) fn attach(&mut self, child: NodeKey, parent: NodeKey) -> bool {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return false;
        }
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            log::error!("Attach target or child missing from scene graph");
            return false;
        }
        if self.is_descendant_of(parent, child) {
            log::warn!("Attaching a node below its own descendant would create a cycle");
            return false;
        }

        self.detach(child);
        self.link(child, parent);
        true
    }

    fn link(&mut self, child: NodeKey, parent: NodeKey) {
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.invalidate();
        }
    }

    /// Unlinks `child` from its parent. The subtree stays in the arena.
    pub(crate) fn detach(&mut self, child: NodeKey) {
        let Some(parent) = self.nodes.get_mut(child).and_then(|c| c.parent.take()) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent)
            && let Some(i) = p.children.iter().position(|&x| x == child)
        {
            p.children.remove(i);
        }
    }

    /// Returns `true` if `ancestor` is reachable from `key` by parent links
    /// (a node counts as its own descendant).
    #[must_use]
    pub fn is_descendant_of(&self, key: NodeKey, ancestor: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.parent(k);
        }
        false
    }

    /// Depth-first, pre-order list of `key` and everything below it.
    #[must_use]
    pub fn traverse(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut order = Vec::new();
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            let Some(node) = self.nodes.get(k) else {
                continue;
            };
            order.push(k);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// Detaches `key` and removes its whole subtree from the arena.
    ///
    /// Nodes come back in the same depth-first pre-order as [`traverse`](Self::traverse).
    pub(crate) fn take_subtree(&mut self, key: NodeKey) -> Vec<(NodeKey, SceneNode)> {
        self.detach(key);
        self.traverse(key)
            .into_iter()
            .filter_map(|k| self.nodes.remove(k).map(|node| (k, node)))
            .collect()
    }

    /// Updates world matrices of `root`'s subtree.
    ///
    /// Iterative, so deep hierarchies cannot overflow the stack. Only nodes
    /// whose local matrix or ancestor changed are recomputed. Camera nodes
    /// get their view matrix refreshed.
    pub fn update_world_matrices(&mut self, root: NodeKey) {
        let mut stack: Vec<(NodeKey, Affine3A, bool)> = Vec::with_capacity(64);

        let parent_world = self
            .parent(root)
            .and_then(|p| self.nodes.get(p))
            .map_or(Affine3A::IDENTITY, |p| p.transform.world);
        stack.push((root, parent_world, false));

        while let Some((key, parent_world, parent_changed)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };

            let world_needs_update = node.transform.refresh_local() || parent_changed;

            if world_needs_update {
                let world = parent_world * node.transform.local;
                node.transform.world = world;
                if let NodePayload::Camera(camera) = &mut node.payload {
                    camera.update_view(&world);
                }
            }

            let world = node.transform.world;
            for &child in node.children.iter().rev() {
                stack.push((child, world, world_needs_update));
            }
        }
    }
}
