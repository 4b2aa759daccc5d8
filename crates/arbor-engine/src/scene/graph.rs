use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error};

use super::component::{Capabilities, Component, ComponentId, Mask, Transform, Widget};
use super::context::{FrameEnv, Message, ScriptCtx};
use super::object::{GameObject, Slot};
use crate::coords::Rect;
use crate::device::GpuAllocator;
use crate::error::{Error, Result};
use crate::identity::{IdentityRegistry, ObjectId};

const NODE: &str = "game object";
const COMPONENT: &str = "component";

#[derive(Debug, Default)]
struct RootOrder {
    nodes: Vec<ObjectId>,
    dirty: bool,
}

/// Arena-backed forest of [`GameObject`]s.
///
/// Nodes and components are identified objects: their ids are issued by the
/// shared [`IdentityRegistry`] and retired when they are destroyed.
/// Components are released against the graph's GPU allocator when destroyed,
/// and dropping the graph destroys everything it still holds.
pub struct SceneGraph {
    ids: Arc<IdentityRegistry>,
    gpu: Arc<dyn GpuAllocator>,
    nodes: HashMap<ObjectId, GameObject>,
    owners: HashMap<ComponentId, ObjectId>,
    roots: Vec<ObjectId>,
    orders: HashMap<ObjectId, RootOrder>,
    /// Set whenever `validate` rebuilds anything; cleared by `take_changed`.
    changed: bool,
}

impl SceneGraph {
    pub fn new(ids: Arc<IdentityRegistry>, gpu: Arc<dyn GpuAllocator>) -> Self {
        Self {
            ids,
            gpu,
            nodes: HashMap::new(),
            owners: HashMap::new(),
            roots: Vec::new(),
            orders: HashMap::new(),
            changed: false,
        }
    }

    #[inline]
    pub fn ids(&self) -> &Arc<IdentityRegistry> {
        &self.ids
    }

    #[inline]
    pub fn gpu(&self) -> &dyn GpuAllocator {
        &*self.gpu
    }

    #[inline]
    pub fn gpu_arc(&self) -> &Arc<dyn GpuAllocator> {
        &self.gpu
    }

    // ── queries ───────────────────────────────────────────────────────────

    /// Number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of live components across all nodes.
    #[inline]
    pub fn component_count(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[inline]
    pub fn node(&self, id: ObjectId) -> Option<&GameObject> {
        self.nodes.get(&id)
    }

    #[inline]
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.nodes.get(&id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn name(&self, id: ObjectId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    /// First node with the given name, searched in traversal order of the roots.
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        let mut out = Vec::new();
        for &root in &self.roots {
            self.preorder(root, &mut out);
        }
        out.into_iter().find(|id| self.nodes[id].name == name)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            out.push(p);
            cursor = self.parent(p);
        }
        out
    }

    pub fn root_of(&self, id: ObjectId) -> ObjectId {
        self.ancestors(id).last().copied().unwrap_or(id)
    }

    /// True when `ancestor` lies strictly above `id`.
    pub fn is_ancestor(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            cursor = self.parent(p);
        }
        false
    }

    /// Descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.preorder(id, &mut out);
        if !out.is_empty() {
            out.remove(0);
        }
        out
    }

    /// Components of every descendant of `id` declaring `caps`, in traversal
    /// order. Components of `id` itself are not included.
    pub fn descendant_components(&self, id: ObjectId, caps: Capabilities) -> Vec<ComponentId> {
        self.descendants(id)
            .into_iter()
            .flat_map(|n| self.nodes[&n].components_with(caps).collect::<Vec<_>>())
            .collect()
    }

    pub fn owner_of(&self, component: ComponentId) -> Option<ObjectId> {
        self.owners.get(&component).copied()
    }

    pub fn capabilities_of(&self, component: ComponentId) -> Option<Capabilities> {
        self.slot(component).map(|s| s.caps)
    }

    /// The component, unless it is unknown or checked out by a running handler.
    pub fn component(&self, component: ComponentId) -> Option<&dyn Component> {
        self.slot(component)?.component.as_deref()
    }

    pub fn component_mut(&mut self, component: ComponentId) -> Option<&mut (dyn Component + 'static)> {
        self.slot_mut(component)?.component.as_deref_mut()
    }

    pub fn component_as<T: Component>(&self, component: ComponentId) -> Option<&T> {
        self.component(component)?.as_any().downcast_ref::<T>()
    }

    pub fn component_as_mut<T: Component>(&mut self, component: ComponentId) -> Option<&mut T> {
        self.component_mut(component)?.as_any_mut().downcast_mut::<T>()
    }

    /// First component of concrete type `T` on `node`.
    pub fn get<T: Component>(&self, node: ObjectId) -> Option<&T> {
        self.nodes
            .get(&node)?
            .slots
            .iter()
            .find_map(|s| s.component.as_deref()?.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Component>(&mut self, node: ObjectId) -> Option<&mut T> {
        self.nodes
            .get_mut(&node)?
            .slots
            .iter_mut()
            .find_map(|s| s.component.as_deref_mut()?.as_any_mut().downcast_mut::<T>())
    }

    /// The first Transform-capable component on `node`.
    pub fn transform(&self, node: ObjectId) -> Option<&dyn Transform> {
        self.nodes
            .get(&node)?
            .slots
            .iter()
            .filter(|s| s.caps.contains(Capabilities::TRANSFORM))
            .find_map(|s| s.component.as_deref()?.as_transform())
    }

    pub fn transform_mut(&mut self, node: ObjectId) -> Option<&mut dyn Transform> {
        self.nodes
            .get_mut(&node)?
            .slots
            .iter_mut()
            .filter(|s| s.caps.contains(Capabilities::TRANSFORM))
            .find_map(|s| s.component.as_deref_mut()?.as_transform_mut())
    }

    pub fn widget_mut(&mut self, component: ComponentId) -> Option<&mut dyn Widget> {
        let slot = self.slot_mut(component)?;
        if !slot.caps.contains(Capabilities::WIDGET) {
            return None;
        }
        slot.component.as_deref_mut()?.as_widget()
    }

    pub fn mask_mut(&mut self, component: ComponentId) -> Option<&mut dyn Mask> {
        let slot = self.slot_mut(component)?;
        if !slot.caps.contains(Capabilities::MASK) {
            return None;
        }
        slot.component.as_deref_mut()?.as_mask()
    }

    /// Layout frame of `node`, composing transforms from its root down.
    ///
    /// Nodes without a transform take their parent's frame; roots start from `base`.
    pub fn world_frame(&self, node: ObjectId, base: Rect) -> Rect {
        let mut chain = self.ancestors(node);
        chain.reverse();
        chain.push(node);
        chain.into_iter().fold(base, |frame, id| match self.transform(id) {
            Some(t) => t.frame_in(frame),
            None => frame,
        })
    }

    // ── structural mutation ───────────────────────────────────────────────

    /// Creates a node, as a new root when `parent` is `None`.
    ///
    /// The parent link is set before the node becomes visible to any other
    /// operation.
    pub fn spawn(&mut self, name: &str, parent: Option<ObjectId>) -> Result<ObjectId> {
        if let Some(p) = parent {
            self.require(p)?;
        }
        let id = self.ids.assign(name)?;
        self.nodes.insert(id, GameObject::new(id, name, parent));
        match parent {
            Some(p) => {
                if let Some(n) = self.nodes.get_mut(&p) {
                    n.children.push(id);
                }
                self.touch(p);
            }
            None => self.push_root(id),
        }
        Ok(id)
    }

    /// Moves `child` (with its subtree) to the end of `parent`'s children.
    ///
    /// The old link is removed in the same call, so a node never has two
    /// parents. Attaching a node under itself or one of its descendants is
    /// rejected with [`Error::Hierarchy`] and leaves the graph unchanged.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<()> {
        self.require(parent)?;
        self.require(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(Error::Hierarchy(format!(
                "cannot attach {child} under its own descendant {parent}"
            )));
        }
        if self.nodes[&child].parent == Some(parent) {
            return Ok(());
        }
        self.unlink(child);
        if let Some(n) = self.nodes.get_mut(&child) {
            n.parent = Some(parent);
        }
        if let Some(n) = self.nodes.get_mut(&parent) {
            n.children.push(child);
        }
        self.touch(parent);
        Ok(())
    }

    /// Detaches `child` from `parent` and destroys its subtree.
    pub fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<()> {
        self.require(parent)?;
        if self.require(child)?.parent != Some(parent) {
            return Err(Error::Hierarchy(format!("{child} is not a child of {parent}")));
        }
        self.destroy(child)
    }

    /// Reparents `child`, or makes it a root when `parent` is `None`.
    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> Result<()> {
        match parent {
            Some(p) => self.add_child(p, child),
            None => {
                if self.require(child)?.parent.is_some() {
                    self.unlink(child);
                    self.push_root(child);
                }
                Ok(())
            }
        }
    }

    /// Destroys `id` and its whole subtree: components are released against
    /// the GPU allocator and every node and component id is retired.
    pub fn destroy(&mut self, id: ObjectId) -> Result<()> {
        self.require(id)?;
        self.unlink(id);

        let mut subtree = Vec::new();
        self.preorder(id, &mut subtree);
        for node_id in subtree.iter().rev() {
            let Some(node) = self.nodes.remove(node_id) else { continue };
            for slot in node.slots {
                self.owners.remove(&slot.id);
                if let Some(mut component) = slot.component {
                    component.release(&*self.gpu);
                }
                self.ids.retire(slot.id);
            }
            self.ids.retire(*node_id);
        }
        debug!("SceneGraph: destroyed {} object(s) under {id}", subtree.len());
        Ok(())
    }

    /// Attaches `component` to `node` and returns its id.
    ///
    /// On failure the component is released and dropped.
    pub fn add_component(&mut self, node: ObjectId, mut component: Box<dyn Component>) -> Result<ComponentId> {
        let assigned = match self.nodes.contains_key(&node) {
            true => self.ids.assign(component.type_name()),
            false => Err(Error::not_found(NODE, node)),
        };
        let id = match assigned {
            Ok(id) => id,
            Err(e) => {
                component.release(&*self.gpu);
                return Err(e);
            }
        };
        let slot = Slot {
            id,
            caps: component.capabilities(),
            type_name: component.type_name(),
            started: false,
            component: Some(component),
        };
        if let Some(owner) = self.nodes.get_mut(&node) {
            owner.slots.push(slot);
        }
        self.owners.insert(id, node);
        self.touch(node);
        Ok(id)
    }

    /// Detaches and destroys a component.
    ///
    /// A component removed while its own handler runs is released when the
    /// handler returns.
    pub fn remove_component(&mut self, node: ObjectId, component: ComponentId) -> Result<()> {
        if self.owners.get(&component) != Some(&node) {
            return Err(Error::not_found(COMPONENT, component));
        }
        self.owners.remove(&component);
        let slot = self.nodes.get_mut(&node).and_then(|owner| {
            let pos = owner.slots.iter().position(|s| s.id == component)?;
            Some(owner.slots.remove(pos))
        });
        if let Some(mut c) = slot.and_then(|s| s.component) {
            c.release(&*self.gpu);
        }
        self.ids.retire(component);
        self.touch(node);
        Ok(())
    }

    // ── traversal cache ───────────────────────────────────────────────────

    pub fn is_dirty(&self) -> bool {
        self.roots
            .iter()
            .any(|r| self.orders.get(r).is_none_or(|o| o.dirty))
    }

    /// Rebuilds the cached traversal order of every dirty root.
    ///
    /// Clean roots keep their cache. Returns the number of roots rebuilt.
    pub fn validate(&mut self) -> usize {
        let mut rebuilt = 0;
        for i in 0..self.roots.len() {
            let root = self.roots[i];
            if self.orders.get(&root).is_some_and(|o| !o.dirty) {
                continue;
            }
            let mut nodes = Vec::new();
            self.preorder(root, &mut nodes);
            self.orders.insert(root, RootOrder { nodes, dirty: false });
            rebuilt += 1;
        }
        if rebuilt > 0 {
            self.changed = true;
            debug!("SceneGraph: revalidated {rebuilt} root(s)");
        }
        rebuilt
    }

    /// True if any traversal order was rebuilt since the last call.
    ///
    /// Broadcasts validate on their own, so this is how a caller learns that
    /// topology changed even when the rebuild happened mid-tick.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Current traversal order: roots in order, each root's subtree parent
    /// before children.
    pub fn traversal(&mut self) -> Vec<ObjectId> {
        self.validate();
        self.roots
            .iter()
            .flat_map(|r| self.orders[r].nodes.iter().copied())
            .collect()
    }

    // ── dispatch ──────────────────────────────────────────────────────────

    /// Delivers `message` to every Script component in traversal order.
    ///
    /// The order is snapshotted before the first handler runs; nodes created
    /// by handlers are reached from the next broadcast on. `Start` reaches
    /// only components that have not started yet, and every other message
    /// only reaches started components. Returns the number of deliveries.
    pub fn broadcast(&mut self, message: Message, env: &mut FrameEnv<'_>) -> usize {
        let order = self.traversal();
        let mut delivered = 0;
        for node in order {
            let targets: Vec<ComponentId> = match self.nodes.get(&node) {
                Some(n) => n.components_with(Capabilities::SCRIPT).collect(),
                None => continue,
            };
            for component in targets {
                if self.deliver(node, component, message, env) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Delivers `message` to one component. Returns false when it was skipped.
    pub fn send(&mut self, component: ComponentId, message: Message, env: &mut FrameEnv<'_>) -> bool {
        match self.owner_of(component) {
            Some(node) => self.deliver(node, component, message, env),
            None => false,
        }
    }

    fn deliver(&mut self, node: ObjectId, id: ComponentId, message: Message, env: &mut FrameEnv<'_>) -> bool {
        let Some(mut component) = self.check_out(node, id, message) else {
            return false;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            if let Some(script) = component.as_script() {
                let mut ctx = ScriptCtx { graph: &mut *self, env: &mut *env, owner: node, this: id };
                message.deliver(script, &mut ctx);
            }
        }));

        let type_name = component.type_name();
        self.check_in(node, id, component);

        if let Err(payload) = outcome {
            error!("SceneGraph: {message:?} handler of {type_name} {id} on {node} panicked");
            panic::resume_unwind(payload);
        }
        true
    }

    fn check_out(&mut self, node: ObjectId, id: ComponentId, message: Message) -> Option<Box<dyn Component>> {
        let slot = self.nodes.get_mut(&node)?.slot_mut(id)?;
        if !slot.caps.contains(Capabilities::SCRIPT) {
            return None;
        }
        match message {
            Message::Start if slot.started => return None,
            Message::Start => slot.started = true,
            _ if !slot.started => return None,
            _ => {}
        }
        slot.component.take()
    }

    fn check_in(&mut self, node: ObjectId, id: ComponentId, mut component: Box<dyn Component>) {
        let slot = self.nodes.get_mut(&node).and_then(|n| n.slot_mut(id));
        match slot {
            Some(slot) => slot.component = Some(component),
            // Removed or destroyed by its own handler.
            None => component.release(&*self.gpu),
        }
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn require(&self, id: ObjectId) -> Result<&GameObject> {
        self.nodes.get(&id).ok_or_else(|| Error::not_found(NODE, id))
    }

    fn slot(&self, id: ComponentId) -> Option<&Slot> {
        let owner = self.owners.get(&id)?;
        self.nodes.get(owner)?.slot(id)
    }

    fn slot_mut(&mut self, id: ComponentId) -> Option<&mut Slot> {
        let owner = *self.owners.get(&id)?;
        self.nodes.get_mut(&owner)?.slot_mut(id)
    }

    fn push_root(&mut self, id: ObjectId) {
        self.roots.push(id);
        self.orders.insert(id, RootOrder { nodes: Vec::new(), dirty: true });
    }

    /// Removes the link between `id` and its parent (or the root list).
    fn unlink(&mut self, id: ObjectId) {
        match self.nodes.get(&id).and_then(|n| n.parent) {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(&parent) {
                    p.children.retain(|c| *c != id);
                }
                self.touch(parent);
            }
            None => {
                self.roots.retain(|r| *r != id);
                self.orders.remove(&id);
            }
        }
        if let Some(n) = self.nodes.get_mut(&id) {
            n.parent = None;
        }
    }

    fn touch(&mut self, id: ObjectId) {
        let root = self.root_of(id);
        self.orders.entry(root).or_default().dirty = true;
    }

    fn preorder(&self, id: ObjectId, out: &mut Vec<ObjectId>) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.get(&next) else { continue };
            out.push(next);
            stack.extend(node.children.iter().rev().copied());
        }
    }
}

impl Drop for SceneGraph {
    fn drop(&mut self) {
        for root in self.roots.clone() {
            // Roots listed here are live, so destroy cannot fail.
            let _ = self.destroy(root);
        }
    }
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("roots", &self.roots)
            .field("nodes", &self.nodes.len())
            .field("components", &self.owners.len())
            .finish()
    }
}
