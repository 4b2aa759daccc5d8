use crate::identity::ObjectId;

use super::component::{Capabilities, Component, ComponentId};

pub(crate) struct Slot {
    pub(crate) id: ComponentId,
    pub(crate) caps: Capabilities,
    pub(crate) type_name: &'static str,
    pub(crate) started: bool,
    /// `None` while the component is checked out for message delivery.
    pub(crate) component: Option<Box<dyn Component>>,
}

/// A node of the scene graph.
///
/// Children and components are listed in order; the parent is a non-owning
/// id resolved through the graph.
pub struct GameObject {
    pub(crate) id: ObjectId,
    pub(crate) name: String,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: Vec<ObjectId>,
    pub(crate) slots: Vec<Slot>,
}

impl GameObject {
    pub(crate) fn new(id: ObjectId, name: &str, parent: Option<ObjectId>) -> Self {
        Self {
            id,
            name: name.to_string(),
            parent,
            children: Vec::new(),
            slots: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// Component ids in attachment order.
    pub fn components(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.slots.iter().map(|s| s.id)
    }

    #[inline]
    pub fn component_count(&self) -> usize {
        self.slots.len()
    }

    /// Components declaring every capability in `caps`.
    pub fn components_with(&self, caps: Capabilities) -> impl Iterator<Item = ComponentId> + '_ {
        self.slots
            .iter()
            .filter(move |s| s.caps.contains(caps))
            .map(|s| s.id)
    }

    pub(crate) fn slot(&self, id: ComponentId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub(crate) fn slot_mut(&mut self, id: ComponentId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }
}

impl std::fmt::Debug for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let components: Vec<_> = self.slots.iter().map(|s| s.type_name).collect();
        f.debug_struct("GameObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("components", &components)
            .finish()
    }
}
