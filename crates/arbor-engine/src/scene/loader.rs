//! Scene documents and the component-builder registry.
//!
//! A scene document is JSON:
//!
//! ```json
//! { "name": "menu",
//!   "objects": [
//!     { "name": "ui",
//!       "components": [ { "type": "ui.controller", "data": {} } ],
//!       "objects": [ ... ] } ] }
//! ```
//!
//! Each component's `data` is handed verbatim (as JSON text) to the builder
//! registered for its `type` tag. Building is all-or-nothing: any failure
//! destroys what was built so far and nothing partial stays reachable.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::component::Component;
use super::graph::SceneGraph;
use super::scene::Scene;
use crate::device::GpuAllocator;
use crate::error::{Error, Result};
use crate::identity::{IdentityRegistry, ObjectId};

const BUILDER: &str = "component builder";

type BuildFn = dyn Fn(&[u8]) -> Result<Box<dyn Component>> + Send + Sync;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<NodeDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDocument {
    pub name: String,
    #[serde(default, alias = "children")]
    pub objects: Vec<NodeDocument>,
    #[serde(default)]
    pub components: Vec<ComponentDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDocument {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<RawValue>>,
}

impl ComponentDocument {
    fn payload(&self) -> &[u8] {
        self.data.as_deref().map_or(&b"null"[..], |raw| raw.get().as_bytes())
    }
}

/// Type-tag → component constructor table.
///
/// Registration never overwrites; lookups of unknown tags fail with
/// [`Error::NotFound`].
#[derive(Default)]
pub struct ComponentBuilders {
    builders: BTreeMap<String, Arc<BuildFn>>,
}

impl ComponentBuilders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a builder receiving the raw JSON text of `data`.
    pub fn register<F>(&mut self, tag: &str, build: F) -> Result<()>
    where
        F: Fn(&[u8]) -> Result<Box<dyn Component>> + Send + Sync + 'static,
    {
        if self.builders.contains_key(tag) {
            return Err(Error::already_exists(BUILDER, tag));
        }
        self.builders.insert(tag.to_string(), Arc::new(build));
        debug!("ComponentBuilders: registered '{tag}'");
        Ok(())
    }

    /// Registers a builder whose `data` is decoded into `T` first.
    ///
    /// A missing `data` field decodes as JSON `null`.
    pub fn register_typed<T, F>(&mut self, tag: &str, build: F) -> Result<()>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> Result<Box<dyn Component>> + Send + Sync + 'static,
    {
        self.register(tag, move |bytes| build(serde_json::from_slice(bytes)?))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.builders.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Runs the builder for `tag` over `data`.
    pub fn build(&self, tag: &str, data: &[u8]) -> Result<Box<dyn Component>> {
        let build = self.builders.get(tag).ok_or_else(|| Error::not_found(BUILDER, tag))?;
        build(data)
    }

    /// Builds one node (with children before components, recursively) under
    /// `parent`.
    ///
    /// On failure the partially built subtree is destroyed and the error is
    /// annotated with the slash-separated path of the failing node.
    pub fn build_game_object(
        &self,
        graph: &mut SceneGraph,
        doc: &NodeDocument,
        parent: Option<ObjectId>,
    ) -> Result<ObjectId> {
        let base = match parent.and_then(|p| graph.name(p)) {
            Some(name) => name.to_string(),
            None => String::new(),
        };
        self.build_node(graph, doc, parent, &base)
    }

    fn build_node(
        &self,
        graph: &mut SceneGraph,
        doc: &NodeDocument,
        parent: Option<ObjectId>,
        base: &str,
    ) -> Result<ObjectId> {
        let path = if base.is_empty() { doc.name.clone() } else { format!("{base}/{}", doc.name) };
        let id = graph.spawn(&doc.name, parent).map_err(|e| e.at_node(&path))?;

        let filled = self.fill(graph, id, doc, &path);
        if let Err(e) = filled {
            // `id` was created above and nothing else holds it.
            let _ = graph.destroy(id);
            return Err(e.at_node(&path));
        }
        Ok(id)
    }

    fn fill(&self, graph: &mut SceneGraph, id: ObjectId, doc: &NodeDocument, path: &str) -> Result<()> {
        for child in &doc.objects {
            self.build_node(graph, child, Some(id), path)?;
        }
        for component in &doc.components {
            let built = self.build(&component.tag, component.payload())?;
            graph.add_component(id, built)?;
        }
        Ok(())
    }

    /// Builds a whole scene from a parsed document.
    ///
    /// Any failure drops the partially built graph, which destroys every node
    /// already created, so no part of the scene stays reachable.
    pub fn build_scene_document(
        &self,
        doc: &SceneDocument,
        ids: Arc<IdentityRegistry>,
        gpu: Arc<dyn GpuAllocator>,
    ) -> Result<Scene> {
        let mut graph = SceneGraph::new(ids, gpu);
        for root in &doc.objects {
            self.build_node(&mut graph, root, None, "")?;
        }
        debug!(
            "ComponentBuilders: built scene '{}' ({} objects, {} components)",
            doc.name,
            graph.len(),
            graph.component_count()
        );
        Ok(Scene::new(doc.name.clone(), graph))
    }

    /// Parses `bytes` as a scene document and builds it.
    pub fn build_scene(
        &self,
        bytes: &[u8],
        ids: Arc<IdentityRegistry>,
        gpu: Arc<dyn GpuAllocator>,
    ) -> Result<Scene> {
        let doc: SceneDocument = serde_json::from_slice(bytes)?;
        self.build_scene_document(&doc, ids, gpu)
    }
}

impl std::fmt::Debug for ComponentBuilders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.builders.keys()).finish()
    }
}
