use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::registry::{Resource, ResourceRegistry};
use crate::error::{Error, Result};

trait ErasedRegistry: Send + Sync {
    fn clear(&self);
    fn len(&self) -> usize;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<R: Resource> ErasedRegistry for ResourceRegistry<R> {
    fn clear(&self) {
        ResourceRegistry::clear(self);
    }

    fn len(&self) -> usize {
        ResourceRegistry::len(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Registries of every resource kind, keyed by kind tag.
///
/// Tags are bound once; there is no way to unbind one. Teardown clears the
/// registries in reverse insertion order.
#[derive(Default)]
pub struct Resources {
    kinds: RwLock<Vec<(&'static str, Arc<dyn ErasedRegistry>)>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `registry` under its kind's own tag.
    pub fn insert<R: Resource>(&self, registry: Arc<ResourceRegistry<R>>) -> Result<()> {
        self.insert_as(R::KIND, registry)
    }

    /// Binds `registry` under an explicit tag.
    pub fn insert_as<R: Resource>(&self, tag: &'static str, registry: Arc<ResourceRegistry<R>>) -> Result<()> {
        let mut kinds = self.kinds.write().unwrap_or_else(PoisonError::into_inner);
        if kinds.iter().any(|(t, _)| *t == tag) {
            return Err(Error::already_exists("resource kind", tag));
        }
        let erased: Arc<dyn ErasedRegistry> = registry;
        kinds.push((tag, erased));
        Ok(())
    }

    /// The registry bound to `tag`, which must hold resources of kind `R`.
    pub fn registry<R: Resource>(&self, tag: &str) -> Result<Arc<ResourceRegistry<R>>> {
        let erased = {
            let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
            kinds
                .iter()
                .find(|(t, _)| *t == tag)
                .map(|(_, r)| Arc::clone(r))
                .ok_or_else(|| Error::not_found("resource kind", tag))?
        };
        erased
            .into_any()
            .downcast::<ResourceRegistry<R>>()
            .map_err(|_| Error::TypeMismatch {
                name: tag.to_string(),
                expected: R::KIND,
            })
    }

    /// Panicking [`registry`](Self::registry) under the kind's own tag. Startup wiring only.
    pub fn must<R: Resource>(&self) -> Arc<ResourceRegistry<R>> {
        match self.registry::<R>(R::KIND) {
            Ok(r) => r,
            Err(e) => panic!("must: {e}"),
        }
    }

    /// Looks up `name` in the registry bound to `tag`.
    pub fn get<R: Resource>(&self, tag: &str, name: &str) -> Result<Arc<R>> {
        self.registry::<R>(tag)?.get(name)
    }

    /// Total entries across all kinds.
    pub fn len(&self) -> usize {
        let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
        kinds.iter().map(|(_, r)| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears every registry, last bound first.
    pub fn teardown(&self) {
        let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
        for (tag, registry) in kinds.iter().rev() {
            log::debug!("tearing down {tag} registry ({} entries)", registry.len());
            registry.clear();
        }
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_list().entries(kinds.iter().map(|(t, _)| t)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{GpuAllocator, HeadlessGpu};
    use crate::identity::IdentityRegistry;
    use crate::resource::registry::tests::{blob, Blob};
    use crate::resource::ResourceSource;

    #[derive(Debug)]
    struct Other;

    impl Resource for Other {
        const KIND: &'static str = "other";

        fn decode(_: &mut ResourceSource) -> Result<Self> {
            Ok(Other)
        }

        fn allocate(&mut self, _: &dyn GpuAllocator) -> Result<()> {
            Ok(())
        }

        fn release(&self, _: &dyn GpuAllocator) {}
    }

    fn registry<R: Resource>() -> Arc<ResourceRegistry<R>> {
        Arc::new(ResourceRegistry::new(
            Arc::new(IdentityRegistry::new()),
            Arc::new(HeadlessGpu::new()),
        ))
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let hub = Resources::new();
        hub.insert(registry::<Blob>()).unwrap();
        assert!(matches!(hub.insert(registry::<Blob>()), Err(Error::AlreadyExists { .. })));
    }

    #[test]
    fn lookup_by_tag_and_name() {
        let hub = Resources::new();
        let blobs = registry::<Blob>();
        blobs.register("a", blob(b"payload")).unwrap();
        hub.insert(blobs).unwrap();

        assert_eq!(hub.get::<Blob>("blob", "a").unwrap().bytes, b"payload");
        assert!(matches!(hub.get::<Blob>("blob", "b"), Err(Error::NotFound { .. })));
        assert!(matches!(hub.get::<Blob>("mesh", "a"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn wrong_kind_is_type_mismatch() {
        let hub = Resources::new();
        hub.insert_as("blob", registry::<Other>()).unwrap();
        assert!(matches!(
            hub.registry::<Blob>("blob"),
            Err(Error::TypeMismatch { expected: "blob", .. })
        ));
    }

    #[test]
    fn teardown_clears_all_kinds() {
        let hub = Resources::new();
        let blobs = registry::<Blob>();
        blobs.register("a", blob(b"1")).unwrap();
        hub.insert(blobs.clone()).unwrap();
        hub.insert(registry::<Other>()).unwrap();
        assert_eq!(hub.len(), 1);
        hub.teardown();
        assert!(hub.is_empty());
        assert!(blobs.is_empty());
    }
}
