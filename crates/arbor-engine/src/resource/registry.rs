use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::source::ResourceSource;
use crate::device::GpuAllocator;
use crate::error::{Error, Result};
use crate::identity::{IdentityRegistry, ObjectId};

/// A loadable kind of resource with an explicit GPU lifecycle.
pub trait Resource: Send + Sync + Sized + 'static {
    /// Tag naming this kind in errors and in [`Resources`](super::Resources).
    const KIND: &'static str;

    /// Decodes raw content. Must not touch the GPU.
    fn decode(source: &mut ResourceSource) -> Result<Self>;

    /// Acquires GPU objects. On failure, anything acquired so far is released.
    fn allocate(&mut self, gpu: &dyn GpuAllocator) -> Result<()>;

    /// Releases every GPU object held by this instance.
    fn release(&self, gpu: &dyn GpuAllocator);
}

struct Entry<R> {
    id: ObjectId,
    instance: Arc<R>,
}

/// Name → resource cache for one resource kind.
///
/// Names are unique; a second registration under the same name fails with
/// [`Error::AlreadyExists`] and leaves the registry untouched.
pub struct ResourceRegistry<R: Resource> {
    ids: Arc<IdentityRegistry>,
    gpu: Arc<dyn GpuAllocator>,
    entries: RwLock<BTreeMap<String, Entry<R>>>,
}

impl<R: Resource> ResourceRegistry<R> {
    pub fn new(ids: Arc<IdentityRegistry>, gpu: Arc<dyn GpuAllocator>) -> Self {
        Self {
            ids,
            gpu,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Decodes `source` and registers it under the source's base name.
    pub fn load(&self, mut source: ResourceSource) -> Result<ObjectId> {
        let name = source.name().to_string();
        if self.contains(&name) {
            return Err(Error::already_exists(R::KIND, name));
        }
        let instance = R::decode(&mut source)?;
        self.register(&name, instance)
    }

    /// Allocates `instance` on the GPU and stores it under `name`.
    ///
    /// If allocation fails nothing is inserted and the issued id is retired.
    pub fn register(&self, name: &str, mut instance: R) -> Result<ObjectId> {
        let mut entries = self.write();
        if entries.contains_key(name) {
            return Err(Error::already_exists(R::KIND, name));
        }

        let id = self.ids.assign(name)?;
        if let Err(e) = instance.allocate(self.gpu.as_ref()) {
            self.ids.retire(id);
            log::debug!("{} '{name}': allocation failed: {e}", R::KIND);
            return Err(e);
        }

        let instance = Arc::new(instance);
        self.ids.attach(id, &instance)?;
        entries.insert(name.to_string(), Entry { id, instance });
        log::debug!("{} '{name}' registered as {id}", R::KIND);
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Result<Arc<R>> {
        self.read()
            .get(name)
            .map(|e| Arc::clone(&e.instance))
            .ok_or_else(|| Error::not_found(R::KIND, name))
    }

    /// Like [`get`](Self::get) but panics. Only for startup wiring.
    pub fn must_get(&self, name: &str) -> Arc<R> {
        match self.get(name) {
            Ok(r) => r,
            Err(e) => panic!("must_get: {e}"),
        }
    }

    pub fn id_of(&self, name: &str) -> Result<ObjectId> {
        self.read()
            .get(name)
            .map(|e| e.id)
            .ok_or_else(|| Error::not_found(R::KIND, name))
    }

    /// Non-owning reference to `name` that stops resolving once it is evicted.
    pub fn link(&self, name: &str) -> Result<ResourceLink<R>> {
        let id = self.id_of(name)?;
        Ok(ResourceLink { ids: Arc::clone(&self.ids), id, kind: PhantomData })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Removes `name`, releasing its GPU objects and retiring its id.
    pub fn evict(&self, name: &str) -> Result<()> {
        let entry = self
            .write()
            .remove(name)
            .ok_or_else(|| Error::not_found(R::KIND, name))?;
        self.destroy(name, entry);
        Ok(())
    }

    /// Evicts everything.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.write());
        for (name, entry) in drained {
            self.destroy(&name, entry);
        }
    }

    fn destroy(&self, name: &str, entry: Entry<R>) {
        entry.instance.release(self.gpu.as_ref());
        self.ids.retire(entry.id);
        log::debug!("{} '{name}' released", R::KIND);
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Entry<R>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Entry<R>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Resource> Drop for ResourceRegistry<R> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<R: Resource> fmt::Debug for ResourceRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("kind", &R::KIND)
            .field("len", &self.len())
            .finish()
    }
}

/// A registry entry reached through its object id.
///
/// Holding a link keeps nothing alive. After [`ResourceRegistry::evict`] or
/// [`ResourceRegistry::clear`] the id is retired and [`resolve`](Self::resolve)
/// returns `None`, so GPU handles of a released resource are never handed out.
pub struct ResourceLink<R: Resource> {
    ids: Arc<IdentityRegistry>,
    id: ObjectId,
    kind: PhantomData<fn() -> R>,
}

impl<R: Resource> ResourceLink<R> {
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Registered name, while the entry is live.
    pub fn name(&self) -> Option<String> {
        self.ids.lookup(self.id).map(|r| r.name)
    }

    pub fn resolve(&self) -> Option<Arc<R>> {
        self.ids.resolve::<R>(self.id).ok()
    }

    pub fn is_live(&self) -> bool {
        self.ids.lookup(self.id).is_some()
    }
}

impl<R: Resource> Clone for ResourceLink<R> {
    fn clone(&self) -> Self {
        Self { ids: Arc::clone(&self.ids), id: self.id, kind: PhantomData }
    }
}

impl<R: Resource> fmt::Debug for ResourceLink<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLink")
            .field("kind", &R::KIND)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::thread;

    use super::*;
    use crate::device::{GpuHandle, HeadlessGpu};

    /// Minimal resource: a byte blob uploaded into one buffer.
    #[derive(Debug)]
    pub(crate) struct Blob {
        pub bytes: Vec<u8>,
        pub handle: Option<GpuHandle>,
    }

    impl Resource for Blob {
        const KIND: &'static str = "blob";

        fn decode(source: &mut ResourceSource) -> Result<Self> {
            let bytes = source.read_all()?;
            if bytes.is_empty() {
                return Err(Error::invalid("empty blob"));
            }
            Ok(Blob { bytes, handle: None })
        }

        fn allocate(&mut self, gpu: &dyn GpuAllocator) -> Result<()> {
            self.handle = Some(gpu.create_buffer("blob", &self.bytes)?);
            Ok(())
        }

        fn release(&self, gpu: &dyn GpuAllocator) {
            if let Some(h) = self.handle {
                gpu.release(h);
            }
        }
    }

    pub(crate) fn blob(bytes: &[u8]) -> Blob {
        Blob { bytes: bytes.to_vec(), handle: None }
    }

    fn fixture() -> (Arc<IdentityRegistry>, Arc<HeadlessGpu>, ResourceRegistry<Blob>) {
        let ids = Arc::new(IdentityRegistry::new());
        let gpu = Arc::new(HeadlessGpu::new());
        let reg = ResourceRegistry::new(ids.clone(), gpu.clone());
        (ids, gpu, reg)
    }

    // ── register ──────────────────────────────────────────────────────────

    #[test]
    fn duplicate_register_is_rejected_without_mutation() {
        let (_, gpu, reg) = fixture();
        reg.register("a", blob(b"one")).unwrap();
        let err = reg.register("a", blob(b"two")).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { kind: "blob", .. }));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("a").unwrap().bytes, b"one");
        assert_eq!(gpu.live(), 1);
    }

    #[test]
    fn failed_allocation_rolls_back() {
        let (ids, gpu, reg) = fixture();
        gpu.fail_next(1);
        assert!(matches!(reg.register("a", blob(b"x")), Err(Error::Gpu(_))));
        assert!(!reg.contains("a"));
        assert!(ids.is_empty());
        assert_eq!(gpu.live(), 0);

        reg.register("a", blob(b"x")).unwrap();
        assert!(reg.contains("a"));
    }

    #[test]
    fn registered_entries_are_identified_objects() {
        let (ids, _, reg) = fixture();
        let id = reg.register("a", blob(b"x")).unwrap();
        assert_eq!(reg.id_of("a").unwrap(), id);
        assert_eq!(ids.lookup(id).unwrap().name, "a");
        let resolved = ids.resolve::<Blob>(id).unwrap();
        assert_eq!(resolved.bytes, b"x");
    }

    // ── load ──────────────────────────────────────────────────────────────

    #[test]
    fn load_uses_base_name() {
        let (_, _, reg) = fixture();
        reg.load(ResourceSource::from_bytes("data/x/blob.bin", b"abc".to_vec())).unwrap();
        assert_eq!(reg.names(), vec!["blob.bin".to_string()]);
    }

    #[test]
    fn load_propagates_decode_errors() {
        let (_, gpu, reg) = fixture();
        let err = reg.load(ResourceSource::from_bytes("empty", Vec::new())).unwrap_err();
        assert!(matches!(err, Error::InvalidContent(_)));
        assert!(reg.is_empty());
        assert_eq!(gpu.live(), 0);
    }

    // ── get / evict ───────────────────────────────────────────────────────

    #[test]
    fn get_missing_is_not_found() {
        let (_, _, reg) = fixture();
        assert!(matches!(reg.get("nope"), Err(Error::NotFound { kind: "blob", .. })));
    }

    #[test]
    #[should_panic(expected = "must_get")]
    fn must_get_panics_on_missing() {
        let (_, _, reg) = fixture();
        reg.must_get("nope");
    }

    #[test]
    fn evict_releases_and_retires() {
        let (ids, gpu, reg) = fixture();
        let id = reg.register("a", blob(b"x")).unwrap();
        reg.evict("a").unwrap();
        assert_eq!(gpu.live(), 0);
        assert!(ids.lookup(id).is_none());
        assert!(matches!(reg.evict("a"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn link_stops_resolving_after_evict() {
        let (_, _, reg) = fixture();
        reg.register("a", blob(b"x")).unwrap();
        let link = reg.link("a").unwrap();
        let held = reg.get("a").unwrap();
        assert_eq!(link.resolve().unwrap().bytes, b"x");
        assert_eq!(link.name().as_deref(), Some("a"));

        reg.evict("a").unwrap();
        assert!(link.resolve().is_none());
        assert!(!link.is_live());
        // an outstanding Arc does not revive the entry
        assert_eq!(held.bytes, b"x");
        assert!(matches!(reg.link("a"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn drop_releases_everything() {
        let (ids, gpu, reg) = fixture();
        reg.register("a", blob(b"1")).unwrap();
        reg.register("b", blob(b"2")).unwrap();
        drop(reg);
        assert_eq!(gpu.live(), 0);
        assert!(ids.is_empty());
    }

    // ── concurrency ───────────────────────────────────────────────────────

    #[test]
    fn concurrent_readers_and_writer() {
        let (_, _, reg) = fixture();
        let reg = Arc::new(reg);
        reg.register("shared", blob(b"s")).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    for _ in 0..200 {
                        assert_eq!(reg.get("shared").unwrap().bytes, b"s");
                    }
                })
            })
            .collect();

        for i in 0..50 {
            reg.register(&format!("w{i}"), blob(b"w")).unwrap();
        }
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(reg.len(), 51);
    }
}
