use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::error::{Error, Result};

/// Process-unique identifier of an engine object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjectId(u64);

impl ObjectId {
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Non-owning view of a live object returned by [`IdentityRegistry::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub name: String,
}

struct Record {
    name: String,
    object: Option<Weak<dyn Any + Send + Sync>>,
}

impl Record {
    fn is_alive(&self) -> bool {
        self.object.as_ref().is_none_or(|w| w.strong_count() > 0)
    }
}

/// Issues object ids and resolves them weakly.
///
/// Ids start at 1 and increase monotonically. When the counter would overflow
/// `assign` returns [`Error::IdentifiersExhausted`] instead of wrapping, so an
/// id can never alias a live object.
pub struct IdentityRegistry {
    next: AtomicU64,
    live: RwLock<HashMap<ObjectId, Record>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub(crate) fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
            live: RwLock::new(HashMap::new()),
        }
    }

    /// Issues the next id for an object named `name`.
    pub fn assign(&self, name: &str) -> Result<ObjectId> {
        let raw = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            .map_err(|_| Error::IdentifiersExhausted)?;
        let id = ObjectId(raw);
        self.write().insert(id, Record { name: name.to_string(), object: None });
        Ok(id)
    }

    /// Binds a shared object to `id` so [`resolve`](Self::resolve) can reach it.
    ///
    /// The registry only keeps a `Weak`; dropping the last `Arc` makes the id
    /// unresolvable even before it is retired.
    pub fn attach<T: Any + Send + Sync>(&self, id: ObjectId, object: &Arc<T>) -> Result<()> {
        let mut live = self.write();
        let record = live.get_mut(&id).ok_or_else(|| Error::not_found("object", id))?;
        let shared: Arc<dyn Any + Send + Sync> = object.clone();
        record.object = Some(Arc::downgrade(&shared));
        Ok(())
    }

    /// Returns the object's name if it is still alive.
    pub fn lookup(&self, id: ObjectId) -> Option<ObjectRef> {
        let live = self.read();
        let record = live.get(&id)?;
        record
            .is_alive()
            .then(|| ObjectRef { id, name: record.name.clone() })
    }

    /// Upgrades the object attached to `id` and downcasts it to `T`.
    pub fn resolve<T: Any + Send + Sync>(&self, id: ObjectId) -> Result<Arc<T>> {
        let live = self.read();
        let record = live.get(&id).ok_or_else(|| Error::not_found("object", id))?;
        let object = record
            .object
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::not_found("object", id))?;
        object.downcast::<T>().map_err(|_| Error::TypeMismatch {
            name: record.name.clone(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Renames a live object. Returns `false` if the id is not live.
    pub fn rename(&self, id: ObjectId, name: &str) -> bool {
        match self.write().get_mut(&id) {
            Some(record) => {
                record.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Marks `id` destroyed. Returns `false` if it was not live.
    pub fn retire(&self, id: ObjectId) -> bool {
        self.write().remove(&id).is_some()
    }

    /// Number of ids currently registered (retired ids excluded).
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ObjectId, Record>> {
        self.live.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ObjectId, Record>> {
        self.live.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("next", &self.next.load(Ordering::Relaxed))
            .field("live", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    // ── assign ────────────────────────────────────────────────────────────

    #[test]
    fn ids_are_pairwise_distinct() {
        let reg = IdentityRegistry::new();
        let mut seen = HashSet::new();
        for i in 0..1000 {
            let id = reg.assign(&format!("obj{i}")).unwrap();
            assert!(seen.insert(id), "duplicate id {id}");
        }
        assert_eq!(reg.len(), 1000);
    }

    #[test]
    fn ids_are_not_reused_after_retire() {
        let reg = IdentityRegistry::new();
        let a = reg.assign("a").unwrap();
        assert!(reg.retire(a));
        let b = reg.assign("b").unwrap();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn overflow_is_rejected() {
        let reg = IdentityRegistry::starting_at(u64::MAX - 1);
        assert!(reg.assign("last").is_ok());
        assert!(matches!(reg.assign("one too many"), Err(Error::IdentifiersExhausted)));
        assert!(matches!(reg.assign("still"), Err(Error::IdentifiersExhausted)));
    }

    // ── lookup ────────────────────────────────────────────────────────────

    #[test]
    fn lookup_fails_after_retire() {
        let reg = IdentityRegistry::new();
        let id = reg.assign("node").unwrap();
        assert_eq!(reg.lookup(id).unwrap().name, "node");
        reg.retire(id);
        assert!(reg.lookup(id).is_none());
        assert!(!reg.retire(id));
    }

    #[test]
    fn lookup_fails_once_attached_object_is_dropped() {
        let reg = IdentityRegistry::new();
        let id = reg.assign("blob").unwrap();
        let obj = Arc::new(42u32);
        reg.attach(id, &obj).unwrap();
        assert!(reg.lookup(id).is_some());
        drop(obj);
        assert!(reg.lookup(id).is_none());
        assert!(matches!(reg.resolve::<u32>(id), Err(Error::NotFound { .. })));
    }

    #[test]
    fn lookup_does_not_extend_lifetime() {
        let reg = IdentityRegistry::new();
        let id = reg.assign("blob").unwrap();
        let obj = Arc::new(String::from("hello"));
        reg.attach(id, &obj).unwrap();
        assert_eq!(Arc::strong_count(&obj), 1);
    }

    // ── resolve ───────────────────────────────────────────────────────────

    #[test]
    fn resolve_downcasts() {
        let reg = IdentityRegistry::new();
        let id = reg.assign("n").unwrap();
        let obj = Arc::new(7i64);
        reg.attach(id, &obj).unwrap();
        assert_eq!(*reg.resolve::<i64>(id).unwrap(), 7);
        assert!(matches!(reg.resolve::<u8>(id), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn attach_to_retired_id_fails() {
        let reg = IdentityRegistry::new();
        let id = reg.assign("gone").unwrap();
        reg.retire(id);
        assert!(reg.attach(id, &Arc::new(1u8)).is_err());
    }

    #[test]
    fn rename_live_object() {
        let reg = IdentityRegistry::new();
        let id = reg.assign("old").unwrap();
        assert!(reg.rename(id, "new"));
        assert_eq!(reg.lookup(id).unwrap().name, "new");
    }
}
