//! Caller-supplied services shared by every lineage of a run

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Entry = Arc<dyn Any + Send + Sync>;

/// A type-keyed bag of shared values.
///
/// Cloning is shallow: every clone sees the same entries, so a value inserted
/// by one handler is visible to all handlers of the same run.
#[derive(Clone, Default)]
pub struct Extensions {
    entries: Arc<RwLock<HashMap<TypeId, Entry>>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the one it replaced
    pub fn insert<T: Any + Send + Sync>(&self, value: T) -> Option<Arc<T>> {
        self.entries
            .write()
            .insert(TypeId::of::<T>(), Arc::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    /// Builder-style insert
    pub fn with<T: Any + Send + Sync>(self, value: T) -> Self {
        self.insert(value);
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    pub fn remove<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .write()
            .remove(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("entries", &self.len())
            .finish()
    }
}
