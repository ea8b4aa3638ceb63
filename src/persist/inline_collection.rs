use crate::core::{GraphError, InlinePayload, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Item types an inline collection can hold.
pub trait InlineItem: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> InlineItem for T where T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Container semantics declared for an inline collection property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// Ordered, duplicates allowed.
    List,
    /// Insertion-ordered, duplicates rejected.
    Set,
}

/// A property presented as a container but stored as one JSON payload.
///
/// Mutation goes through [`InlineCollectionMut`](super::edge::InlineCollectionMut)
/// so every change also lands in the owning entity's change log.
#[derive(Debug)]
pub struct InlineCollection<T> {
    name: String,
    kind: CollectionKind,
    items: Mutex<Vec<T>>,
}

impl<T: InlineItem> InlineCollection<T> {
    pub fn new(name: impl Into<String>, kind: CollectionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            items: Mutex::new(Vec::new()),
        }
    }

    /// Rebuilds a collection from a stored payload.
    pub fn from_transfer_data(
        name: impl Into<String>,
        kind: CollectionKind,
        payload: &str,
    ) -> Result<Self> {
        let name = name.into();
        let mut items: Vec<T> = serde_json::from_str(payload).map_err(|e| {
            GraphError::InvalidRecord(format!("inline collection '{name}' payload: {e}"))
        })?;
        if kind == CollectionKind::Set {
            dedup_in_order(&mut items);
        }
        Ok(Self {
            name,
            kind,
            items: Mutex::new(items),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Snapshot of the current items.
    pub fn items(&self) -> Result<Vec<T>> {
        Ok(self.items.lock()?.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.items.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.items.lock()?.is_empty())
    }

    pub fn contains(&self, item: &T) -> Result<bool> {
        Ok(self.items.lock()?.contains(item))
    }

    /// Payload the normalizer stores in place of the container.
    pub fn to_transfer_data(&self) -> Result<InlinePayload> {
        let items = self.items.lock()?;
        Ok(InlinePayload::new(serde_json::to_string(&*items)?))
    }

    pub(crate) fn push(&self, item: T) -> Result<bool> {
        let mut items = self.items.lock()?;
        if self.kind == CollectionKind::Set && items.contains(&item) {
            return Ok(false);
        }
        items.push(item);
        Ok(true)
    }

    pub(crate) fn remove(&self, item: &T) -> Result<bool> {
        let mut items = self.items.lock()?;
        match items.iter().position(|existing| existing == item) {
            Some(index) => {
                items.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn clear(&self) -> Result<bool> {
        let mut items = self.items.lock()?;
        let changed = !items.is_empty();
        items.clear();
        Ok(changed)
    }

    pub(crate) fn replace(&self, mut replacement: Vec<T>) -> Result<bool> {
        if self.kind == CollectionKind::Set {
            dedup_in_order(&mut replacement);
        }
        let mut items = self.items.lock()?;
        let changed = *items != replacement;
        *items = replacement;
        Ok(changed)
    }
}

fn dedup_in_order<T: PartialEq>(items: &mut Vec<T>) {
    let mut unique: Vec<T> = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    *items = unique;
}

/// Per-entity cache holding at most one inline collection per property name.
#[derive(Debug, Default)]
pub struct InlineCollectionRegistry {
    entries: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl InlineCollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collection registered under `name`, creating it with `init` if absent.
    ///
    /// Creation happens under the registry lock, so concurrent first accesses
    /// all observe the same instance. `Ok(None)` means the name is already
    /// taken by a collection of another item type.
    pub fn get_or_insert_with<T, F>(
        &self,
        name: &str,
        init: F,
    ) -> Result<Option<Arc<InlineCollection<T>>>>
    where
        T: InlineItem,
        F: FnOnce() -> Result<InlineCollection<T>>,
    {
        let mut entries = self.entries.lock()?;
        if let Some(existing) = entries.get(name) {
            return Ok(Arc::clone(existing).downcast::<InlineCollection<T>>().ok());
        }

        let created = Arc::new(init()?);
        entries.insert(
            name.to_string(),
            Arc::clone(&created) as Arc<dyn Any + Send + Sync>,
        );
        Ok(Some(created))
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.entries.lock()?.contains_key(name))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.lock()?.len())
    }
}
