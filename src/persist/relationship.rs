use super::record::RawRecord;
use crate::core::Result;
use async_trait::async_trait;
use serde_json::{Map, Value as Json};
use std::sync::{Arc, Mutex};

/// A vertex type an edge can point at.
pub trait GraphVertex: Send + Sync + 'static {
    /// Label vertices of this type are stored under; `None` accepts any label.
    fn vertex_label() -> Option<&'static str>
    where
        Self: Sized,
    {
        None
    }

    /// Key identifying the vertex; empty when it has none yet.
    fn entity_key(&self) -> &str;

    /// Fresh vertex for a key the store does not know yet.
    fn create(key: &str) -> Self
    where
        Self: Sized;

    /// Vertex rebuilt from a stored record.
    fn from_record(record: &RawRecord) -> Result<Self>
    where
        Self: Sized;
}

/// Context endpoints are resolved through.
#[async_trait]
pub trait GraphContext: Send + Sync {
    /// Returns the vertex stored under `id`, creating it when the store has none.
    ///
    /// Must be idempotent for a given identifier.
    async fn get_or_create<V: GraphVertex>(&self, id: &str) -> Result<Arc<V>>;
}

/// Label-agnostic vertex carrying only its key, label and raw properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexRef {
    key: String,
    label: Option<String>,
    properties: Map<String, Json>,
}

impl VertexRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn properties(&self) -> &Map<String, Json> {
        &self.properties
    }
}

impl GraphVertex for VertexRef {
    fn entity_key(&self) -> &str {
        &self.key
    }

    fn create(key: &str) -> Self {
        Self::new(key)
    }

    fn from_record(record: &RawRecord) -> Result<Self> {
        Ok(Self {
            key: record.id()?,
            label: Some(record.label()?.to_string()),
            properties: record.properties().clone(),
        })
    }
}

/// One side of an edge: the stored identifier plus the lazily resolved vertex.
#[derive(Debug)]
pub struct Endpoint<V> {
    id: Option<String>,
    resolved: Mutex<Option<Arc<V>>>,
}

impl<V> Default for Endpoint<V> {
    fn default() -> Self {
        Self {
            id: None,
            resolved: Mutex::new(None),
        }
    }
}

impl<V: GraphVertex> Endpoint<V> {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Resolved vertex, if one has been cached.
    pub fn cached(&self) -> Result<Option<Arc<V>>> {
        Ok(self.resolved.lock()?.clone())
    }

    /// Sets the identifier directly and drops a cached vertex that no longer matches.
    pub(crate) fn set_id(&mut self, id: Option<String>) -> Result<()> {
        let mut resolved = self.resolved.lock()?;
        if resolved
            .as_ref()
            .is_some_and(|v| Some(v.entity_key()) != id.as_deref())
        {
            *resolved = None;
        }
        drop(resolved);
        self.id = id;
        Ok(())
    }

    /// Caches `vertex` and takes its key as the identifier.
    ///
    /// Skipped entirely when the cached vertex already has the same key.
    /// Returns whether the identifier changed.
    pub(crate) fn assign(&mut self, vertex: Arc<V>) -> Result<bool> {
        let mut resolved = self.resolved.lock()?;
        if resolved
            .as_ref()
            .is_some_and(|current| current.entity_key() == vertex.entity_key())
        {
            return Ok(false);
        }

        let previous = self.id.clone();
        if !vertex.entity_key().is_empty() {
            self.id = Some(vertex.entity_key().to_string());
        }
        *resolved = Some(vertex);
        Ok(self.id != previous)
    }

    /// Returns the cached vertex or fetches it through `context` and caches it.
    ///
    /// Concurrent callers may both reach the context; the last result stored wins.
    /// `Ok(None)` means there is no identifier to resolve.
    pub(crate) async fn resolve<C: GraphContext>(
        &self,
        context: &C,
    ) -> Result<Option<Arc<V>>> {
        if let Some(vertex) = self.cached()? {
            return Ok(Some(vertex));
        }
        let Some(id) = self.id.clone() else {
            return Ok(None);
        };

        let vertex = context.get_or_create::<V>(&id).await?;
        self.store(Arc::clone(&vertex))?;
        Ok(Some(vertex))
    }

    fn store(&self, vertex: Arc<V>) -> Result<()> {
        *self.resolved.lock()? = Some(vertex);
        Ok(())
    }
}
