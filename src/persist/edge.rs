use super::inline_collection::{
    CollectionKind, InlineCollection, InlineCollectionRegistry, InlineItem,
};
use super::normalize::{TimestampUnit, normalize};
use super::record::RawRecord;
use super::relationship::{Endpoint, GraphContext, GraphVertex};
use super::render::{render_literal, to_camel_case};
use super::statement::{self, EdgeSelector, RenderMode, Statement, StatementParts};
use super::update_chain::UpdateChain;
use crate::connection::config::MapperConfig;
use crate::core::{GraphError, Result, UNASSIGNED_KEY, Value};
use serde_json::{Map, Value as Json};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Generates a new entity key (UUID v4).
pub fn new_entity_key() -> String {
    Uuid::new_v4().to_string()
}

/// Lifecycle state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Not stored yet; always needs an insert.
    New,
    /// Matches the stored element.
    Clean,
    /// Stored, with pending changes.
    Dirty,
    /// Marked for removal. Terminal until the next reset.
    Deleted,
}

/// Synchronous hook on the property setter path.
pub trait PropertyObserver: Send + Sync {
    /// Called before a changed value is recorded.
    fn property_changing(&self, _label: &str, _property: &str, _old: &Value, _new: &Value) {}

    /// Called once the value is recorded.
    fn property_changed(&self, _label: &str, _property: &str, _value: &Value) {}
}

/// Change-tracking state of one edge between a `TIn` and a `TOut` vertex.
///
/// Writes go through `&mut self`; one writer at a time per entity.
/// Endpoint resolution only needs `&self` and may run concurrently with reads.
pub struct EdgeEntity<TIn, TOut> {
    label: String,
    entity_key: Option<String>,
    in_v: Endpoint<TIn>,
    out_v: Endpoint<TOut>,
    changes: UpdateChain,
    selector: Option<EdgeSelector>,
    is_new: bool,
    dirty: bool,
    deleted: bool,
    loading: bool,
    mode: RenderMode,
    timestamp_unit: TimestampUnit,
    collections: InlineCollectionRegistry,
    loaded_properties: Map<String, Json>,
    observers: Vec<Arc<dyn PropertyObserver>>,
}

impl<TIn, TOut> fmt::Debug for EdgeEntity<TIn, TOut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeEntity")
            .field("label", &self.label)
            .field("entity_key", &self.entity_key)
            .field("changes", &self.changes)
            .field("is_new", &self.is_new)
            .field("dirty", &self.dirty)
            .field("deleted", &self.deleted)
            .finish_non_exhaustive()
    }
}

impl<TIn: GraphVertex, TOut: GraphVertex> EdgeEntity<TIn, TOut> {
    /// New edge with a generated key.
    pub fn new(label: impl Into<String>) -> Self {
        Self::blank(label.into(), Some(new_entity_key()))
    }

    /// New edge with a caller-supplied key.
    pub fn with_key(label: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let mut edge = Self::blank(label.into(), None);
        edge.assign_key(key)?;
        Ok(edge)
    }

    /// New edge whose key is assigned later through [`assign_key`](Self::assign_key).
    pub fn unkeyed(label: impl Into<String>) -> Self {
        Self::blank(label.into(), None)
    }

    fn blank(label: String, entity_key: Option<String>) -> Self {
        let mut edge = Self {
            label,
            entity_key,
            in_v: Endpoint::default(),
            out_v: Endpoint::default(),
            changes: UpdateChain::new(),
            selector: None,
            is_new: true,
            dirty: false,
            deleted: false,
            loading: false,
            mode: RenderMode::default(),
            timestamp_unit: TimestampUnit::default(),
            collections: InlineCollectionRegistry::new(),
            loaded_properties: Map::new(),
            observers: Vec::new(),
        };
        edge.reset(true);
        edge
    }

    /// Applies the rendering settings of `config`.
    ///
    /// Pending changes are kept; they are normalized at synthesis time.
    pub fn attach(&mut self, config: &MapperConfig) {
        self.mode = config.render_mode();
        self.timestamp_unit = config.timestamp_unit;
    }

    pub fn subscribe(&mut self, observer: Arc<dyn PropertyObserver>) {
        self.observers.push(observer);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn key(&self) -> Option<&str> {
        self.entity_key.as_deref()
    }

    pub fn render_mode(&self) -> RenderMode {
        self.mode
    }

    pub fn timestamp_unit(&self) -> TimestampUnit {
        self.timestamp_unit
    }

    /// Sets the entity key. A different key than the one already held is rejected.
    pub fn assign_key(&mut self, key: impl Into<String>) -> Result<()> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(self.invalid_key(&key, "key must not be empty"));
        }
        match self.entity_key.as_deref() {
            Some(current) if current == key => return Ok(()),
            Some(_) => return Err(self.invalid_key(&key, "entity already has a different key")),
            None => {}
        }

        self.entity_key = Some(key.clone());
        if !self.is_new && self.selector.is_none() {
            self.selector = Some(EdgeSelector::Existing { key });
        }
        Ok(())
    }

    pub fn state(&self) -> EntityState {
        if self.deleted {
            EntityState::Deleted
        } else if self.is_new {
            EntityState::New
        } else if self.dirty {
            EntityState::Dirty
        } else {
            EntityState::Clean
        }
    }

    /// Whether saving would send a statement. New and deleted entities always are.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.is_new || self.deleted
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn changes(&self) -> &UpdateChain {
        &self.changes
    }

    /// Raw stored value of a property, as last loaded.
    pub fn loaded_property(&self, property: &str) -> Option<&Json> {
        self.loaded_properties.get(property).filter(|v| !v.is_null())
    }

    /// Whether writing `new` over `old` counts as a change.
    pub fn property_changing(&self, old: &Value, new: &Value) -> bool {
        (self.is_new && !new.is_null()) || old.text_repr() != new.text_repr()
    }

    /// Setter path behind every typed field.
    ///
    /// Returns whether the change log changed. Writes during a load are
    /// ignored. A null value is never written; it only withdraws a pending
    /// value of the same property.
    pub fn write_property(&mut self, name: &str, old: &Value, new: Value) -> Result<bool> {
        if self.loading {
            return Ok(false);
        }
        self.ensure_writable()?;
        if !self.property_changing(old, &new) {
            return Ok(false);
        }

        let property = to_camel_case(name);
        if self.mode == RenderMode::Literal && !new.is_null() {
            let normalized = normalize(&new, self.timestamp_unit);
            if render_literal(&normalized).is_none() {
                return Err(GraphError::UnsupportedValue {
                    label: self.label.clone(),
                    key: self.key_for_errors(),
                    property,
                    type_name: normalized.type_name(),
                });
            }
        }

        Ok(self.record_change(property, old, new))
    }

    /// Untyped write, compared against the pending value of the property,
    /// or its stored value when nothing is pending.
    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) -> Result<bool> {
        let property = to_camel_case(name);
        let old = match self.changes.get(&property) {
            Some(pending) => pending.clone(),
            None => self
                .loaded_property(&property)
                .map_or(Value::Null, Value::from_stored),
        };
        self.write_property(name, &old, value.into())
    }

    fn record_change(&mut self, property: String, old: &Value, new: Value) -> bool {
        for observer in &self.observers {
            observer.property_changing(&self.label, &property, old, &new);
        }
        if new.is_null() {
            let removed = self.changes.remove(&property);
            if removed {
                self.dirty = !self.changes.is_empty();
            }
            return removed;
        }
        self.changes.upsert(property.clone(), new.clone());
        self.dirty = true;
        for observer in &self.observers {
            observer.property_changed(&self.label, &property, &new);
        }
        true
    }

    /// Marks the edge for removal. Allowed from any state.
    pub fn delete(&mut self) {
        self.deleted = true;
        self.changes.mark_deleted();
    }

    /// Clears pending changes and deletion, and rebuilds the selector.
    pub fn reset(&mut self, is_new: bool) {
        self.changes.clear();
        self.is_new = is_new;
        self.dirty = false;
        self.deleted = false;
        self.selector = if is_new {
            Some(EdgeSelector::Insert)
        } else {
            self.entity_key
                .clone()
                .map(|key| EdgeSelector::Existing { key })
        };
    }

    /// Folds the pending assignments into the stored view and marks the edge clean.
    ///
    /// Called once the store has accepted the statement.
    pub fn accept_changes(&mut self) {
        let unit = self.timestamp_unit;
        for (property, value) in self.changes.assignments() {
            self.loaded_properties
                .insert(property.to_string(), normalize(value, unit).to_json());
        }
        self.reset(false);
    }

    /// Starts populating the entity from a stored record.
    ///
    /// A label mismatch or an undecodable record leaves the entity untouched.
    /// Field writes until [`complete_load`](Self::complete_load) are not tracked.
    pub fn begin_load(&mut self, record: &RawRecord) -> Result<()> {
        let found = record.label()?;
        if found != self.label {
            return Err(GraphError::TypeMismatch {
                expected: self.label.clone(),
                found: found.to_string(),
                key: record.id().unwrap_or_else(|_| UNASSIGNED_KEY.to_string()),
            });
        }
        let key = record.id()?;
        let in_vertex_id = record.in_vertex_id()?;
        let out_vertex_id = record.out_vertex_id()?;

        self.loading = true;
        self.entity_key = Some(key);
        self.in_v.set_id(Some(in_vertex_id))?;
        self.out_v.set_id(Some(out_vertex_id))?;
        self.loaded_properties = record.properties().clone();
        self.is_new = false;
        Ok(())
    }

    /// Ends a load; the entity is clean afterwards.
    pub fn complete_load(&mut self) {
        self.loading = false;
        self.reset(false);
    }

    pub fn load(&mut self, record: &RawRecord) -> Result<()> {
        self.begin_load(record)?;
        self.complete_load();
        Ok(())
    }

    pub fn in_vertex_id(&self) -> Option<&str> {
        self.in_v.id()
    }

    pub fn out_vertex_id(&self) -> Option<&str> {
        self.out_v.id()
    }

    pub fn set_in_vertex_id(&mut self, id: impl Into<String>) -> Result<bool> {
        self.ensure_writable()?;
        let id = id.into();
        if self.in_v.id() == Some(id.as_str()) {
            return Ok(false);
        }
        self.ensure_repointable("inV")?;
        self.in_v.set_id(Some(id))?;
        self.endpoint_changed();
        Ok(true)
    }

    pub fn set_out_vertex_id(&mut self, id: impl Into<String>) -> Result<bool> {
        self.ensure_writable()?;
        let id = id.into();
        if self.out_v.id() == Some(id.as_str()) {
            return Ok(false);
        }
        self.ensure_repointable("outV")?;
        self.out_v.set_id(Some(id))?;
        self.endpoint_changed();
        Ok(true)
    }

    /// Points the edge at `vertex`. Returns whether the in-vertex identifier changed.
    ///
    /// A vertex with an empty key is only cached.
    pub fn set_in_vertex(&mut self, vertex: Arc<TIn>) -> Result<bool> {
        self.ensure_writable()?;
        let key = vertex.entity_key();
        if !key.is_empty() && self.in_v.id() != Some(key) {
            self.ensure_repointable("inV")?;
        }
        let changed = self.in_v.assign(vertex)?;
        if changed {
            self.endpoint_changed();
        }
        Ok(changed)
    }

    /// Points the edge at `vertex`. Returns whether the out-vertex identifier changed.
    pub fn set_out_vertex(&mut self, vertex: Arc<TOut>) -> Result<bool> {
        self.ensure_writable()?;
        let key = vertex.entity_key();
        if !key.is_empty() && self.out_v.id() != Some(key) {
            self.ensure_repointable("outV")?;
        }
        let changed = self.out_v.assign(vertex)?;
        if changed {
            self.endpoint_changed();
        }
        Ok(changed)
    }

    fn endpoint_changed(&mut self) {
        if !self.loading {
            self.dirty = true;
        }
    }

    /// A stored edge keeps its endpoints; re-pointing means drop and insert.
    fn ensure_repointable(&self, side: &str) -> Result<()> {
        if self.is_new || self.loading {
            return Ok(());
        }
        Err(GraphError::UnsupportedOperation(format!(
            "{side} of stored edge {}.{} cannot be re-pointed; drop it and insert a new edge",
            self.label,
            self.key_for_errors()
        )))
    }

    /// Resolves the in-vertex through `context`, caching it on first use.
    pub async fn in_vertex<C: GraphContext>(&self, context: &C) -> Result<Arc<TIn>> {
        self.in_v
            .resolve(context)
            .await?
            .ok_or_else(|| self.incomplete("inV identifier"))
    }

    /// Resolves the out-vertex through `context`, caching it on first use.
    pub async fn out_vertex<C: GraphContext>(&self, context: &C) -> Result<Arc<TOut>> {
        self.out_v
            .resolve(context)
            .await?
            .ok_or_else(|| self.incomplete("outV identifier"))
    }

    /// Statement in the mode the entity is attached with.
    pub fn statement(&self) -> Result<Statement> {
        self.synthesize(self.mode)
    }

    /// Rebuilds the statement for the current state. Does not mutate the entity.
    pub fn synthesize(&self, mode: RenderMode) -> Result<Statement> {
        let parts = StatementParts {
            label: &self.label,
            key: self.entity_key.as_deref(),
            in_vertex_id: self.in_v.id(),
            out_vertex_id: self.out_v.id(),
            selector: self.selector.as_ref(),
            changes: &self.changes,
            timestamp_unit: self.timestamp_unit,
        };
        statement::synthesize(&parts, mode)
    }

    /// Read access to an inline collection, created on first use.
    ///
    /// On a loaded edge the collection starts from the stored payload.
    pub fn inline_collection<T: InlineItem>(
        &self,
        name: &str,
        kind: CollectionKind,
    ) -> Result<Arc<InlineCollection<T>>> {
        let property = to_camel_case(name);
        self.collections
            .get_or_insert_with(&property, || self.seed_collection(&property, kind))?
            .ok_or_else(|| GraphError::CollectionTypeMismatch {
                label: self.label.clone(),
                key: self.key_for_errors(),
                property: property.clone(),
            })
    }

    /// Mutable access to an inline collection; every change lands in the change log.
    pub fn inline_collection_mut<T: InlineItem>(
        &mut self,
        name: &str,
        kind: CollectionKind,
    ) -> Result<InlineCollectionMut<'_, TIn, TOut, T>> {
        let collection = self.inline_collection(name, kind)?;
        Ok(InlineCollectionMut {
            entity: self,
            collection,
        })
    }

    fn seed_collection<T: InlineItem>(
        &self,
        property: &str,
        kind: CollectionKind,
    ) -> Result<InlineCollection<T>> {
        match self.loaded_property(property) {
            Some(Json::String(payload)) => {
                InlineCollection::from_transfer_data(property, kind, payload)
            }
            Some(items @ Json::Array(_)) => {
                InlineCollection::from_transfer_data(property, kind, &items.to_string())
            }
            _ => Ok(InlineCollection::new(property, kind)),
        }
    }

    fn commit_collection<T: InlineItem>(&mut self, collection: &InlineCollection<T>) -> Result<()> {
        if self.loading {
            return Ok(());
        }
        let payload = Value::Inline(collection.to_transfer_data()?);
        let property = collection.name().to_string();
        let old = self.changes.get(&property).cloned().unwrap_or(Value::Null);
        self.record_change(property, &old, payload);
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.deleted {
            return Err(GraphError::EntityDeleted {
                label: self.label.clone(),
                key: self.key_for_errors(),
            });
        }
        Ok(())
    }

    fn key_for_errors(&self) -> String {
        self.entity_key
            .clone()
            .unwrap_or_else(|| UNASSIGNED_KEY.to_string())
    }

    fn incomplete(&self, missing: &str) -> GraphError {
        GraphError::IncompleteEntity {
            label: self.label.clone(),
            key: self.key_for_errors(),
            missing: missing.to_string(),
        }
    }

    fn invalid_key(&self, key: &str, reason: &str) -> GraphError {
        GraphError::InvalidEntityKey {
            label: self.label.clone(),
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Mutable handle on an inline collection that keeps the owning entity's change log in sync.
pub struct InlineCollectionMut<'a, TIn, TOut, T> {
    entity: &'a mut EdgeEntity<TIn, TOut>,
    collection: Arc<InlineCollection<T>>,
}

impl<TIn: GraphVertex, TOut: GraphVertex, T: InlineItem> InlineCollectionMut<'_, TIn, TOut, T> {
    pub fn collection(&self) -> &InlineCollection<T> {
        &self.collection
    }

    pub fn items(&self) -> Result<Vec<T>> {
        self.collection.items()
    }

    pub fn push(&mut self, item: T) -> Result<bool> {
        self.entity.ensure_writable()?;
        let changed = self.collection.push(item)?;
        self.commit(changed)
    }

    pub fn remove(&mut self, item: &T) -> Result<bool> {
        self.entity.ensure_writable()?;
        let changed = self.collection.remove(item)?;
        self.commit(changed)
    }

    pub fn clear(&mut self) -> Result<bool> {
        self.entity.ensure_writable()?;
        let changed = self.collection.clear()?;
        self.commit(changed)
    }

    pub fn replace(&mut self, items: Vec<T>) -> Result<bool> {
        self.entity.ensure_writable()?;
        let changed = self.collection.replace(items)?;
        self.commit(changed)
    }

    fn commit(&mut self, changed: bool) -> Result<bool> {
        if changed {
            self.entity.commit_collection(&self.collection)?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransferValue;
    use crate::persist::relationship::VertexRef;
    use serde_json::json;
    use std::sync::Mutex;

    type Edge = EdgeEntity<VertexRef, VertexRef>;

    fn knows() -> Edge {
        let mut edge = Edge::with_key("knows", "e1").unwrap();
        edge.set_in_vertex_id("v1").unwrap();
        edge.set_out_vertex_id("v2").unwrap();
        edge
    }

    fn stored_knows() -> Edge {
        let mut edge = Edge::unkeyed("knows");
        edge.load(&RawRecord::edge("e1", "knows", "v2", "v1"))
            .unwrap();
        edge
    }

    #[test]
    fn test_new_edge_state() {
        let edge = Edge::new("knows");
        assert_eq!(edge.state(), EntityState::New);
        assert!(edge.is_dirty());
        assert!(edge.changes().is_empty());
        assert_eq!(edge.key().map(str::len), Some(36));
    }

    #[test]
    fn test_loaded_edge_is_clean() {
        let edge = stored_knows();
        assert_eq!(edge.state(), EntityState::Clean);
        assert!(!edge.is_dirty());
        assert_eq!(edge.in_vertex_id(), Some("v1"));
        assert_eq!(edge.out_vertex_id(), Some("v2"));
        assert_eq!(edge.statement().unwrap().text(), "g.E(___ekey)");
    }

    #[test]
    fn test_write_marks_stored_edge_dirty() {
        let mut edge = stored_knows();
        assert!(edge.set_property("since", 2020).unwrap());
        assert_eq!(edge.state(), EntityState::Dirty);

        let statement = edge.statement().unwrap();
        assert_eq!(statement.text(), "g.E(___ekey).property('since', __since)");
        assert_eq!(statement.parameter("__since"), Some(&TransferValue::Integer(2020)));
    }

    #[test]
    fn test_unchanged_write_is_ignored() {
        let mut edge = stored_knows();
        let old = Value::Integer(5);
        assert!(!edge.write_property("since", &old, Value::Integer(5)).unwrap());
        assert!(!edge.is_dirty());
    }

    #[test]
    fn test_null_write_adds_no_entry() {
        let mut edge = stored_knows();
        assert!(!edge.write_property("since", &Value::Integer(5), Value::Null).unwrap());
        assert!(edge.changes().is_empty());
        assert!(!edge.is_dirty());
    }

    #[test]
    fn test_null_write_withdraws_pending_value() {
        let mut edge = stored_knows();
        edge.set_property("since", 2020).unwrap();
        edge.set_property("note", "x").unwrap();

        assert!(edge.write_property("since", &Value::Integer(2020), Value::Null).unwrap());
        assert!(edge.changes().get("since").is_none());
        assert!(edge.is_dirty());

        assert!(edge.write_property("note", &Value::from("x"), Value::Null).unwrap());
        assert!(edge.changes().is_empty());
        assert_eq!(edge.state(), EntityState::Clean);
    }

    #[test]
    fn test_property_names_are_camel_cased() {
        let mut edge = knows();
        edge.set_property("first_met", "school").unwrap();
        assert!(edge.changes().get("firstMet").is_some());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut edge = stored_knows();
        edge.set_property("since", 2020).unwrap();
        edge.delete();
        edge.reset(false);

        assert!(edge.changes().is_empty());
        assert!(!edge.is_dirty());
        assert_eq!(edge.state(), EntityState::Clean);
    }

    #[test]
    fn test_delete_blocks_writes() {
        let mut edge = stored_knows();
        edge.delete();
        edge.delete();

        let err = edge.set_property("since", 1).unwrap_err();
        assert!(matches!(err, GraphError::EntityDeleted { ref key, .. } if key == "e1"));
        assert!(edge.set_in_vertex_id("v9").is_err());
        assert_eq!(edge.state(), EntityState::Deleted);
        assert_eq!(edge.statement().unwrap().text(), "g.E(___ekey).drop()");
    }

    #[test]
    fn test_label_mismatch_populates_nothing() {
        let mut edge = Edge::unkeyed("owns");
        let record = RawRecord::edge("e1", "knows", "v2", "v1").with_property("since", json!(1));

        let err = edge.load(&record).unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { ref found, .. } if found == "knows"));
        assert_eq!(edge.key(), None);
        assert_eq!(edge.in_vertex_id(), None);
        assert_eq!(edge.loaded_property("since"), None);
        assert!(edge.is_new());
    }

    #[test]
    fn test_writes_during_load_are_not_tracked() {
        let mut edge = Edge::unkeyed("knows");
        edge.begin_load(&RawRecord::edge("e1", "knows", "v2", "v1"))
            .unwrap();
        assert!(!edge.set_property("since", 2020).unwrap());
        edge.complete_load();
        assert!(edge.changes().is_empty());
        assert!(!edge.is_dirty());
    }

    #[test]
    fn test_assign_key_rules() {
        let mut edge = Edge::unkeyed("knows");
        assert!(matches!(
            edge.assign_key(" "),
            Err(GraphError::InvalidEntityKey { .. })
        ));
        edge.assign_key("e1").unwrap();
        edge.assign_key("e1").unwrap();
        assert!(edge.assign_key("e2").is_err());
    }

    #[test]
    fn test_unkeyed_new_edge_is_incomplete() {
        let mut edge = Edge::unkeyed("knows");
        edge.set_in_vertex_id("v1").unwrap();
        let err = edge.statement().unwrap_err();
        assert!(matches!(
            err,
            GraphError::IncompleteEntity { ref missing, ref key, .. }
                if missing == "entity key, outV identifier" && key == UNASSIGNED_KEY
        ));
    }

    #[test]
    fn test_literal_mode_rejects_unrenderable_value() {
        let mut edge = knows();
        edge.attach(&MapperConfig::new().parameterized(false));
        let err = edge
            .set_property("meta", Value::Json(json!({"a": 1})))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedValue { ref property, .. } if property == "meta"));
        assert!(edge.changes().is_empty());
    }

    #[test]
    fn test_repointing_stored_edge_is_rejected_by_setter() {
        let mut edge = stored_knows();
        let err = edge.set_in_vertex(Arc::new(VertexRef::new("v3"))).unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedOperation(ref message) if message.contains("inV")));
        assert!(edge.set_out_vertex_id("v3").is_err());

        assert_eq!(edge.in_vertex_id(), Some("v1"));
        assert_eq!(edge.out_vertex_id(), Some("v2"));
        assert!(!edge.is_dirty());
        assert_eq!(edge.statement().unwrap().text(), "g.E(___ekey)");
    }

    #[test]
    fn test_new_edge_endpoints_can_move() {
        let mut edge = knows();
        assert!(edge.set_in_vertex_id("v3").unwrap());
        assert!(edge.set_out_vertex(Arc::new(VertexRef::new("v4"))).unwrap());
        assert_eq!(edge.in_vertex_id(), Some("v3"));
        assert_eq!(edge.out_vertex_id(), Some("v4"));
    }

    #[test]
    fn test_caching_same_vertex_is_not_a_change() {
        let mut edge = stored_knows();
        assert!(!edge.set_in_vertex(Arc::new(VertexRef::new("v1"))).unwrap());
        assert!(!edge.set_in_vertex(Arc::new(VertexRef::new("v1"))).unwrap());
        assert!(!edge.is_dirty());
    }

    #[test]
    fn test_inline_collection_updates_single_entry() {
        let mut edge = knows();
        {
            let mut tags = edge
                .inline_collection_mut::<String>("tags", CollectionKind::Set)
                .unwrap();
            assert!(tags.push("a".to_string()).unwrap());
            assert!(!tags.push("a".to_string()).unwrap());
            assert!(tags.push("b".to_string()).unwrap());
        }
        assert_eq!(edge.changes().len(), 1);
        assert_eq!(
            edge.changes().get("tags"),
            Some(&Value::Inline(crate::core::InlinePayload::new(r#"["a","b"]"#)))
        );
    }

    #[test]
    fn test_collection_changes_during_load_are_not_tracked() {
        let mut edge = Edge::unkeyed("knows");
        edge.begin_load(&RawRecord::edge("e1", "knows", "v2", "v1"))
            .unwrap();
        {
            let mut tags = edge
                .inline_collection_mut::<String>("tags", CollectionKind::List)
                .unwrap();
            assert!(tags.push("a".to_string()).unwrap());
        }
        assert!(edge.changes().is_empty());
        assert!(!edge.is_dirty());

        edge.complete_load();
        assert_eq!(edge.state(), EntityState::Clean);
    }

    #[test]
    fn test_inline_collection_seeded_from_load() {
        let mut edge = Edge::unkeyed("knows");
        let record = RawRecord::edge("e1", "knows", "v2", "v1")
            .with_property("scores", json!("[1,2]"))
            .with_property("ranks", json!([3]));
        edge.load(&record).unwrap();

        let scores = edge
            .inline_collection::<i64>("scores", CollectionKind::List)
            .unwrap();
        let ranks = edge
            .inline_collection::<i64>("ranks", CollectionKind::List)
            .unwrap();
        assert_eq!(scores.items().unwrap(), vec![1, 2]);
        assert_eq!(ranks.items().unwrap(), vec![3]);
        assert!(matches!(
            edge.inline_collection::<String>("scores", CollectionKind::List),
            Err(GraphError::CollectionTypeMismatch { .. })
        ));
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl PropertyObserver for Recorder {
        fn property_changing(&self, _label: &str, property: &str, _old: &Value, _new: &Value) {
            self.seen.lock().unwrap().push(format!("changing:{property}"));
        }

        fn property_changed(&self, _label: &str, property: &str, value: &Value) {
            self.seen.lock().unwrap().push(format!("changed:{property}={value}"));
        }
    }

    #[test]
    fn test_observers_see_recorded_writes() {
        let recorder = Arc::new(Recorder::default());
        let mut edge = stored_knows();
        edge.subscribe(recorder.clone());

        edge.set_property("since", 2020).unwrap();
        edge.set_property("since", 2020).unwrap();

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec!["changing:since".to_string(), "changed:since=2020".to_string()]
        );
    }
}
