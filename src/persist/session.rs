use super::edge::EdgeEntity;
use super::model::EdgeModel;
use super::record::RawRecord;
use super::relationship::{GraphContext, GraphVertex};
use super::statement::{KEY_PARAM, Statement};
use crate::connection::config::MapperConfig;
use crate::connection::{QueryDiagnostics, StatementExecutor, TracingDiagnostics};
use crate::core::{GraphError, Result, TransferValue};
use async_trait::async_trait;
use serde_json::Value as Json;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{Instrument, Level, event, info_span};

/// Parameter carrying the vertex identifier in vertex lookups.
pub const VERTEX_PARAM: &str = "___vkey";

type VertexSlot = (TypeId, String);

/// What [`GraphSession::save`] did with an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveOutcome {
    Inserted,
    Updated,
    Deleted,
    /// Nothing was sent.
    Unchanged,
}

/// Entry point binding entities to a store.
///
/// Cloning is cheap; clones share the transport, the diagnostics sink and
/// the vertex identity map.
pub struct GraphSession<X> {
    executor: Arc<X>,
    config: MapperConfig,
    diagnostics: Arc<dyn QueryDiagnostics>,
    vertices: Arc<Mutex<HashMap<VertexSlot, Arc<dyn Any + Send + Sync>>>>,
}

impl<X> Clone for GraphSession<X> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            config: self.config.clone(),
            diagnostics: Arc::clone(&self.diagnostics),
            vertices: Arc::clone(&self.vertices),
        }
    }
}

impl<X: StatementExecutor> GraphSession<X> {
    pub fn new(executor: X, config: MapperConfig) -> Self {
        let diagnostics = Arc::new(TracingDiagnostics::from_config(&config));
        Self {
            executor: Arc::new(executor),
            config,
            diagnostics,
            vertices: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replaces the diagnostics sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn QueryDiagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    /// Number of vertices held by the identity map.
    pub fn cached_vertices(&self) -> Result<usize> {
        Ok(self.vertices.lock()?.len())
    }

    /// Sends `statement` through the transport, reporting it to the diagnostics sink.
    pub async fn execute(&self, statement: &Statement) -> Result<Vec<Json>> {
        self.diagnostics.query(statement);
        match self.executor.execute(statement).await {
            Ok(rows) => Ok(rows),
            Err(err) => {
                self.diagnostics.failed_query(statement, &err);
                Err(err)
            }
        }
    }

    /// Applies the session's rendering settings to `edge`.
    pub fn attach<E: EdgeModel>(&self, edge: &mut E) {
        edge.edge_mut().attach(&self.config);
    }

    /// Loads the edge stored under `key`; `Ok(None)` when the store has none.
    pub async fn load_edge<E: EdgeModel>(&self, key: &str) -> Result<Option<E>> {
        let span = info_span!("graph.edge.load", label = %E::edge_label(), key = %key);
        self.fetch_edge::<E>(key).instrument(span).await
    }

    /// Sends the pending changes of `edge` and marks it clean on success.
    ///
    /// A deleted edge stays deleted after the drop has been sent. An edge
    /// created and deleted without ever being stored sends nothing.
    pub async fn save<E: EdgeModel>(&self, edge: &mut E) -> Result<SaveOutcome> {
        let entity = edge.edge_mut();
        entity.attach(&self.config);
        let span = info_span!(
            "graph.edge.save",
            label = %entity.label(),
            key = %entity.key().unwrap_or_default()
        );
        self.send_changes(entity).instrument(span).await
    }

    async fn fetch_edge<E: EdgeModel>(&self, key: &str) -> Result<Option<E>> {
        let statement = Statement::new(format!("g.E({KEY_PARAM})"))
            .with_parameter(KEY_PARAM, TransferValue::Text(key.to_string()));
        let Some(row) = self.execute(&statement).await?.into_iter().next() else {
            event!(Level::DEBUG, "edge not found");
            return Ok(None);
        };

        let record = RawRecord::from_json(row)?;
        let edge = E::from_record(&record, &self.config).inspect_err(|err| {
            event!(Level::ERROR, error = %err, "edge record rejected");
        })?;
        event!(Level::DEBUG, "edge loaded");
        Ok(Some(edge))
    }

    async fn send_changes<TIn: GraphVertex, TOut: GraphVertex>(
        &self,
        entity: &mut EdgeEntity<TIn, TOut>,
    ) -> Result<SaveOutcome> {
        if !entity.is_dirty() || (entity.is_new() && entity.is_deleted()) {
            event!(Level::DEBUG, "nothing to save");
            return Ok(SaveOutcome::Unchanged);
        }

        let outcome = if entity.is_deleted() {
            SaveOutcome::Deleted
        } else if entity.is_new() {
            SaveOutcome::Inserted
        } else {
            SaveOutcome::Updated
        };

        let statement = entity.statement()?;
        self.execute(&statement).await?;
        if outcome != SaveOutcome::Deleted {
            entity.accept_changes();
        }
        event!(Level::DEBUG, outcome = ?outcome, "edge saved");
        Ok(outcome)
    }

    fn cached_vertex<V: GraphVertex>(&self, slot: &VertexSlot) -> Result<Option<Arc<V>>> {
        let vertices = self.vertices.lock()?;
        Ok(vertices
            .get(slot)
            .and_then(|vertex| Arc::clone(vertex).downcast::<V>().ok()))
    }

    fn decode_vertex<V: GraphVertex>(id: &str, row: Json) -> Result<V> {
        let record = RawRecord::from_json(row)?;
        if let Some(expected) = V::vertex_label() {
            let found = record.label()?;
            if found != expected {
                return Err(GraphError::TypeMismatch {
                    expected: expected.to_string(),
                    found: found.to_string(),
                    key: id.to_string(),
                });
            }
        }
        V::from_record(&record)
    }
}

#[async_trait]
impl<X: StatementExecutor> GraphContext for GraphSession<X> {
    async fn get_or_create<V: GraphVertex>(&self, id: &str) -> Result<Arc<V>> {
        let slot = (TypeId::of::<V>(), id.to_string());
        if let Some(vertex) = self.cached_vertex::<V>(&slot)? {
            return Ok(vertex);
        }

        let span = info_span!("graph.vertex.resolve", key = %id);
        let statement = Statement::new(format!("g.V({VERTEX_PARAM})"))
            .with_parameter(VERTEX_PARAM, TransferValue::Text(id.to_string()));
        let rows = self.execute(&statement).instrument(span).await?;

        let vertex = match rows.into_iter().next() {
            Some(row) => Self::decode_vertex::<V>(id, row)?,
            None => {
                event!(Level::DEBUG, key = %id, "vertex not stored, creating");
                V::create(id)
            }
        };

        // Another caller may have resolved the same vertex meanwhile; keep the first.
        let mut vertices = self.vertices.lock()?;
        let entry = vertices
            .entry(slot)
            .or_insert_with(|| Arc::new(vertex) as Arc<dyn Any + Send + Sync>);
        Arc::clone(entry).downcast::<V>().map_err(|_| {
            GraphError::UnsupportedOperation(format!(
                "vertex cache entry for '{id}' holds another type"
            ))
        })
    }
}
