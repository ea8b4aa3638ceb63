//! Everything needed to declare, load and save typed edges.
//!
//! Low-level pieces (the change log, the renderer, raw endpoints) stay under
//! [`crate::persist`].

pub use crate::connection::config::MapperConfig;
pub use crate::connection::{QueryDiagnostics, StatementExecutor, TracingDiagnostics};
pub use crate::core::{GraphError, Result, TransferValue, Value};
pub use crate::graph_edge;
pub use crate::persist::{
    CollectionKind, EdgeEntity, EdgeModel, EntityState, GraphContext, GraphSession, GraphValue,
    GraphVertex, PropertyObserver, RawRecord, RenderMode, SaveOutcome, Statement, TimestampUnit,
    VertexRef,
};
