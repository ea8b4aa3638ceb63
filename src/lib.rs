// ============================================================================
// graphpersist: change tracking and Gremlin statement synthesis for graph edges
// ============================================================================

pub mod connection;
pub mod core;
pub mod persist;
pub mod prelude;

#[doc(hidden)]
pub use paste;

pub use crate::connection::{QueryDiagnostics, StatementExecutor, TracingDiagnostics, config::MapperConfig};
pub use crate::core::{GraphError, InlinePayload, Result, TransferValue, Value};
pub use crate::persist::{
    CollectionKind, EdgeEntity, EdgeModel, EntityState, GraphContext, GraphSession, GraphVertex,
    RawRecord, RenderMode, SaveOutcome, Statement, TimestampUnit, VertexRef,
};
