//! Change tracking and statement synthesis for graph edges.
//!
//! An [`EdgeEntity`] records property writes in an [`UpdateChain`], keeps its
//! two [`Endpoint`]s, and rebuilds a Gremlin [`Statement`] from that state on
//! demand. [`GraphSession`] sends statements through a
//! [`StatementExecutor`](crate::connection::StatementExecutor).

pub mod edge;
pub mod inline_collection;
mod macros;
pub mod model;
pub mod normalize;
pub mod record;
pub mod relationship;
pub mod render;
pub mod session;
pub mod statement;
pub mod update_chain;

pub use edge::{EdgeEntity, EntityState, InlineCollectionMut, PropertyObserver, new_entity_key};
pub use inline_collection::{
    CollectionKind, InlineCollection, InlineCollectionRegistry, InlineItem,
};
pub use model::{EdgeModel, GraphValue, decode_property};
pub use normalize::{TimestampUnit, normalize};
pub use record::RawRecord;
pub use relationship::{Endpoint, GraphContext, GraphVertex, VertexRef};
pub use render::{escape_string, render_literal, to_camel_case};
pub use session::{GraphSession, SaveOutcome};
pub use statement::{EdgeSelector, RenderMode, Statement};
pub use update_chain::{UpdateChain, UpdateRecord};
