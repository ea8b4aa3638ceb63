pub mod error;
pub mod value;

pub use error::{GraphError, Result, UNASSIGNED_KEY};
pub use value::{InlinePayload, TransferValue, Value};
