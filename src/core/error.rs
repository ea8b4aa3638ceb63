use thiserror::Error;

/// Placeholder used in error messages when an entity has no key yet.
pub const UNASSIGNED_KEY: &str = "<unassigned>";

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unable to cast graph item with label '{found}' to '{expected}' (key '{key}')")]
    TypeMismatch {
        expected: String,
        found: String,
        key: String,
    },

    #[error("Entity {label}.{key} is marked as deleted")]
    EntityDeleted { label: String, key: String },

    #[error("Entity {label}.{key} is incomplete: {missing}")]
    IncompleteEntity {
        label: String,
        key: String,
        missing: String,
    },

    #[error("Unsupported value of type {type_name} for property '{property}' on {label}.{key}")]
    UnsupportedValue {
        label: String,
        key: String,
        property: String,
        type_name: &'static str,
    },

    #[error("Invalid entity key '{key}' for {label}: {reason}")]
    InvalidEntityKey {
        label: String,
        key: String,
        reason: String,
    },

    #[error("Inline collection '{property}' on {label}.{key} already exists with a different item type")]
    CollectionTypeMismatch {
        label: String,
        key: String,
        property: String,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

impl<T> From<std::sync::PoisonError<T>> for GraphError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
