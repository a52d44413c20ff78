use thiserror::Error;

use super::types::{ObjectId, RelationEndPointId};

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Class '{0}' is not defined in the catalog")]
    ClassNotDefined(String),

    #[error("Class '{0}' is already defined")]
    ClassExists(String),

    #[error("Relation property '{0}' is not defined for class '{1}'")]
    PropertyNotDefined(String, String),

    #[error("Object '{0}' is not registered in this transaction")]
    ObjectNotFound(ObjectId),

    #[error("Object '{0}' is already registered in this transaction")]
    ObjectAlreadyRegistered(ObjectId),

    #[error("Object '{0}' is invalid in this transaction")]
    ObjectInvalid(ObjectId),

    #[error("Object '{0}' has already been deleted")]
    ObjectDeleted(ObjectId),

    #[error("Object '{id}' cannot be unloaded because it is in state {state}")]
    CannotUnload { id: ObjectId, state: String },

    #[error("Object '{id}' cannot be unloaded because relation '{end_point}' has been changed")]
    EndPointChanged {
        id: ObjectId,
        end_point: RelationEndPointId,
    },

    #[error("Relation end point '{0}' is not registered in this transaction")]
    EndPointNotFound(RelationEndPointId),

    #[error("Relation end point '{0}' cannot be modified: {1}")]
    EndPointMismatch(RelationEndPointId, String),

    #[error("Transaction {0} is read-only")]
    ReadOnlyTransaction(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
