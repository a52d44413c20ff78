use crate::core::{ObjectId, Result};

use super::state::ClientTransaction;

/// A domain object enlisted in a transaction.
///
/// Implementations are produced outside this crate (typically by a proxy or
/// code generation layer); the engine only needs the identity and the
/// lifecycle hooks. Hooks default to no-ops; returning an error from an
/// "about to" hook aborts the surrounding command step.
pub trait DomainObject {
    fn id(&self) -> &ObjectId;

    fn on_deleting(&self, _transaction: &ClientTransaction) -> Result<()> {
        Ok(())
    }

    fn on_deleted(&self, _transaction: &ClientTransaction) -> Result<()> {
        Ok(())
    }

    fn on_unloading(&self, _transaction: &ClientTransaction) -> Result<()> {
        Ok(())
    }

    fn on_unloaded(&self, _transaction: &ClientTransaction) -> Result<()> {
        Ok(())
    }

    fn on_relation_changing(
        &self,
        _transaction: &ClientTransaction,
        _property: &str,
    ) -> Result<()> {
        Ok(())
    }

    fn on_relation_changed(
        &self,
        _transaction: &ClientTransaction,
        _property: &str,
    ) -> Result<()> {
        Ok(())
    }
}
