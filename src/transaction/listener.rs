use crate::core::{ObjectId, RelationEndPointId, Result};

use super::state::ClientTransaction;

/// Notification sink for transaction-level events.
///
/// Every method receives the affected transaction explicitly; there is no
/// ambient transaction state. All methods default to no-ops, so a listener
/// implements only the events it cares about. A handler returning an error
/// aborts the running protocol step.
pub trait TransactionListener {
    fn object_deleting(&self, _transaction: &ClientTransaction, _id: &ObjectId) -> Result<()> {
        Ok(())
    }

    fn object_deleted(&self, _transaction: &ClientTransaction, _id: &ObjectId) -> Result<()> {
        Ok(())
    }

    fn objects_unloading(
        &self,
        _transaction: &ClientTransaction,
        _ids: &[ObjectId],
    ) -> Result<()> {
        Ok(())
    }

    fn objects_unloaded(&self, _transaction: &ClientTransaction, _ids: &[ObjectId]) -> Result<()> {
        Ok(())
    }

    fn data_container_unregistering(
        &self,
        _transaction: &ClientTransaction,
        _id: &ObjectId,
    ) -> Result<()> {
        Ok(())
    }

    fn relation_changing(
        &self,
        _transaction: &ClientTransaction,
        _owner: &ObjectId,
        _property: &str,
        _old: Option<&ObjectId>,
        _new: Option<&ObjectId>,
    ) -> Result<()> {
        Ok(())
    }

    fn relation_changed(
        &self,
        _transaction: &ClientTransaction,
        _owner: &ObjectId,
        _property: &str,
        _old: Option<&ObjectId>,
        _new: Option<&ObjectId>,
    ) -> Result<()> {
        Ok(())
    }

    fn virtual_end_point_state_updated(
        &self,
        _transaction: &ClientTransaction,
        _id: &RelationEndPointId,
        _is_empty: bool,
    ) -> Result<()> {
        Ok(())
    }
}
