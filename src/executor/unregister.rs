use std::sync::Arc;

use crate::core::{RelationEndPointId, Result, StoreError};
use crate::transaction::ClientTransaction;

use super::command::DataManagementCommand;
use super::composite::ExpandedCommand;

/// Removes an explicit list of end points from the relation registry.
///
/// Pure structural surgery: no business-rule validation, no lifecycle events.
/// For every removed real end point the loaded opposite virtual end point
/// drops its back reference, keeping the bidirectional invariant intact.
pub struct UnregisterEndPointsCommand {
    transaction: Arc<ClientTransaction>,
    end_point_ids: Vec<RelationEndPointId>,
}

impl UnregisterEndPointsCommand {
    pub fn new(
        transaction: Arc<ClientTransaction>,
        end_point_ids: Vec<RelationEndPointId>,
    ) -> Self {
        Self {
            transaction,
            end_point_ids,
        }
    }

    pub fn end_point_ids(&self) -> &[RelationEndPointId] {
        &self.end_point_ids
    }
}

impl DataManagementCommand for UnregisterEndPointsCommand {
    fn name(&self) -> &'static str {
        "UNREGISTER END POINTS"
    }

    fn get_all_exceptions(&self) -> Vec<StoreError> {
        Vec::new()
    }

    fn notify_client_transaction_of_begin(&self) -> Result<()> {
        Ok(())
    }

    fn begin(&self) -> Result<()> {
        Ok(())
    }

    fn perform(&self) -> Result<()> {
        let catalog = self.transaction.catalog().clone();
        let mut end_points = self.transaction.end_points().write()?;
        for id in &self.end_point_ids {
            end_points.unregister(id, &catalog)?;
        }
        Ok(())
    }

    fn end(&self) -> Result<()> {
        Ok(())
    }

    fn notify_client_transaction_of_end(&self) -> Result<()> {
        Ok(())
    }

    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand> {
        Ok(ExpandedCommand::new(vec![self as Arc<dyn DataManagementCommand>]))
    }
}
