// ============================================================================
// End Point Modification Commands
// ============================================================================
//
// The leaf commands produced when a delete is expanded to its related
// objects: dropping the deleted object from a loaded virtual end point, and
// setting a real end point's reference to absent. Both record tracked
// modifications (current value changes, original stays), so the pending
// change remains visible on the touched end point.
//
// The two decorators layer the re-registration and state notification
// behavior over a wrapped command without an inheritance chain; they pass
// every protocol step through and add their work after the inner perform.
//
// ============================================================================

use std::sync::Arc;

use crate::core::{ObjectId, RelationEndPointId, Result, StoreError};
use crate::storage::RelationEndPoint;
use crate::transaction::ClientTransaction;

use super::command::DataManagementCommand;
use super::composite::ExpandedCommand;

/// Drops one object from the current value of a loaded virtual end point.
pub struct VirtualEndPointRemoveCommand {
    transaction: Arc<ClientTransaction>,
    end_point_id: RelationEndPointId,
    removed: ObjectId,
}

impl VirtualEndPointRemoveCommand {
    pub fn new(
        transaction: Arc<ClientTransaction>,
        end_point_id: RelationEndPointId,
        removed: ObjectId,
    ) -> Self {
        Self {
            transaction,
            end_point_id,
            removed,
        }
    }
}

impl DataManagementCommand for VirtualEndPointRemoveCommand {
    fn name(&self) -> &'static str {
        "VIRTUAL REMOVE"
    }

    fn get_all_exceptions(&self) -> Vec<StoreError> {
        Vec::new()
    }

    fn notify_client_transaction_of_begin(&self) -> Result<()> {
        self.transaction.notify_relation_changing(
            self.end_point_id.object_id(),
            self.end_point_id.property(),
            Some(&self.removed),
            None,
        )
    }

    fn begin(&self) -> Result<()> {
        self.transaction
            .run_on_relation_changing(self.end_point_id.object_id(), self.end_point_id.property())
    }

    fn perform(&self) -> Result<()> {
        let mut end_points = self.transaction.end_points().write()?;
        let end_point = end_points
            .get_mut(&self.end_point_id)
            .ok_or_else(|| StoreError::EndPointNotFound(self.end_point_id.clone()))?;
        end_point.remove_current_opposite(&self.removed)
    }

    fn end(&self) -> Result<()> {
        self.transaction
            .run_on_relation_changed(self.end_point_id.object_id(), self.end_point_id.property())
    }

    fn notify_client_transaction_of_end(&self) -> Result<()> {
        self.transaction.notify_relation_changed(
            self.end_point_id.object_id(),
            self.end_point_id.property(),
            Some(&self.removed),
            None,
        )
    }

    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand> {
        Ok(ExpandedCommand::new(vec![self as Arc<dyn DataManagementCommand>]))
    }
}

/// Sets the reference of a real end point, capturing the old value when the
/// command is built.
pub struct RealEndPointSetCommand {
    transaction: Arc<ClientTransaction>,
    end_point_id: RelationEndPointId,
    old_opposite: Option<ObjectId>,
    new_opposite: Option<ObjectId>,
}

impl RealEndPointSetCommand {
    pub fn new(
        transaction: Arc<ClientTransaction>,
        end_point_id: RelationEndPointId,
        new_opposite: Option<ObjectId>,
    ) -> Result<Self> {
        let end_point = transaction.get_end_point_with_lazy_load(&end_point_id)?;
        let old_opposite = match end_point {
            RelationEndPoint::Real(real) => real.current().cloned(),
            _ => {
                return Err(StoreError::EndPointMismatch(
                    end_point_id,
                    "not a real end point".to_string(),
                ));
            }
        };

        Ok(Self {
            transaction,
            end_point_id,
            old_opposite,
            new_opposite,
        })
    }

    pub fn old_opposite(&self) -> Option<&ObjectId> {
        self.old_opposite.as_ref()
    }
}

impl DataManagementCommand for RealEndPointSetCommand {
    fn name(&self) -> &'static str {
        "REAL SET"
    }

    fn get_all_exceptions(&self) -> Vec<StoreError> {
        Vec::new()
    }

    fn notify_client_transaction_of_begin(&self) -> Result<()> {
        self.transaction.notify_relation_changing(
            self.end_point_id.object_id(),
            self.end_point_id.property(),
            self.old_opposite.as_ref(),
            self.new_opposite.as_ref(),
        )
    }

    fn begin(&self) -> Result<()> {
        self.transaction
            .run_on_relation_changing(self.end_point_id.object_id(), self.end_point_id.property())
    }

    fn perform(&self) -> Result<()> {
        let mut end_points = self.transaction.end_points().write()?;
        let end_point = end_points
            .get_mut(&self.end_point_id)
            .ok_or_else(|| StoreError::EndPointNotFound(self.end_point_id.clone()))?;
        end_point.set_current_opposite(self.new_opposite.clone())
    }

    fn end(&self) -> Result<()> {
        self.transaction
            .run_on_relation_changed(self.end_point_id.object_id(), self.end_point_id.property())
    }

    fn notify_client_transaction_of_end(&self) -> Result<()> {
        self.transaction.notify_relation_changed(
            self.end_point_id.object_id(),
            self.end_point_id.property(),
            self.old_opposite.as_ref(),
            self.new_opposite.as_ref(),
        )
    }

    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand> {
        Ok(ExpandedCommand::new(vec![self as Arc<dyn DataManagementCommand>]))
    }
}

/// After the wrapped command performs, re-registers a real end point against
/// its new opposite virtual end point: the owner leaves the old opposite's
/// current value and joins the new one's, where those are loaded.
pub struct RealEndPointRegistrationDecorator {
    inner: Arc<dyn DataManagementCommand>,
    transaction: Arc<ClientTransaction>,
    real_end_point_id: RelationEndPointId,
    old_opposite: Option<ObjectId>,
    new_opposite: Option<ObjectId>,
    opposite_property: String,
}

impl RealEndPointRegistrationDecorator {
    pub fn new(
        inner: Arc<dyn DataManagementCommand>,
        transaction: Arc<ClientTransaction>,
        real_end_point_id: RelationEndPointId,
        old_opposite: Option<ObjectId>,
        new_opposite: Option<ObjectId>,
        opposite_property: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            transaction,
            real_end_point_id,
            old_opposite,
            new_opposite,
            opposite_property: opposite_property.into(),
        }
    }
}

impl DataManagementCommand for RealEndPointRegistrationDecorator {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn get_all_exceptions(&self) -> Vec<StoreError> {
        self.inner.get_all_exceptions()
    }

    fn notify_client_transaction_of_begin(&self) -> Result<()> {
        self.inner.notify_client_transaction_of_begin()
    }

    fn begin(&self) -> Result<()> {
        self.inner.begin()
    }

    fn perform(&self) -> Result<()> {
        self.inner.perform()?;

        let owner = self.real_end_point_id.object_id().clone();
        let mut end_points = self.transaction.end_points().write()?;

        if let Some(old) = &self.old_opposite {
            let virtual_id = RelationEndPointId::new(old.clone(), self.opposite_property.clone());
            if let Some(end_point) = end_points.get_mut(&virtual_id) {
                end_point.remove_current_opposite(&owner)?;
            }
        }
        if let Some(new) = &self.new_opposite {
            let virtual_id = RelationEndPointId::new(new.clone(), self.opposite_property.clone());
            if let Some(end_point) = end_points.get_mut(&virtual_id) {
                end_point.register_current_opposite(owner)?;
            }
        }
        Ok(())
    }

    fn end(&self) -> Result<()> {
        self.inner.end()
    }

    fn notify_client_transaction_of_end(&self) -> Result<()> {
        self.inner.notify_client_transaction_of_end()
    }

    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand> {
        Ok(ExpandedCommand::new(vec![self as Arc<dyn DataManagementCommand>]))
    }
}

/// After the wrapped command performs, raises the state notification for a
/// virtual end point whose contents were touched.
pub struct VirtualEndPointStateDecorator {
    inner: Arc<dyn DataManagementCommand>,
    transaction: Arc<ClientTransaction>,
    end_point_id: RelationEndPointId,
}

impl VirtualEndPointStateDecorator {
    pub fn new(
        inner: Arc<dyn DataManagementCommand>,
        transaction: Arc<ClientTransaction>,
        end_point_id: RelationEndPointId,
    ) -> Self {
        Self {
            inner,
            transaction,
            end_point_id,
        }
    }
}

impl DataManagementCommand for VirtualEndPointStateDecorator {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn get_all_exceptions(&self) -> Vec<StoreError> {
        self.inner.get_all_exceptions()
    }

    fn notify_client_transaction_of_begin(&self) -> Result<()> {
        self.inner.notify_client_transaction_of_begin()
    }

    fn begin(&self) -> Result<()> {
        self.inner.begin()
    }

    fn perform(&self) -> Result<()> {
        self.inner.perform()?;

        let is_empty = {
            let end_points = self.transaction.end_points().read()?;
            let end_point = end_points
                .get(&self.end_point_id)
                .ok_or_else(|| StoreError::EndPointNotFound(self.end_point_id.clone()))?;
            end_point.is_null()
        };
        self.transaction
            .notify_virtual_end_point_state_updated(&self.end_point_id, is_empty)
    }

    fn end(&self) -> Result<()> {
        self.inner.end()
    }

    fn notify_client_transaction_of_end(&self) -> Result<()> {
        self.inner.notify_client_transaction_of_end()
    }

    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand> {
        Ok(ExpandedCommand::new(vec![self as Arc<dyn DataManagementCommand>]))
    }
}
