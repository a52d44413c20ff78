use log::debug;
use std::sync::Arc;

use crate::core::{ObjectId, RelationEndPointId, Result, StoreError};
use crate::storage::{ContainerState, EndPointKind};
use crate::transaction::ClientTransaction;

use super::command::DataManagementCommand;
use super::composite::{CompositeCommand, ExpandedCommand};
use super::endpoint::{
    RealEndPointRegistrationDecorator, RealEndPointSetCommand, VirtualEndPointRemoveCommand,
    VirtualEndPointStateDecorator,
};

/// Deletes one object within one transaction.
///
/// The bare command covers the object's own lifecycle events and registry
/// removal. `expand_to_all_related_objects` grows it into an aggregate that
/// also clears every reference held by a directly related object, unwinding
/// in reverse so related objects finish before their owner.
pub struct DeleteCommand {
    transaction: Arc<ClientTransaction>,
    object_id: ObjectId,
}

impl DeleteCommand {
    pub fn new(transaction: Arc<ClientTransaction>, object_id: ObjectId) -> Self {
        Self {
            transaction,
            object_id,
        }
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }
}

impl DataManagementCommand for DeleteCommand {
    fn name(&self) -> &'static str {
        "DELETE"
    }

    fn get_all_exceptions(&self) -> Vec<StoreError> {
        match self.transaction.is_invalid(&self.object_id) {
            Ok(true) => return vec![StoreError::ObjectInvalid(self.object_id.clone())],
            Ok(false) => {}
            Err(e) => return vec![e],
        }

        match self.transaction.data_container(&self.object_id) {
            Ok(None) => vec![StoreError::ObjectNotFound(self.object_id.clone())],
            Ok(Some(container)) => match container.state() {
                ContainerState::Deleted => {
                    vec![StoreError::ObjectDeleted(self.object_id.clone())]
                }
                ContainerState::Discarded => {
                    vec![StoreError::ObjectInvalid(self.object_id.clone())]
                }
                _ => Vec::new(),
            },
            Err(e) => vec![e],
        }
    }

    fn notify_client_transaction_of_begin(&self) -> Result<()> {
        self.transaction.notify_object_deleting(&self.object_id)
    }

    fn begin(&self) -> Result<()> {
        self.transaction.run_on_deleting(&self.object_id)
    }

    fn perform(&self) -> Result<()> {
        self.transaction
            .notify_container_unregistering(&self.object_id)?;

        let mut removed = {
            let mut containers = self.transaction.containers().write()?;
            containers
                .remove(&self.object_id)
                .ok_or_else(|| StoreError::ObjectNotFound(self.object_id.clone()))?
        };

        {
            let mut end_points = self.transaction.end_points().write()?;
            let class = self.transaction.catalog().get_class(self.object_id.class())?;
            for definition in class.end_points() {
                let id = RelationEndPointId::new(self.object_id.clone(), definition.property());
                let _ = end_points.remove(&id);
            }
        }

        if removed.state() == ContainerState::New {
            removed.mark_discarded();
            self.transaction.mark_invalid(&self.object_id)?;
        } else {
            removed.mark_deleted();
        }
        debug!("container '{}' now {}", self.object_id, removed.state());
        Ok(())
    }

    fn end(&self) -> Result<()> {
        self.transaction.run_on_deleted(&self.object_id)
    }

    fn notify_client_transaction_of_end(&self) -> Result<()> {
        self.transaction.notify_object_deleted(&self.object_id)
    }

    /// One end point command per directly related object: the 1:1 partner,
    /// each owner whose collection currently holds the target, and each
    /// element of the target's own collections. The whole set runs with
    /// stack discipline so the target's own "deleted" side fires last.
    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand> {
        let transaction = self.transaction.clone();
        let class = transaction
            .catalog()
            .get_class(self.object_id.class())?
            .clone();

        let mut nested: Vec<Arc<dyn DataManagementCommand>> =
            vec![self.clone() as Arc<dyn DataManagementCommand>];

        for definition in class.end_points() {
            let end_point_id =
                RelationEndPointId::new(self.object_id.clone(), definition.property());
            let end_point = transaction.get_end_point_with_lazy_load(&end_point_id)?;

            match definition.kind() {
                EndPointKind::Real => {
                    // The opposite object's virtual end point loses the target.
                    if let Some(opposite) = end_point.current_related().into_iter().next() {
                        let virtual_id =
                            RelationEndPointId::new(opposite, definition.opposite_property());
                        transaction.get_end_point_with_lazy_load(&virtual_id)?;

                        let remove = VirtualEndPointRemoveCommand::new(
                            transaction.clone(),
                            virtual_id.clone(),
                            self.object_id.clone(),
                        );
                        nested.push(Arc::new(VirtualEndPointStateDecorator::new(
                            Arc::new(remove),
                            transaction.clone(),
                            virtual_id,
                        )));
                    }
                }
                EndPointKind::VirtualObject | EndPointKind::VirtualCollection => {
                    // Each related object's real end point is set to absent.
                    for opposite in end_point.current_related() {
                        let real_id =
                            RelationEndPointId::new(opposite, definition.opposite_property());
                        let set = RealEndPointSetCommand::new(
                            transaction.clone(),
                            real_id.clone(),
                            None,
                        )?;
                        let old_opposite = set.old_opposite().cloned();
                        nested.push(Arc::new(RealEndPointRegistrationDecorator::new(
                            Arc::new(set),
                            transaction.clone(),
                            real_id,
                            old_opposite,
                            None,
                            definition.property(),
                        )));
                    }
                }
            }
        }

        debug!(
            "expanded delete of '{}' into {} nested commands",
            self.object_id,
            nested.len()
        );
        let stack = CompositeCommand::new(nested);
        Ok(ExpandedCommand::new(vec![
            Arc::new(stack) as Arc<dyn DataManagementCommand>
        ]))
    }
}
