use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use crate::core::{ObjectId, RelationEndPointId, Result, StoreError};
use crate::storage::{ContainerState, EndPointKind};
use crate::transaction::ClientTransaction;

use super::command::DataManagementCommand;
use super::composite::ExpandedCommand;

/// Returns an explicit set of objects to the unloaded state.
///
/// Validation is eager: the command can only be built when every named
/// object is unchanged and no associated end point carries a pending
/// modification. Objects that were never loaded are silently ignored.
pub struct UnloadCommand {
    transaction: Arc<ClientTransaction>,
    affected_objects: Vec<ObjectId>,
    affected_end_points: Vec<RelationEndPointId>,
}

impl UnloadCommand {
    pub fn new(transaction: Arc<ClientTransaction>, object_ids: &[ObjectId]) -> Result<Self> {
        let mut requested: Vec<ObjectId> = Vec::new();
        for id in object_ids {
            if !requested.contains(id) {
                requested.push(id.clone());
            }
        }

        for id in &requested {
            if transaction.is_invalid(id)? {
                return Err(StoreError::ObjectInvalid(id.clone()));
            }
        }

        let (affected_objects, affected_end_points) = {
            let catalog = transaction.catalog();
            let containers = transaction.containers().read()?;
            let end_points = transaction.end_points().read()?;

            let affected: Vec<ObjectId> = requested
                .into_iter()
                .filter(|id| containers.contains(id))
                .collect();

            for id in &affected {
                if let Some(container) = containers.get(id) {
                    if !container.is_unchanged() {
                        return Err(StoreError::CannotUnload {
                            id: id.clone(),
                            state: container.state_description(),
                        });
                    }
                }
            }

            let affected_set: HashSet<&ObjectId> = affected.iter().collect();
            let mut included: Vec<RelationEndPointId> = Vec::new();

            for id in &affected {
                let class = catalog.get_class(id.class())?;
                for definition in class.end_points() {
                    let end_point_id = RelationEndPointId::new(id.clone(), definition.property());
                    let Some(end_point) = end_points.get(&end_point_id) else {
                        continue;
                    };

                    if end_point.has_changed() {
                        return Err(StoreError::EndPointChanged {
                            id: id.clone(),
                            end_point: end_point_id,
                        });
                    }

                    match definition.kind() {
                        EndPointKind::Real => {
                            // The opposite virtual end point is indirectly
                            // associated; a pending change there also blocks
                            // the unload.
                            if let Some(opposite) = end_point.current_related().into_iter().next() {
                                let virtual_id = RelationEndPointId::new(
                                    opposite,
                                    definition.opposite_property(),
                                );
                                if let Some(virtual_ep) = end_points.get(&virtual_id) {
                                    if virtual_ep.has_changed() {
                                        return Err(StoreError::EndPointChanged {
                                            id: id.clone(),
                                            end_point: virtual_id,
                                        });
                                    }
                                }
                            }
                            included.push(end_point_id);
                        }
                        EndPointKind::VirtualObject | EndPointKind::VirtualCollection => {
                            // A loaded virtual end point goes along only when
                            // it is null or every referenced owner is itself
                            // part of the unload set; otherwise the foreign
                            // owner keeps its consistent view.
                            let related = end_point.current_related();
                            let include = related.is_empty()
                                || related.iter().all(|owner| affected_set.contains(owner));
                            if include {
                                included.push(end_point_id);
                            }
                        }
                    }
                }
            }

            (affected, included)
        };

        debug!(
            "unload command covers {} containers and {} end points",
            affected_objects.len(),
            affected_end_points.len()
        );
        Ok(Self {
            transaction,
            affected_objects,
            affected_end_points,
        })
    }

    /// The named objects whose containers are currently loaded.
    pub fn affected_data_containers(&self) -> &[ObjectId] {
        &self.affected_objects
    }

    /// The end points removed by `perform`.
    pub fn affected_end_point_ids(&self) -> &[RelationEndPointId] {
        &self.affected_end_points
    }
}

impl DataManagementCommand for UnloadCommand {
    fn name(&self) -> &'static str {
        "UNLOAD"
    }

    fn get_all_exceptions(&self) -> Vec<StoreError> {
        Vec::new()
    }

    fn notify_client_transaction_of_begin(&self) -> Result<()> {
        if self.affected_objects.is_empty() {
            return Ok(());
        }
        self.transaction
            .notify_objects_unloading(&self.affected_objects)
    }

    fn begin(&self) -> Result<()> {
        for id in &self.affected_objects {
            self.transaction.run_on_unloading(id)?;
        }
        Ok(())
    }

    fn perform(&self) -> Result<()> {
        {
            let catalog = self.transaction.catalog().clone();
            let mut end_points = self.transaction.end_points().write()?;
            for id in &self.affected_end_points {
                if end_points.is_loaded(id) {
                    end_points.unregister(id, &catalog)?;
                }
            }
        }

        for id in &self.affected_objects {
            self.transaction.notify_container_unregistering(id)?;
            let removed = {
                let mut containers = self.transaction.containers().write()?;
                containers.remove(id)
            };
            if let Some(mut container) = removed {
                if container.state() == ContainerState::New {
                    container.mark_discarded();
                    self.transaction.mark_invalid(id)?;
                }
            }
        }
        Ok(())
    }

    fn end(&self) -> Result<()> {
        for id in self.affected_objects.iter().rev() {
            self.transaction.run_on_unloaded(id)?;
        }
        Ok(())
    }

    fn notify_client_transaction_of_end(&self) -> Result<()> {
        if self.affected_objects.is_empty() {
            return Ok(());
        }
        self.transaction
            .notify_objects_unloaded(&self.affected_objects)
    }

    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand> {
        Ok(ExpandedCommand::new(vec![self as Arc<dyn DataManagementCommand>]))
    }
}
