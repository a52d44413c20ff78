use log::debug;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::core::{ObjectId, Result, StoreError};
use crate::storage::ContainerState;
use crate::transaction::ClientTransaction;

use super::command::DataManagementCommand;
use super::composite::ExpandedCommand;

/// Unloads the transaction's entire container map.
///
/// The target set is re-evaluated as a fixpoint during the begin-side steps:
/// an unloading handler may load further objects into the transaction, so
/// the scan repeats for every newly discovered batch until no new containers
/// appear.
pub struct UnloadAllCommand {
    transaction: Arc<ClientTransaction>,
    notified: Mutex<HashSet<ObjectId>>,
    begun: Mutex<HashSet<ObjectId>>,
    unloaded: Mutex<Vec<ObjectId>>,
}

impl UnloadAllCommand {
    pub fn new(transaction: Arc<ClientTransaction>) -> Self {
        Self {
            transaction,
            notified: Mutex::new(HashSet::new()),
            begun: Mutex::new(HashSet::new()),
            unloaded: Mutex::new(Vec::new()),
        }
    }

    fn next_batch(&self, seen: &Mutex<HashSet<ObjectId>>) -> Result<Vec<ObjectId>> {
        let batch: Vec<ObjectId> = {
            let seen = seen.lock()?;
            self.transaction
                .loaded_object_ids()?
                .into_iter()
                .filter(|id| !seen.contains(id))
                .collect()
        };
        if !batch.is_empty() {
            seen.lock()?.extend(batch.iter().cloned());
        }
        Ok(batch)
    }
}

impl DataManagementCommand for UnloadAllCommand {
    fn name(&self) -> &'static str {
        "UNLOAD ALL"
    }

    fn get_all_exceptions(&self) -> Vec<StoreError> {
        Vec::new()
    }

    fn notify_client_transaction_of_begin(&self) -> Result<()> {
        loop {
            let batch = self.next_batch(&self.notified)?;
            if batch.is_empty() {
                return Ok(());
            }
            // The handlers may register additional containers; the next
            // iteration picks them up.
            self.transaction.notify_objects_unloading(&batch)?;
        }
    }

    fn begin(&self) -> Result<()> {
        loop {
            let batch = self.next_batch(&self.begun)?;
            if batch.is_empty() {
                return Ok(());
            }
            for id in &batch {
                self.transaction.run_on_unloading(id)?;
            }
        }
    }

    fn perform(&self) -> Result<()> {
        loop {
            let ids = self.transaction.loaded_object_ids()?;
            if ids.is_empty() {
                break;
            }
            for id in ids {
                self.transaction.notify_container_unregistering(&id)?;
                let removed = {
                    let mut containers = self.transaction.containers().write()?;
                    containers.remove(&id)
                };
                if let Some(mut container) = removed {
                    if container.state() == ContainerState::New {
                        container.mark_discarded();
                        self.transaction.mark_invalid(&id)?;
                    }
                    self.unloaded.lock()?.push(id);
                }
            }
        }

        self.transaction.end_points().write()?.reset();
        debug!(
            "unloaded all {} containers and reset the end point registry",
            self.unloaded.lock()?.len()
        );
        Ok(())
    }

    fn end(&self) -> Result<()> {
        let unloaded = self.unloaded.lock()?.clone();
        for id in unloaded.iter().rev() {
            self.transaction.run_on_unloaded(id)?;
        }
        Ok(())
    }

    fn notify_client_transaction_of_end(&self) -> Result<()> {
        let unloaded = self.unloaded.lock()?.clone();
        if unloaded.is_empty() {
            return Ok(());
        }
        self.transaction.notify_objects_unloaded(&unloaded)
    }

    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand> {
        Ok(ExpandedCommand::new(vec![self as Arc<dyn DataManagementCommand>]))
    }
}
