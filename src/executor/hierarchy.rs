use log::{debug, warn};
use std::sync::Arc;
use tracing::info_span;

use crate::core::Result;
use crate::transaction::ClientTransaction;

use super::command::{notify_and_perform, DataManagementCommand};

/// Replays a command factory across a transaction hierarchy.
///
/// Starting at the given transaction, every level up to the root gets its
/// own command built and run through the full protocol. Read-only ancestor
/// levels are unlocked for the duration of their step and re-locked on every
/// exit path. A failure at one level stops the walk; mutations already
/// performed at earlier levels stay in place.
pub struct TransactionHierarchyCommandExecutor;

impl TransactionHierarchyCommandExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Consult `get_all_exceptions` per level before executing; a non-empty
    /// result aborts the whole walk and returns false without running the
    /// protocol at that or any further level.
    pub fn try_execute_command<F>(
        &self,
        transaction: &Arc<ClientTransaction>,
        factory: F,
    ) -> Result<bool>
    where
        F: Fn(&Arc<ClientTransaction>) -> Result<Arc<dyn DataManagementCommand>>,
    {
        self.walk(transaction, &factory, true)
    }

    /// Run the protocol per level without the validation pre-check; any step
    /// error propagates immediately.
    pub fn execute_command<F>(&self, transaction: &Arc<ClientTransaction>, factory: F) -> Result<()>
    where
        F: Fn(&Arc<ClientTransaction>) -> Result<Arc<dyn DataManagementCommand>>,
    {
        self.walk(transaction, &factory, false).map(|_| ())
    }

    fn walk<F>(
        &self,
        transaction: &Arc<ClientTransaction>,
        factory: &F,
        check_exceptions: bool,
    ) -> Result<bool>
    where
        F: Fn(&Arc<ClientTransaction>) -> Result<Arc<dyn DataManagementCommand>>,
    {
        let span = info_span!("hierarchy_walk", transaction = %transaction.id());
        let _span = span.enter();

        let mut current = Some(transaction.clone());
        while let Some(level) = current {
            {
                let _unlock = ReadOnlyUnlock::new(&level);
                let command = factory(&level)?;

                if check_exceptions {
                    let exceptions = command.get_all_exceptions();
                    if let Some(first) = exceptions.first() {
                        warn!("aborting hierarchy walk at {}: {}", level.id(), first);
                        return Ok(false);
                    }
                }

                debug!("running '{}' for {}", command.name(), level.id());
                notify_and_perform(command.as_ref())?;
            }
            current = level.parent().cloned();
        }
        Ok(true)
    }
}

impl Default for TransactionHierarchyCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope guard lifting the read-only flag of one level for the duration of
/// its step. The flag is restored on drop, on the error path as well.
struct ReadOnlyUnlock<'a> {
    transaction: &'a ClientTransaction,
    was_read_only: bool,
}

impl<'a> ReadOnlyUnlock<'a> {
    fn new(transaction: &'a ClientTransaction) -> Self {
        let was_read_only = transaction.is_read_only();
        if was_read_only {
            transaction.set_read_only(false);
            debug!("unlocked read-only transaction {}", transaction.id());
        }
        Self {
            transaction,
            was_read_only,
        }
    }
}

impl Drop for ReadOnlyUnlock<'_> {
    fn drop(&mut self) {
        if self.was_read_only {
            self.transaction.set_read_only(true);
        }
    }
}
