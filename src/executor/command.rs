use log::{debug, warn};
use std::sync::Arc;

use crate::core::{Result, StoreError};

use super::composite::{CompositeCommand, ExpandedCommand};

/// A single pending mutation of the object graph.
///
/// Steps run in a fixed protocol order:
///
/// 1. `get_all_exceptions` - pure validation, no side effects, repeatable
/// 2. `notify_client_transaction_of_begin` - "-ing" events on the listeners
/// 3. `begin` - domain object "about to change" hooks
/// 4. `perform` - the actual registry mutation
/// 5. `end` - domain object "changed" hooks
/// 6. `notify_client_transaction_of_end` - "-ed" events on the listeners
///
/// A command is a disposable, single-use value: stateless between
/// construction and execution apart from captured references.
pub trait DataManagementCommand {
    /// Short name for logging and debugging.
    fn name(&self) -> &'static str;

    fn get_all_exceptions(&self) -> Vec<StoreError>;

    fn notify_client_transaction_of_begin(&self) -> Result<()>;

    fn begin(&self) -> Result<()>;

    fn perform(&self) -> Result<()>;

    fn end(&self) -> Result<()>;

    fn notify_client_transaction_of_end(&self) -> Result<()>;

    /// Grow the command into an aggregate covering every end point reachable
    /// from its target.
    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand>;

    /// Directly nested sub-commands; leaf commands have none.
    fn nested_commands(&self) -> &[Arc<dyn DataManagementCommand>] {
        &[]
    }
}

/// Run protocol steps 2 through 6 in order.
pub fn notify_and_perform(command: &dyn DataManagementCommand) -> Result<()> {
    debug!("executing command '{}'", command.name());
    command.notify_client_transaction_of_begin()?;
    command.begin()?;
    command.perform()?;
    command.end()?;
    command.notify_client_transaction_of_end()
}

/// Consult `get_all_exceptions` first and execute only when it is empty.
///
/// Returns `Ok(false)` without touching any state when validation fails; a
/// failing protocol step still propagates its error.
pub fn try_notify_and_perform(command: &dyn DataManagementCommand) -> Result<bool> {
    let exceptions = command.get_all_exceptions();
    if let Some(first) = exceptions.first() {
        warn!("command '{}' not executed: {}", command.name(), first);
        return Ok(false);
    }
    notify_and_perform(command)?;
    Ok(true)
}

/// Build a new aggregate from two commands without mutating either operand.
pub fn combine_commands(
    first: Arc<dyn DataManagementCommand>,
    second: Arc<dyn DataManagementCommand>,
) -> CompositeCommand {
    CompositeCommand::new(vec![first, second])
}

/// Command with nothing to do. Used where a factory has no work for a
/// transaction level.
pub struct NopCommand;

impl DataManagementCommand for NopCommand {
    fn name(&self) -> &'static str {
        "NOP"
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
