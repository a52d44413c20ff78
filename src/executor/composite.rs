// ============================================================================
// Command Combinators
// ============================================================================
//
// Two aggregates over the command protocol with distinct ordering contracts,
// kept as separate types so the contract is visible at the type level:
//
// - CompositeCommand unwinds: begin-side steps run in registration order,
//   end-side steps in reverse. Used where begin establishes something end
//   must release (an owner begins deleting before its collection, the
//   collection finishes first).
// - ExpandedCommand is flat: every step runs in registration order. Used for
//   independent peer mutations.
//
// Both are immutable once built; combining returns a new instance.
//
// ============================================================================

use std::sync::Arc;

use crate::core::{Result, StoreError};

use super::command::DataManagementCommand;

/// Ordered aggregate with stack discipline: `end` and
/// `notify_client_transaction_of_end` run in reverse registration order.
#[derive(Clone)]
pub struct CompositeCommand {
    commands: Vec<Arc<dyn DataManagementCommand>>,
}

impl CompositeCommand {
    pub fn new(commands: Vec<Arc<dyn DataManagementCommand>>) -> Self {
        Self { commands }
    }
}

impl DataManagementCommand for CompositeCommand {
    fn name(&self) -> &'static str {
        "COMPOSITE"
    }

    fn get_all_exceptions(&self) -> Vec<StoreError> {
        self.commands
            .iter()
            .flat_map(|command| command.get_all_exceptions())
            .collect()
    }

    fn notify_client_transaction_of_begin(&self) -> Result<()> {
        for command in &self.commands {
            command.notify_client_transaction_of_begin()?;
        }
        Ok(())
    }

    fn begin(&self) -> Result<()> {
        for command in &self.commands {
            command.begin()?;
        }
        Ok(())
    }

    fn perform(&self) -> Result<()> {
        for command in &self.commands {
            command.perform()?;
        }
        Ok(())
    }

    fn end(&self) -> Result<()> {
        for command in self.commands.iter().rev() {
            command.end()?;
        }
        Ok(())
    }

    fn notify_client_transaction_of_end(&self) -> Result<()> {
        for command in self.commands.iter().rev() {
            command.notify_client_transaction_of_end()?;
        }
        Ok(())
    }

    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand> {
        Ok(ExpandedCommand::new(vec![
            self as Arc<dyn DataManagementCommand>,
        ]))
    }

    fn nested_commands(&self) -> &[Arc<dyn DataManagementCommand>] {
        &self.commands
    }
}

/// Flat aggregate: every step runs in registration order, no reversal.
#[derive(Clone)]
pub struct ExpandedCommand {
    commands: Vec<Arc<dyn DataManagementCommand>>,
}

impl ExpandedCommand {
    pub fn new(commands: Vec<Arc<dyn DataManagementCommand>>) -> Self {
        Self { commands }
    }

    /// A new expanded command holding this one's nested commands plus the
    /// appended one. The receiver stays unchanged.
    pub fn combine_with(&self, other: Arc<dyn DataManagementCommand>) -> ExpandedCommand {
        let mut commands = self.commands.clone();
        commands.push(other);
        ExpandedCommand::new(commands)
    }
}

impl DataManagementCommand for ExpandedCommand {
    fn name(&self) -> &'static str {
        "EXPANDED"
    }

    fn get_all_exceptions(&self) -> Vec<StoreError> {
        self.commands
            .iter()
            .flat_map(|command| command.get_all_exceptions())
            .collect()
    }

    fn notify_client_transaction_of_begin(&self) -> Result<()> {
        for command in &self.commands {
            command.notify_client_transaction_of_begin()?;
        }
        Ok(())
    }

    fn begin(&self) -> Result<()> {
        for command in &self.commands {
            command.begin()?;
        }
        Ok(())
    }

    fn perform(&self) -> Result<()> {
        for command in &self.commands {
            command.perform()?;
        }
        Ok(())
    }

    fn end(&self) -> Result<()> {
        for command in &self.commands {
            command.end()?;
        }
        Ok(())
    }

    fn notify_client_transaction_of_end(&self) -> Result<()> {
        for command in &self.commands {
            command.notify_client_transaction_of_end()?;
        }
        Ok(())
    }

    fn expand_to_all_related_objects(self: Arc<Self>) -> Result<ExpandedCommand> {
        Ok(ExpandedCommand::new(self.commands.clone()))
    }

    fn nested_commands(&self) -> &[Arc<dyn DataManagementCommand>] {
        &self.commands
    }
}
