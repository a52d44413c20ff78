// ============================================================================
// Data Container
// ============================================================================
//
// The property bag for one object, owned by exactly one transaction.
// Containers move through defined states:
//
//   New ──────perform(delete/unload)──> Discarded (terminal)
//   Existing ─perform(delete)─────────> Deleted
//
// Change tracking keeps the committed property values next to the current
// ones; a container with identical maps counts as unchanged and is the only
// kind that may be unloaded.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::core::{ObjectId, Result, StoreError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerState {
    /// Created in this transaction, never persisted.
    New,

    /// Loaded from the underlying store.
    Existing,

    /// Marked for deletion by a delete command.
    Deleted,

    /// Irreversibly removed from use (terminal).
    Discarded,
}

impl ContainerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContainerState::Deleted | ContainerState::Discarded)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::New => write!(f, "NEW"),
            ContainerState::Existing => write!(f, "EXISTING"),
            ContainerState::Deleted => write!(f, "DELETED"),
            ContainerState::Discarded => write!(f, "DISCARDED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataContainer {
    id: ObjectId,
    state: ContainerState,
    committed: HashMap<String, Value>,
    current: HashMap<String, Value>,
}

impl DataContainer {
    /// Container for an object created in this transaction.
    pub fn new_object<S, I>(id: ObjectId, properties: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Value)>,
    {
        Self::with_state(id, ContainerState::New, properties)
    }

    /// Container for an object loaded from the underlying store.
    pub fn existing<S, I>(id: ObjectId, properties: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Value)>,
    {
        Self::with_state(id, ContainerState::Existing, properties)
    }

    fn with_state<S, I>(id: ObjectId, state: ContainerState, properties: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Value)>,
    {
        let committed: HashMap<String, Value> = properties
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();

        Self {
            id,
            state,
            current: committed.clone(),
            committed,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.current.get(name)
    }

    /// The referenced object of a foreign-key style property, if set.
    pub fn reference_property(&self, name: &str) -> Option<&ObjectId> {
        self.property(name).and_then(Value::as_reference)
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.current.keys().map(|s| s.as_str()).collect()
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        match self.state {
            ContainerState::Deleted => return Err(StoreError::ObjectDeleted(self.id.clone())),
            ContainerState::Discarded => return Err(StoreError::ObjectInvalid(self.id.clone())),
            _ => {}
        }

        self.current.insert(name.into(), value);
        Ok(())
    }

    /// Whether any property differs from its committed value.
    pub fn has_been_changed(&self) -> bool {
        self.current != self.committed
    }

    /// New or Existing with no pending modification. Only such containers
    /// may be unloaded.
    pub fn is_unchanged(&self) -> bool {
        matches!(self.state, ContainerState::New | ContainerState::Existing)
            && !self.has_been_changed()
    }

    /// State description used in unload precondition errors.
    pub fn state_description(&self) -> String {
        if !self.state.is_terminal() && self.has_been_changed() {
            "CHANGED".to_string()
        } else {
            self.state.to_string()
        }
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.state = ContainerState::Deleted;
    }

    pub(crate) fn mark_discarded(&mut self) {
        self.state = ContainerState::Discarded;
    }
}
