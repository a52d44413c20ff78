use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a persistable object: class name plus key.
///
/// Immutable and globally unique within a transaction hierarchy. The key is
/// a UUID so that identities minted in different transactions never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    class: String,
    key: Uuid,
}

impl ObjectId {
    /// Mint a fresh identity for the given class.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            key: Uuid::new_v4(),
        }
    }

    /// Rebuild an identity from its parts.
    pub fn from_parts(class: impl Into<String>, key: Uuid) -> Self {
        Self {
            class: class.into(),
            key,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn key(&self) -> Uuid {
        self.key
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.class, self.key)
    }
}

/// Identity of one side of a relation: owning object plus relation property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationEndPointId {
    object_id: ObjectId,
    property: String,
}

impl RelationEndPointId {
    pub fn new(object_id: ObjectId, property: impl Into<String>) -> Self {
        Self {
            object_id,
            property: property.into(),
        }
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    pub fn property(&self) -> &str {
        &self.property
    }
}

impl fmt::Display for RelationEndPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.object_id, self.property)
    }
}
