use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{RelationEndPointId, Result, StoreError};

/// Which side of a relation an end point definition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndPointKind {
    /// Stores the opposite object reference itself (foreign-key style).
    Real,
    /// Derived single-valued back reference.
    VirtualObject,
    /// Derived multi-valued back reference.
    VirtualCollection,
}

/// Static description of one relation property of a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEndPointDefinition {
    property: String,
    kind: EndPointKind,
    opposite_class: String,
    opposite_property: String,
}

impl RelationEndPointDefinition {
    pub fn new(
        property: impl Into<String>,
        kind: EndPointKind,
        opposite_class: impl Into<String>,
        opposite_property: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            kind,
            opposite_class: opposite_class.into(),
            opposite_property: opposite_property.into(),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn kind(&self) -> EndPointKind {
        self.kind
    }

    pub fn opposite_class(&self) -> &str {
        &self.opposite_class
    }

    pub fn opposite_property(&self) -> &str {
        &self.opposite_property
    }

    pub fn is_real(&self) -> bool {
        matches!(self.kind, EndPointKind::Real)
    }

    pub fn is_virtual(&self) -> bool {
        !self.is_real()
    }
}

/// Static description of a persistable class and its relation properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    name: String,
    end_points: Vec<RelationEndPointDefinition>,
}

impl ClassDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            end_points: Vec::new(),
        }
    }

    pub fn with_end_point(mut self, definition: RelationEndPointDefinition) -> Self {
        self.end_points.push(definition);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn end_points(&self) -> &[RelationEndPointDefinition] {
        &self.end_points
    }

    pub fn end_point(&self, property: &str) -> Option<&RelationEndPointDefinition> {
        self.end_points.iter().find(|d| d.property == property)
    }
}

/// Catalog of class definitions.
///
/// Immutable after creation, so it can be cloned into every transaction of a
/// hierarchy without locking. Adding a class returns a new catalog
/// (copy-on-write), the old one stays unchanged.
#[derive(Debug, Clone)]
pub struct Catalog {
    classes: Arc<HashMap<String, ClassDefinition>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            classes: Arc::new(HashMap::new()),
        }
    }

    pub fn with_class(self, definition: ClassDefinition) -> Result<Self> {
        let name = definition.name().to_string();

        if self.classes.contains_key(&name) {
            return Err(StoreError::ClassExists(name));
        }

        let mut new_classes = (*self.classes).clone();
        new_classes.insert(name, definition);

        Ok(Self {
            classes: Arc::new(new_classes),
        })
    }

    pub fn get_class(&self, name: &str) -> Result<&ClassDefinition> {
        self.classes
            .get(name)
            .ok_or_else(|| StoreError::ClassNotDefined(name.to_string()))
    }

    pub fn class_exists(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn list_classes(&self) -> Vec<&str> {
        self.classes.keys().map(|s| s.as_str()).collect()
    }

    /// Definition backing the given end point identity.
    pub fn end_point_definition(&self, id: &RelationEndPointId) -> Result<&RelationEndPointDefinition> {
        let class = self.get_class(id.object_id().class())?;
        class.end_point(id.property()).ok_or_else(|| {
            StoreError::PropertyNotDefined(id.property().to_string(), class.name().to_string())
        })
    }

    /// Definition of the other side of the given definition's relation.
    pub fn opposite_definition(
        &self,
        definition: &RelationEndPointDefinition,
    ) -> Result<&RelationEndPointDefinition> {
        let class = self.get_class(definition.opposite_class())?;
        class.end_point(definition.opposite_property()).ok_or_else(|| {
            StoreError::PropertyNotDefined(
                definition.opposite_property().to_string(),
                class.name().to_string(),
            )
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ObjectId;

    fn order_class() -> ClassDefinition {
        ClassDefinition::new("Order").with_end_point(RelationEndPointDefinition::new(
            "Customer",
            EndPointKind::Real,
            "Customer",
            "Orders",
        ))
    }

    #[test]
    fn test_with_class_is_copy_on_write() {
        let empty = Catalog::new();
        let catalog = empty.clone().with_class(order_class()).unwrap();

        assert!(catalog.class_exists("Order"));
        assert!(!empty.class_exists("Order"));
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let catalog = Catalog::new().with_class(order_class()).unwrap();
        assert!(matches!(
            catalog.with_class(order_class()),
            Err(StoreError::ClassExists(_))
        ));
    }

    #[test]
    fn test_end_point_definition_lookup() {
        let catalog = Catalog::new().with_class(order_class()).unwrap();
        let id = RelationEndPointId::new(ObjectId::new("Order"), "Customer");

        let def = catalog.end_point_definition(&id).unwrap();
        assert_eq!(def.kind(), EndPointKind::Real);
        assert_eq!(def.opposite_property(), "Orders");

        let missing = RelationEndPointId::new(ObjectId::new("Order"), "Nope");
        assert!(catalog.end_point_definition(&missing).is_err());
    }
}
