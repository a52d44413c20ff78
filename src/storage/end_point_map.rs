use log::trace;
use std::collections::HashMap;

use crate::core::{ObjectId, RelationEndPointId, Result, StoreError};

use super::catalog::{Catalog, EndPointKind, RelationEndPointDefinition};
use super::container::DataContainer;
use super::container_map::DataContainerMap;
use super::end_point::{
    RealObjectEndPoint, RelationEndPoint, VirtualCollectionEndPoint, VirtualObjectEndPoint,
};

/// Registry of the relation end points loaded into one transaction.
///
/// Real end points are registered eagerly with their container; virtual end
/// points are materialized on demand from the loaded real end points that
/// reference their owner.
#[derive(Debug, Default)]
pub struct RelationEndPointMap {
    end_points: HashMap<RelationEndPointId, RelationEndPoint>,
}

impl RelationEndPointMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.end_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.end_points.is_empty()
    }

    pub fn is_loaded(&self, id: &RelationEndPointId) -> bool {
        self.end_points.contains_key(id)
    }

    pub fn get(&self, id: &RelationEndPointId) -> Option<&RelationEndPoint> {
        self.end_points.get(id)
    }

    pub fn get_mut(&mut self, id: &RelationEndPointId) -> Option<&mut RelationEndPoint> {
        self.end_points.get_mut(id)
    }

    pub fn ids(&self) -> Vec<RelationEndPointId> {
        self.end_points.keys().cloned().collect()
    }

    /// Plain removal without opposite repair.
    pub fn remove(&mut self, id: &RelationEndPointId) -> Option<RelationEndPoint> {
        self.end_points.remove(id)
    }

    pub fn reset(&mut self) {
        self.end_points.clear();
    }

    /// Register the real end points of a freshly loaded container, seeded
    /// from its reference properties, and link them into any already loaded
    /// opposite virtual end points.
    pub fn register_for_container(
        &mut self,
        container: &DataContainer,
        catalog: &Catalog,
    ) -> Result<()> {
        let class = catalog.get_class(container.id().class())?;
        let real_definitions: Vec<RelationEndPointDefinition> = class
            .end_points()
            .iter()
            .filter(|d| d.is_real())
            .cloned()
            .collect();

        for definition in real_definitions {
            self.register_real_end_point(container, &definition)?;
        }
        Ok(())
    }

    fn register_real_end_point(
        &mut self,
        container: &DataContainer,
        definition: &RelationEndPointDefinition,
    ) -> Result<()> {
        let id = RelationEndPointId::new(container.id().clone(), definition.property());
        if self.end_points.contains_key(&id) {
            return Err(StoreError::ExecutionError(format!(
                "End point '{}' is already registered",
                id
            )));
        }

        let opposite = container.reference_property(definition.property()).cloned();
        self.end_points.insert(
            id.clone(),
            RelationEndPoint::Real(RealObjectEndPoint::new(id.clone(), opposite.clone())),
        );

        if let Some(opposite) = opposite {
            let virtual_id = RelationEndPointId::new(opposite, definition.opposite_property());
            if let Some(virtual_end_point) = self.end_points.get_mut(&virtual_id) {
                virtual_end_point.register_original_opposite(container.id().clone())?;
            }
        }
        Ok(())
    }

    /// Remove an end point; for a real end point, tell the loaded opposite
    /// virtual end point to drop its back reference.
    pub fn unregister(
        &mut self,
        id: &RelationEndPointId,
        catalog: &Catalog,
    ) -> Result<RelationEndPoint> {
        let removed = self
            .end_points
            .remove(id)
            .ok_or_else(|| StoreError::EndPointNotFound(id.clone()))?;

        if let RelationEndPoint::Real(real) = &removed {
            let definition = catalog.end_point_definition(id)?;
            if let Some(opposite) = real.original() {
                let virtual_id =
                    RelationEndPointId::new(opposite.clone(), definition.opposite_property());
                if let Some(virtual_end_point) = self.end_points.get_mut(&virtual_id) {
                    virtual_end_point.unregister_original_opposite(id.object_id())?;
                }
            }
        }
        Ok(removed)
    }

    /// Look up an end point, materializing it first if necessary.
    pub fn get_with_lazy_load(
        &mut self,
        id: &RelationEndPointId,
        catalog: &Catalog,
        containers: &DataContainerMap,
    ) -> Result<&RelationEndPoint> {
        if !self.end_points.contains_key(id) {
            self.load(id, catalog, containers)?;
            trace!("lazily loaded end point '{}'", id);
        }
        self.end_points
            .get(id)
            .ok_or_else(|| StoreError::EndPointNotFound(id.clone()))
    }

    fn load(
        &mut self,
        id: &RelationEndPointId,
        catalog: &Catalog,
        containers: &DataContainerMap,
    ) -> Result<()> {
        let definition = catalog.end_point_definition(id)?.clone();
        match definition.kind() {
            EndPointKind::Real => {
                let container = containers
                    .get(id.object_id())
                    .ok_or_else(|| StoreError::ObjectNotFound(id.object_id().clone()))?;
                self.register_real_end_point(container, &definition)
            }
            EndPointKind::VirtualObject => {
                let (original, current) = self.derive_owners(id, &definition, containers);
                let end_point = VirtualObjectEndPoint::new(
                    id.clone(),
                    original.into_iter().next(),
                    current.into_iter().next(),
                );
                self.end_points
                    .insert(id.clone(), RelationEndPoint::VirtualObject(end_point));
                Ok(())
            }
            EndPointKind::VirtualCollection => {
                let (original, current) = self.derive_owners(id, &definition, containers);
                let end_point = VirtualCollectionEndPoint::new(id.clone(), original, current);
                self.end_points
                    .insert(id.clone(), RelationEndPoint::VirtualCollection(end_point));
                Ok(())
            }
        }
    }

    /// Owners of loaded real end points referencing the given virtual end
    /// point's object, in container registration order.
    fn derive_owners(
        &self,
        id: &RelationEndPointId,
        definition: &RelationEndPointDefinition,
        containers: &DataContainerMap,
    ) -> (Vec<ObjectId>, Vec<ObjectId>) {
        let target = id.object_id();
        let mut original = Vec::new();
        let mut current = Vec::new();

        for owner_id in containers.object_ids() {
            if owner_id.class() != definition.opposite_class() {
                continue;
            }
            let real_id = RelationEndPointId::new(owner_id.clone(), definition.opposite_property());
            if let Some(RelationEndPoint::Real(real)) = self.end_points.get(&real_id) {
                if real.original() == Some(target) {
                    original.push(owner_id.clone());
                }
                if real.current() == Some(target) {
                    current.push(owner_id);
                }
            }
        }
        (original, current)
    }
}
