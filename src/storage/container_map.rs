use std::collections::HashMap;

use crate::core::{ObjectId, Result, StoreError};

use super::container::DataContainer;

/// Registry of the data containers loaded into one transaction.
///
/// Enumeration follows registration order, which the unload commands rely on
/// for their hook ordering.
#[derive(Debug, Default)]
pub struct DataContainerMap {
    containers: HashMap<ObjectId, DataContainer>,
    order: Vec<ObjectId>,
}

impl DataContainerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.containers.contains_key(id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&DataContainer> {
        self.containers.get(id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut DataContainer> {
        self.containers.get_mut(id)
    }

    pub fn register(&mut self, container: DataContainer) -> Result<()> {
        let id = container.id().clone();
        if self.containers.contains_key(&id) {
            return Err(StoreError::ObjectAlreadyRegistered(id));
        }

        self.order.push(id.clone());
        self.containers.insert(id, container);
        Ok(())
    }

    pub fn remove(&mut self, id: &ObjectId) -> Option<DataContainer> {
        let removed = self.containers.remove(id);
        if removed.is_some() {
            self.order.retain(|entry| entry != id);
        }
        removed
    }

    /// Identities of all registered containers, in registration order.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.order
            .iter()
            .filter(|id| self.containers.contains_key(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn container(class: &str) -> DataContainer {
        DataContainer::existing(ObjectId::new(class), Vec::<(&str, Value)>::new())
    }

    #[test]
    fn test_register_and_lookup() {
        let mut map = DataContainerMap::new();
        let c = container("Order");
        let id = c.id().clone();

        map.register(c).unwrap();
        assert!(map.contains(&id));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_double_registration_rejected() {
        let mut map = DataContainerMap::new();
        let c = container("Order");
        let dup = c.clone();

        map.register(c).unwrap();
        assert!(matches!(
            map.register(dup),
            Err(StoreError::ObjectAlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_enumeration_keeps_registration_order() {
        let mut map = DataContainerMap::new();
        let first = container("Order");
        let second = container("Customer");
        let third = container("OrderItem");
        let expected = vec![
            first.id().clone(),
            second.id().clone(),
            third.id().clone(),
        ];

        map.register(first).unwrap();
        map.register(second).unwrap();
        map.register(third).unwrap();

        assert_eq!(map.object_ids(), expected);

        map.remove(&expected[1]);
        assert_eq!(map.object_ids(), vec![expected[0].clone(), expected[2].clone()]);
    }
}
