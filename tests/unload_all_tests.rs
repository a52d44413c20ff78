/// Unload-all command tests
///
/// Tests for clearing the whole container map, including the fixpoint
/// re-scan when an unloading handler loads further objects.
/// Run with: cargo test --test unload_all_tests
use std::sync::{Arc, Mutex};

use relgraph::{
    Catalog, ClassDefinition, ClientTransaction, DataContainer, DomainObject, EndPointKind,
    ObjectId, RelationEndPointDefinition, RelationEndPointId, Result, StoreError,
    TransactionListener, UnloadAllCommand, Value, notify_and_perform,
};

fn commerce_catalog() -> Catalog {
    Catalog::new()
        .with_class(ClassDefinition::new("Customer").with_end_point(
            RelationEndPointDefinition::new(
                "Orders",
                EndPointKind::VirtualCollection,
                "Order",
                "Customer",
            ),
        ))
        .unwrap()
        .with_class(ClassDefinition::new("Order").with_end_point(
            RelationEndPointDefinition::new("Customer", EndPointKind::Real, "Customer", "Orders"),
        ))
        .unwrap()
}

fn register_existing(transaction: &Arc<ClientTransaction>, id: &ObjectId) {
    transaction
        .register_data_container(DataContainer::existing(
            id.clone(),
            Vec::<(&str, Value)>::new(),
        ))
        .unwrap();
}

/// Loads one extra object the first time an unloading batch arrives.
struct LateLoadingListener {
    extra: ObjectId,
    batches: Mutex<Vec<usize>>,
    loaded: Mutex<bool>,
}

impl LateLoadingListener {
    fn new(extra: ObjectId) -> Self {
        Self {
            extra,
            batches: Mutex::new(Vec::new()),
            loaded: Mutex::new(false),
        }
    }
}

impl TransactionListener for LateLoadingListener {
    fn objects_unloading(&self, transaction: &ClientTransaction, ids: &[ObjectId]) -> Result<()> {
        self.batches.lock().map_err(StoreError::from)?.push(ids.len());

        let mut loaded = self.loaded.lock().map_err(StoreError::from)?;
        if !*loaded {
            *loaded = true;
            transaction.register_data_container(DataContainer::existing(
                self.extra.clone(),
                Vec::<(&str, Value)>::new(),
            ))?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct UnregisterListener {
    unregistered: Mutex<Vec<ObjectId>>,
}

impl TransactionListener for UnregisterListener {
    fn data_container_unregistering(
        &self,
        _transaction: &ClientTransaction,
        id: &ObjectId,
    ) -> Result<()> {
        self.unregistered
            .lock()
            .map_err(StoreError::from)?
            .push(id.clone());
        Ok(())
    }
}

struct UnloadHookRecorder {
    id: ObjectId,
    label: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl DomainObject for UnloadHookRecorder {
    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn on_unloading(&self, _transaction: &ClientTransaction) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}.unloading", self.label));
        Ok(())
    }

    fn on_unloaded(&self, _transaction: &ClientTransaction) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}.unloaded", self.label));
        Ok(())
    }
}

#[test]
fn test_unload_all_clears_containers_and_resets_end_points() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let customer = ObjectId::new("Customer");
    let order = ObjectId::new("Order");
    register_existing(&transaction, &customer);
    transaction
        .register_data_container(DataContainer::existing(
            order.clone(),
            vec![("Customer", Value::from(customer.clone()))],
        ))
        .unwrap();
    transaction
        .get_end_point_with_lazy_load(&RelationEndPointId::new(customer.clone(), "Orders"))
        .unwrap();

    let command = UnloadAllCommand::new(transaction.clone());
    notify_and_perform(&command).unwrap();

    assert!(transaction.loaded_object_ids().unwrap().is_empty());
    assert!(transaction.loaded_end_point_ids().unwrap().is_empty());
    assert!(transaction.data_container(&order).unwrap().is_none());
}

#[test]
fn test_unload_all_re_scans_for_late_loaded_objects() {
    let listener = Arc::new(LateLoadingListener::new(ObjectId::new("Order")));
    let transaction = ClientTransaction::root(commerce_catalog())
        .with_listener(listener.clone())
        .unwrap();
    register_existing(&transaction, &ObjectId::new("Customer"));

    let command = UnloadAllCommand::new(transaction.clone());
    notify_and_perform(&command).unwrap();

    // The first batch triggered a load; a second notification round covered
    // the newcomer, and nothing is left afterwards.
    assert_eq!(listener.batches.lock().unwrap().clone(), vec![1, 1]);
    assert!(transaction.loaded_object_ids().unwrap().is_empty());
    assert!(transaction.data_container(&listener.extra).unwrap().is_none());
}

#[test]
fn test_unload_all_raises_one_unregistering_event_per_container() {
    let listener = Arc::new(UnregisterListener::default());
    let transaction = ClientTransaction::root(commerce_catalog())
        .with_listener(listener.clone())
        .unwrap();
    let first = ObjectId::new("Customer");
    let second = ObjectId::new("Order");
    register_existing(&transaction, &first);
    register_existing(&transaction, &second);

    let command = UnloadAllCommand::new(transaction);
    notify_and_perform(&command).unwrap();

    assert_eq!(
        listener.unregistered.lock().unwrap().clone(),
        vec![first, second]
    );
}

#[test]
fn test_unload_all_marks_new_containers_invalid() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let fresh = ObjectId::new("Order");
    let loaded = ObjectId::new("Customer");
    transaction
        .register_data_container(DataContainer::new_object(
            fresh.clone(),
            Vec::<(&str, Value)>::new(),
        ))
        .unwrap();
    register_existing(&transaction, &loaded);

    let command = UnloadAllCommand::new(transaction.clone());
    notify_and_perform(&command).unwrap();

    assert!(transaction.is_invalid(&fresh).unwrap());
    assert!(!transaction.is_invalid(&loaded).unwrap());
}

#[test]
fn test_unload_all_hooks_unwind_in_reverse() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let first = ObjectId::new("Order");
    let second = ObjectId::new("Order");
    register_existing(&transaction, &first);
    register_existing(&transaction, &second);

    let log = Arc::new(Mutex::new(Vec::new()));
    for (id, label) in [(&first, "first"), (&second, "second")] {
        transaction
            .enlist(Arc::new(UnloadHookRecorder {
                id: id.clone(),
                label: label.to_string(),
                log: log.clone(),
            }))
            .unwrap();
    }

    let command = UnloadAllCommand::new(transaction);
    notify_and_perform(&command).unwrap();

    assert_eq!(
        log.lock().unwrap().clone(),
        vec![
            "first.unloading",
            "second.unloading",
            "second.unloaded",
            "first.unloaded",
        ]
    );
}
