/// Unload command tests
///
/// Tests for the eager unload precondition, the end point inclusion rule,
/// and the batch hook ordering.
/// Run with: cargo test --test unload_tests
use std::sync::{Arc, Mutex};

use relgraph::{
    Catalog, ClassDefinition, ClientTransaction, DataContainer, DomainObject, EndPointKind,
    ObjectId, RelationEndPointDefinition, RelationEndPointId, Result, StoreError,
    TransactionListener, UnloadCommand, Value, notify_and_perform,
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
        .with_class(
            ClassDefinition::new("Order")
                .with_end_point(RelationEndPointDefinition::new(
                    "Customer",
                    EndPointKind::Real,
                    "Customer",
                    "Orders",
                ))
                .with_end_point(RelationEndPointDefinition::new(
                    "Ticket",
                    EndPointKind::VirtualObject,
                    "OrderTicket",
                    "Order",
                )),
        )
        .unwrap()
        .with_class(ClassDefinition::new("OrderTicket").with_end_point(
            RelationEndPointDefinition::new("Order", EndPointKind::Real, "Order", "Ticket"),
        ))
        .unwrap()
}

fn register_existing(
    transaction: &Arc<ClientTransaction>,
    id: &ObjectId,
    properties: Vec<(&str, Value)>,
) {
    transaction
        .register_data_container(DataContainer::existing(id.clone(), properties))
        .unwrap();
}

struct UnloadRecorder {
    id: ObjectId,
    label: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl UnloadRecorder {
    fn enlist(
        transaction: &Arc<ClientTransaction>,
        id: &ObjectId,
        label: &str,
        log: &Arc<Mutex<Vec<String>>>,
    ) {
        transaction
            .enlist(Arc::new(Self {
                id: id.clone(),
                label: label.to_string(),
                log: log.clone(),
            }))
            .unwrap();
    }
}

impl DomainObject for UnloadRecorder {
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

#[derive(Default)]
struct BatchListener {
    events: Mutex<Vec<String>>,
}

impl BatchListener {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl TransactionListener for BatchListener {
    fn objects_unloading(&self, _transaction: &ClientTransaction, ids: &[ObjectId]) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("unloading x{}", ids.len()));
        Ok(())
    }

    fn objects_unloaded(&self, _transaction: &ClientTransaction, ids: &[ObjectId]) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("unloaded x{}", ids.len()));
        Ok(())
    }
}

#[test]
fn test_changed_container_blocks_construction() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let order1 = ObjectId::new("Order");
    let order2 = ObjectId::new("Order");
    register_existing(&transaction, &order1, vec![("Number", Value::from(1))]);
    register_existing(&transaction, &order2, vec![("Number", Value::from(2))]);

    transaction
        .set_property(&order2, "Number", Value::from(99))
        .unwrap();

    // Construction fails before any state is touched, naming the changed
    // object.
    let result = UnloadCommand::new(transaction.clone(), &[order1.clone(), order2.clone()]);
    match result {
        Err(StoreError::CannotUnload { id, state }) => {
            assert_eq!(id, order2);
            assert_eq!(state, "CHANGED");
        }
        other => panic!("expected CannotUnload, got {:?}", other.err()),
    }
    assert!(transaction.data_container(&order1).unwrap().is_some());
    assert!(transaction.data_container(&order2).unwrap().is_some());

    // The unchanged object alone unloads fine.
    let command = UnloadCommand::new(transaction.clone(), &[order1.clone()]).unwrap();
    notify_and_perform(&command).unwrap();
    assert!(transaction.data_container(&order1).unwrap().is_none());
    assert!(transaction.data_container(&order2).unwrap().is_some());
}

#[test]
fn test_changed_own_end_point_blocks_construction() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let customer = ObjectId::new("Customer");
    let order = ObjectId::new("Order");
    register_existing(&transaction, &customer, Vec::new());
    register_existing(
        &transaction,
        &order,
        vec![("Customer", Value::from(customer))],
    );

    let real_id = RelationEndPointId::new(order.clone(), "Customer");
    transaction.set_related_object(&real_id, None).unwrap();

    let result = UnloadCommand::new(transaction, &[order.clone()]);
    match result {
        Err(StoreError::EndPointChanged { id, end_point }) => {
            assert_eq!(id, order);
            assert_eq!(end_point, real_id);
        }
        other => panic!("expected EndPointChanged, got {:?}", other.err()),
    }
}

#[test]
fn test_changed_opposite_virtual_end_point_blocks_construction() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let order = ObjectId::new("Order");
    let ticket = ObjectId::new("OrderTicket");
    register_existing(&transaction, &order, Vec::new());
    register_existing(
        &transaction,
        &ticket,
        vec![("Order", Value::from(order.clone()))],
    );

    // A pending change on the order's virtual side blocks unloading the
    // ticket, whose own end point is untouched.
    let virtual_id = RelationEndPointId::new(order, "Ticket");
    transaction
        .get_end_point_with_lazy_load(&virtual_id)
        .unwrap();
    transaction.set_related_object(&virtual_id, None).unwrap();

    let result = UnloadCommand::new(transaction, &[ticket.clone()]);
    match result {
        Err(StoreError::EndPointChanged { id, end_point }) => {
            assert_eq!(id, ticket);
            assert_eq!(end_point, virtual_id);
        }
        other => panic!("expected EndPointChanged, got {:?}", other.err()),
    }
}

#[test]
fn test_never_loaded_objects_are_silently_ignored() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let order = ObjectId::new("Order");
    register_existing(&transaction, &order, Vec::new());

    let command = UnloadCommand::new(
        transaction,
        &[order.clone(), ObjectId::new("Order"), ObjectId::new("Customer")],
    )
    .unwrap();
    assert_eq!(command.affected_data_containers(), &[order]);
}

#[test]
fn test_own_real_end_points_are_included() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let customer = ObjectId::new("Customer");
    let order = ObjectId::new("Order");
    register_existing(&transaction, &customer, Vec::new());
    register_existing(
        &transaction,
        &order,
        vec![("Customer", Value::from(customer))],
    );

    let command = UnloadCommand::new(transaction, &[order.clone()]).unwrap();
    assert_eq!(
        command.affected_end_point_ids(),
        &[RelationEndPointId::new(order, "Customer")]
    );
}

#[test]
fn test_loaded_null_virtual_end_point_is_included() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let customer = ObjectId::new("Customer");
    register_existing(&transaction, &customer, Vec::new());

    let orders_id = RelationEndPointId::new(customer.clone(), "Orders");
    transaction
        .get_end_point_with_lazy_load(&orders_id)
        .unwrap();

    let command = UnloadCommand::new(transaction.clone(), &[customer]).unwrap();
    assert_eq!(command.affected_end_point_ids(), &[orders_id.clone()]);

    notify_and_perform(&command).unwrap();
    assert!(!transaction.is_end_point_loaded(&orders_id).unwrap());
}

#[test]
fn test_foreign_non_null_virtual_end_point_is_excluded() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let customer = ObjectId::new("Customer");
    let order = ObjectId::new("Order");
    register_existing(&transaction, &customer, Vec::new());
    register_existing(
        &transaction,
        &order,
        vec![("Customer", Value::from(customer.clone()))],
    );

    // The customer's loaded collection references an order that stays
    // loaded; the end point must survive the unload of the customer.
    let orders_id = RelationEndPointId::new(customer.clone(), "Orders");
    transaction
        .get_end_point_with_lazy_load(&orders_id)
        .unwrap();

    let command = UnloadCommand::new(transaction.clone(), &[customer.clone()]).unwrap();
    assert!(command.affected_end_point_ids().is_empty());

    notify_and_perform(&command).unwrap();
    assert!(transaction.data_container(&customer).unwrap().is_none());
    assert!(transaction.is_end_point_loaded(&orders_id).unwrap());
}

#[test]
fn test_virtual_end_point_goes_along_when_owners_unload_too() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let customer = ObjectId::new("Customer");
    let order = ObjectId::new("Order");
    register_existing(&transaction, &customer, Vec::new());
    register_existing(
        &transaction,
        &order,
        vec![("Customer", Value::from(customer.clone()))],
    );

    let orders_id = RelationEndPointId::new(customer.clone(), "Orders");
    transaction
        .get_end_point_with_lazy_load(&orders_id)
        .unwrap();

    let command =
        UnloadCommand::new(transaction.clone(), &[customer.clone(), order.clone()]).unwrap();
    let affected = command.affected_end_point_ids();
    assert!(affected.contains(&orders_id));
    assert!(affected.contains(&RelationEndPointId::new(order.clone(), "Customer")));

    notify_and_perform(&command).unwrap();
    assert!(!transaction.is_end_point_loaded(&orders_id).unwrap());
    assert!(transaction.data_container(&customer).unwrap().is_none());
    assert!(transaction.data_container(&order).unwrap().is_none());
}

#[test]
fn test_unload_repairs_surviving_virtual_end_point() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let customer = ObjectId::new("Customer");
    let order = ObjectId::new("Order");
    register_existing(&transaction, &customer, Vec::new());
    register_existing(
        &transaction,
        &order,
        vec![("Customer", Value::from(customer.clone()))],
    );

    let orders_id = RelationEndPointId::new(customer, "Orders");
    transaction
        .get_end_point_with_lazy_load(&orders_id)
        .unwrap();

    // Unloading the order removes its real end point; the customer's loaded
    // collection drops the back reference instead of keeping a dangling one.
    let command = UnloadCommand::new(transaction.clone(), &[order]).unwrap();
    notify_and_perform(&command).unwrap();

    let orders = transaction.end_point(&orders_id).unwrap().unwrap();
    assert!(orders.is_null());
    assert!(orders.original_related().is_empty());
    assert!(!orders.has_changed());
}

#[test]
fn test_batch_hooks_unwind_in_reverse() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let first = ObjectId::new("Order");
    let second = ObjectId::new("Order");
    register_existing(&transaction, &first, Vec::new());
    register_existing(&transaction, &second, Vec::new());

    let log = Arc::new(Mutex::new(Vec::new()));
    UnloadRecorder::enlist(&transaction, &first, "first", &log);
    UnloadRecorder::enlist(&transaction, &second, "second", &log);

    let command = UnloadCommand::new(transaction, &[first, second]).unwrap();
    notify_and_perform(&command).unwrap();

    let recorded = log.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![
            "first.unloading",
            "second.unloading",
            "second.unloaded",
            "first.unloaded",
        ]
    );
}

#[test]
fn test_batch_listener_events_carry_the_ordered_set() {
    let listener = Arc::new(BatchListener::default());
    let transaction = ClientTransaction::root(commerce_catalog())
        .with_listener(listener.clone())
        .unwrap();
    let first = ObjectId::new("Order");
    let second = ObjectId::new("Order");
    register_existing(&transaction, &first, Vec::new());
    register_existing(&transaction, &second, Vec::new());

    let command = UnloadCommand::new(transaction, &[first, second]).unwrap();
    notify_and_perform(&command).unwrap();

    assert_eq!(listener.events(), vec!["unloading x2", "unloaded x2"]);
}

#[test]
fn test_new_container_is_marked_invalid_on_unload() {
    let transaction = ClientTransaction::root(commerce_catalog());
    let order = ObjectId::new("Order");
    transaction
        .register_data_container(DataContainer::new_object(
            order.clone(),
            Vec::<(&str, Value)>::new(),
        ))
        .unwrap();

    let command = UnloadCommand::new(transaction.clone(), &[order.clone()]).unwrap();
    notify_and_perform(&command).unwrap();

    assert!(transaction.data_container(&order).unwrap().is_none());
    assert!(transaction.is_invalid(&order).unwrap());
}
