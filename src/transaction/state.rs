// ============================================================================
// Client Transaction
// ============================================================================
//
// The unit of work owning the object and end point registries. Transactions
// form an ordered hierarchy: a root may own a chain of subtransactions, and
// every non-leaf ancestor is read-only while a leaf is active.
//
// Locks guard individual registry operations only and are never held across
// listener or hook invocations, so handlers may re-enter the transaction
// (the unload-all fixpoint depends on this).
//
// ============================================================================

use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::core::{ObjectId, RelationEndPointId, Result, StoreError, Value};
use crate::storage::{
    Catalog, DataContainer, DataContainerMap, RelationEndPoint, RelationEndPointMap,
};

use super::listener::TransactionListener;
use super::object::DomainObject;

/// Global transaction ID counter
static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

pub struct ClientTransaction {
    id: TransactionId,
    parent: Option<Arc<ClientTransaction>>,
    catalog: Catalog,
    read_only: AtomicBool,
    containers: RwLock<DataContainerMap>,
    end_points: RwLock<RelationEndPointMap>,
    invalid_objects: RwLock<HashSet<ObjectId>>,
    enlisted: RwLock<HashMap<ObjectId, Arc<dyn DomainObject>>>,
    listeners: RwLock<Vec<Arc<dyn TransactionListener>>>,
}

impl ClientTransaction {
    /// Create a root transaction over the given catalog.
    pub fn root(catalog: Catalog) -> Arc<Self> {
        Arc::new(Self {
            id: TransactionId::new(),
            parent: None,
            catalog,
            read_only: AtomicBool::new(false),
            containers: RwLock::new(DataContainerMap::new()),
            end_points: RwLock::new(RelationEndPointMap::new()),
            invalid_objects: RwLock::new(HashSet::new()),
            enlisted: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
        })
    }

    /// Attach a listener, chained builder style.
    pub fn with_listener(
        self: Arc<Self>,
        listener: Arc<dyn TransactionListener>,
    ) -> Result<Arc<Self>> {
        self.add_listener(listener)?;
        Ok(self)
    }

    pub fn add_listener(&self, listener: Arc<dyn TransactionListener>) -> Result<()> {
        self.listeners.write()?.push(listener);
        Ok(())
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn parent(&self) -> Option<&Arc<ClientTransaction>> {
        self.parent.as_ref()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::SeqCst)
    }

    pub(crate) fn set_read_only(&self, value: bool) {
        self.read_only.store(value, Ordering::SeqCst);
    }

    /// Open a subtransaction. The receiver becomes read-only until the
    /// subtransaction is discarded.
    pub fn create_sub_transaction(self: &Arc<Self>) -> Result<Arc<ClientTransaction>> {
        if self.is_read_only() {
            return Err(StoreError::ReadOnlyTransaction(self.id.to_string()));
        }
        self.set_read_only(true);

        let sub = Arc::new(Self {
            id: TransactionId::new(),
            parent: Some(self.clone()),
            catalog: self.catalog.clone(),
            read_only: AtomicBool::new(false),
            containers: RwLock::new(DataContainerMap::new()),
            end_points: RwLock::new(RelationEndPointMap::new()),
            invalid_objects: RwLock::new(HashSet::new()),
            enlisted: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
        });
        debug!("opened subtransaction {} under {}", sub.id, self.id);
        Ok(sub)
    }

    /// Release this subtransaction, making the parent writable again.
    pub fn discard(&self) {
        if let Some(parent) = &self.parent {
            parent.set_read_only(false);
            debug!("discarded subtransaction {}, parent {} writable", self.id, parent.id);
        }
    }

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    /// Register a freshly created or loaded container, seeding its real
    /// relation end points from its reference properties.
    pub fn register_data_container(&self, container: DataContainer) -> Result<()> {
        if self.is_read_only() {
            return Err(StoreError::ReadOnlyTransaction(self.id.to_string()));
        }
        if self.is_invalid(container.id())? {
            return Err(StoreError::ObjectInvalid(container.id().clone()));
        }

        let mut containers = self.containers.write()?;
        if containers.contains(container.id()) {
            return Err(StoreError::ObjectAlreadyRegistered(container.id().clone()));
        }

        let mut end_points = self.end_points.write()?;
        end_points.register_for_container(&container, &self.catalog)?;
        debug!("registered container '{}' in {}", container.id(), self.id);
        containers.register(container)
    }

    pub fn data_container(&self, id: &ObjectId) -> Result<Option<DataContainer>> {
        Ok(self.containers.read()?.get(id).cloned())
    }

    pub fn is_loaded(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.containers.read()?.contains(id))
    }

    /// Identities of all loaded containers, in registration order.
    pub fn loaded_object_ids(&self) -> Result<Vec<ObjectId>> {
        Ok(self.containers.read()?.object_ids())
    }

    /// Record a pending property modification on a loaded container.
    ///
    /// This is the container-level operation only; relation end points seeded
    /// from reference properties are not re-synchronized.
    pub fn set_property(&self, id: &ObjectId, name: &str, value: Value) -> Result<()> {
        if self.is_read_only() {
            return Err(StoreError::ReadOnlyTransaction(self.id.to_string()));
        }
        let mut containers = self.containers.write()?;
        let container = containers
            .get_mut(id)
            .ok_or_else(|| StoreError::ObjectNotFound(id.clone()))?;
        container.set_property(name, value)
    }

    // ------------------------------------------------------------------
    // End points
    // ------------------------------------------------------------------

    pub fn end_point(&self, id: &RelationEndPointId) -> Result<Option<RelationEndPoint>> {
        Ok(self.end_points.read()?.get(id).cloned())
    }

    pub fn is_end_point_loaded(&self, id: &RelationEndPointId) -> Result<bool> {
        Ok(self.end_points.read()?.is_loaded(id))
    }

    pub fn loaded_end_point_ids(&self) -> Result<Vec<RelationEndPointId>> {
        Ok(self.end_points.read()?.ids())
    }

    /// Look up an end point, materializing it from the loaded data first if
    /// necessary.
    pub fn get_end_point_with_lazy_load(
        &self,
        id: &RelationEndPointId,
    ) -> Result<RelationEndPoint> {
        let containers = self.containers.read()?;
        let mut end_points = self.end_points.write()?;
        Ok(end_points
            .get_with_lazy_load(id, &self.catalog, &containers)?
            .clone())
    }

    /// Record a pending modification on a single-valued end point.
    ///
    /// Low level: the change is recorded on this end point only; keeping the
    /// opposite side consistent is the caller's concern.
    pub fn set_related_object(
        &self,
        id: &RelationEndPointId,
        new_opposite: Option<ObjectId>,
    ) -> Result<()> {
        if self.is_read_only() {
            return Err(StoreError::ReadOnlyTransaction(self.id.to_string()));
        }
        let containers = self.containers.read()?;
        let mut end_points = self.end_points.write()?;
        end_points.get_with_lazy_load(id, &self.catalog, &containers)?;
        let end_point = end_points
            .get_mut(id)
            .ok_or_else(|| StoreError::EndPointNotFound(id.clone()))?;
        end_point.set_current_opposite(new_opposite)
    }

    // ------------------------------------------------------------------
    // Invalid objects
    // ------------------------------------------------------------------

    /// Mark an object invalid for the remainder of this transaction.
    /// Returns false if it already was.
    pub fn mark_invalid(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.invalid_objects.write()?.insert(id.clone()))
    }

    pub fn is_invalid(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.invalid_objects.read()?.contains(id))
    }

    // ------------------------------------------------------------------
    // Enlisted domain objects
    // ------------------------------------------------------------------

    /// Enlist a domain object so its hooks participate in command execution.
    pub fn enlist(&self, object: Arc<dyn DomainObject>) -> Result<()> {
        let id = object.id().clone();
        self.enlisted.write()?.insert(id, object);
        Ok(())
    }

    pub fn enlisted_object(&self, id: &ObjectId) -> Result<Option<Arc<dyn DomainObject>>> {
        Ok(self.enlisted.read()?.get(id).cloned())
    }

    // ------------------------------------------------------------------
    // Internals for commands
    // ------------------------------------------------------------------

    pub(crate) fn containers(&self) -> &RwLock<DataContainerMap> {
        &self.containers
    }

    pub(crate) fn end_points(&self) -> &RwLock<RelationEndPointMap> {
        &self.end_points
    }

    fn listeners_snapshot(&self) -> Result<Vec<Arc<dyn TransactionListener>>> {
        Ok(self.listeners.read()?.clone())
    }

    // Listener dispatch. The listener list is snapshotted first so no lock is
    // held while handlers run.

    pub(crate) fn notify_object_deleting(&self, id: &ObjectId) -> Result<()> {
        for listener in self.listeners_snapshot()? {
            listener.object_deleting(self, id)?;
        }
        Ok(())
    }

    pub(crate) fn notify_object_deleted(&self, id: &ObjectId) -> Result<()> {
        for listener in self.listeners_snapshot()? {
            listener.object_deleted(self, id)?;
        }
        Ok(())
    }

    pub(crate) fn notify_objects_unloading(&self, ids: &[ObjectId]) -> Result<()> {
        for listener in self.listeners_snapshot()? {
            listener.objects_unloading(self, ids)?;
        }
        Ok(())
    }

    pub(crate) fn notify_objects_unloaded(&self, ids: &[ObjectId]) -> Result<()> {
        for listener in self.listeners_snapshot()? {
            listener.objects_unloaded(self, ids)?;
        }
        Ok(())
    }

    pub(crate) fn notify_container_unregistering(&self, id: &ObjectId) -> Result<()> {
        for listener in self.listeners_snapshot()? {
            listener.data_container_unregistering(self, id)?;
        }
        Ok(())
    }

    pub(crate) fn notify_relation_changing(
        &self,
        owner: &ObjectId,
        property: &str,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
    ) -> Result<()> {
        for listener in self.listeners_snapshot()? {
            listener.relation_changing(self, owner, property, old, new)?;
        }
        Ok(())
    }

    pub(crate) fn notify_relation_changed(
        &self,
        owner: &ObjectId,
        property: &str,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
    ) -> Result<()> {
        for listener in self.listeners_snapshot()? {
            listener.relation_changed(self, owner, property, old, new)?;
        }
        Ok(())
    }

    pub(crate) fn notify_virtual_end_point_state_updated(
        &self,
        id: &RelationEndPointId,
        is_empty: bool,
    ) -> Result<()> {
        for listener in self.listeners_snapshot()? {
            listener.virtual_end_point_state_updated(self, id, is_empty)?;
        }
        Ok(())
    }

    // Hook dispatch for enlisted domain objects.

    pub(crate) fn run_on_deleting(&self, id: &ObjectId) -> Result<()> {
        if let Some(object) = self.enlisted_object(id)? {
            object.on_deleting(self)?;
        }
        Ok(())
    }

    pub(crate) fn run_on_deleted(&self, id: &ObjectId) -> Result<()> {
        if let Some(object) = self.enlisted_object(id)? {
            object.on_deleted(self)?;
        }
        Ok(())
    }

    pub(crate) fn run_on_unloading(&self, id: &ObjectId) -> Result<()> {
        if let Some(object) = self.enlisted_object(id)? {
            object.on_unloading(self)?;
        }
        Ok(())
    }

    pub(crate) fn run_on_unloaded(&self, id: &ObjectId) -> Result<()> {
        if let Some(object) = self.enlisted_object(id)? {
            object.on_unloaded(self)?;
        }
        Ok(())
    }

    pub(crate) fn run_on_relation_changing(&self, id: &ObjectId, property: &str) -> Result<()> {
        if let Some(object) = self.enlisted_object(id)? {
            object.on_relation_changing(self, property)?;
        }
        Ok(())
    }

    pub(crate) fn run_on_relation_changed(&self, id: &ObjectId, property: &str) -> Result<()> {
        if let Some(object) = self.enlisted_object(id)? {
            object.on_relation_changed(self, property)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ClientTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientTransaction")
            .field("id", &self.id)
            .field("read_only", &self.is_read_only())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
