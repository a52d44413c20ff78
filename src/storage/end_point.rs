// ============================================================================
// Relation End Points
// ============================================================================
//
// One side of a bidirectional relation. A real end point stores the opposite
// object reference itself and is the source of truth. Virtual end points
// mirror the real end points whose reference targets their owner; they carry
// no independent truth and must stay consistent with the real side.
//
// Both sides keep the original value next to the current one, so a pending
// modification is visible as a difference between the two.
//
// ============================================================================

use crate::core::{ObjectId, RelationEndPointId, Result, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub enum RelationEndPoint {
    Real(RealObjectEndPoint),
    VirtualObject(VirtualObjectEndPoint),
    VirtualCollection(VirtualCollectionEndPoint),
}

/// Foreign-key style end point; mutated directly.
#[derive(Debug, Clone, PartialEq)]
pub struct RealObjectEndPoint {
    id: RelationEndPointId,
    original: Option<ObjectId>,
    current: Option<ObjectId>,
}

impl RealObjectEndPoint {
    pub fn new(id: RelationEndPointId, opposite: Option<ObjectId>) -> Self {
        Self {
            id,
            original: opposite.clone(),
            current: opposite,
        }
    }

    pub fn id(&self) -> &RelationEndPointId {
        &self.id
    }

    pub fn original(&self) -> Option<&ObjectId> {
        self.original.as_ref()
    }

    pub fn current(&self) -> Option<&ObjectId> {
        self.current.as_ref()
    }

    pub fn has_changed(&self) -> bool {
        self.original != self.current
    }

    pub(crate) fn set_current(&mut self, opposite: Option<ObjectId>) {
        self.current = opposite;
    }
}

/// Derived single-valued back reference.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualObjectEndPoint {
    id: RelationEndPointId,
    original: Option<ObjectId>,
    current: Option<ObjectId>,
}

impl VirtualObjectEndPoint {
    pub fn new(id: RelationEndPointId, original: Option<ObjectId>, current: Option<ObjectId>) -> Self {
        Self { id, original, current }
    }

    pub fn id(&self) -> &RelationEndPointId {
        &self.id
    }

    pub fn original(&self) -> Option<&ObjectId> {
        self.original.as_ref()
    }

    pub fn current(&self) -> Option<&ObjectId> {
        self.current.as_ref()
    }

    pub fn has_changed(&self) -> bool {
        self.original != self.current
    }
}

/// Derived multi-valued back reference. Item order follows the registration
/// order of the owning real end points.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualCollectionEndPoint {
    id: RelationEndPointId,
    original: Vec<ObjectId>,
    current: Vec<ObjectId>,
}

impl VirtualCollectionEndPoint {
    pub fn new(id: RelationEndPointId, original: Vec<ObjectId>, current: Vec<ObjectId>) -> Self {
        Self { id, original, current }
    }

    pub fn id(&self) -> &RelationEndPointId {
        &self.id
    }

    pub fn original(&self) -> &[ObjectId] {
        &self.original
    }

    pub fn current(&self) -> &[ObjectId] {
        &self.current
    }

    pub fn has_changed(&self) -> bool {
        self.original != self.current
    }
}

impl RelationEndPoint {
    pub fn id(&self) -> &RelationEndPointId {
        match self {
            RelationEndPoint::Real(ep) => ep.id(),
            RelationEndPoint::VirtualObject(ep) => ep.id(),
            RelationEndPoint::VirtualCollection(ep) => ep.id(),
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, RelationEndPoint::Real(_))
    }

    pub fn is_virtual(&self) -> bool {
        !self.is_real()
    }

    pub fn has_changed(&self) -> bool {
        match self {
            RelationEndPoint::Real(ep) => ep.has_changed(),
            RelationEndPoint::VirtualObject(ep) => ep.has_changed(),
            RelationEndPoint::VirtualCollection(ep) => ep.has_changed(),
        }
    }

    /// No opposite object currently referenced.
    pub fn is_null(&self) -> bool {
        match self {
            RelationEndPoint::Real(ep) => ep.current().is_none(),
            RelationEndPoint::VirtualObject(ep) => ep.current().is_none(),
            RelationEndPoint::VirtualCollection(ep) => ep.current().is_empty(),
        }
    }

    /// Opposite objects currently referenced.
    pub fn current_related(&self) -> Vec<ObjectId> {
        match self {
            RelationEndPoint::Real(ep) => ep.current().cloned().into_iter().collect(),
            RelationEndPoint::VirtualObject(ep) => ep.current().cloned().into_iter().collect(),
            RelationEndPoint::VirtualCollection(ep) => ep.current().to_vec(),
        }
    }

    /// Opposite objects referenced before any pending modification.
    pub fn original_related(&self) -> Vec<ObjectId> {
        match self {
            RelationEndPoint::Real(ep) => ep.original().cloned().into_iter().collect(),
            RelationEndPoint::VirtualObject(ep) => ep.original().cloned().into_iter().collect(),
            RelationEndPoint::VirtualCollection(ep) => ep.original().to_vec(),
        }
    }

    /// Set the current reference of a single-valued end point.
    pub(crate) fn set_current_opposite(&mut self, opposite: Option<ObjectId>) -> Result<()> {
        match self {
            RelationEndPoint::Real(ep) => {
                ep.set_current(opposite);
                Ok(())
            }
            RelationEndPoint::VirtualObject(ep) => {
                ep.current = opposite;
                Ok(())
            }
            RelationEndPoint::VirtualCollection(ep) => Err(StoreError::EndPointMismatch(
                ep.id.clone(),
                "a collection end point has no single opposite".to_string(),
            )),
        }
    }

    /// Drop `owner` from the current value of a virtual end point.
    pub(crate) fn remove_current_opposite(&mut self, owner: &ObjectId) -> Result<()> {
        match self {
            RelationEndPoint::Real(ep) => Err(StoreError::EndPointMismatch(
                ep.id.clone(),
                "a real end point tracks no opposite owners".to_string(),
            )),
            RelationEndPoint::VirtualObject(ep) => {
                if ep.current.as_ref() == Some(owner) {
                    ep.current = None;
                }
                Ok(())
            }
            RelationEndPoint::VirtualCollection(ep) => {
                ep.current.retain(|item| item != owner);
                Ok(())
            }
        }
    }

    /// Record `owner`'s real end point in both the original and current value
    /// of a virtual end point (load-time registration, not a modification).
    pub(crate) fn register_original_opposite(&mut self, owner: ObjectId) -> Result<()> {
        match self {
            RelationEndPoint::Real(ep) => Err(StoreError::EndPointMismatch(
                ep.id.clone(),
                "only virtual end points track opposite owners".to_string(),
            )),
            RelationEndPoint::VirtualObject(ep) => {
                if let Some(existing) = &ep.original {
                    if existing != &owner {
                        return Err(StoreError::EndPointMismatch(
                            ep.id.clone(),
                            format!("already references '{}'", existing),
                        ));
                    }
                }
                ep.original = Some(owner.clone());
                ep.current = Some(owner);
                Ok(())
            }
            RelationEndPoint::VirtualCollection(ep) => {
                if !ep.original.contains(&owner) {
                    ep.original.push(owner.clone());
                }
                if !ep.current.contains(&owner) {
                    ep.current.push(owner);
                }
                Ok(())
            }
        }
    }

    /// Drop `owner`'s back reference from a virtual end point entirely.
    ///
    /// This is the minimal repair keeping the bidirectional invariant intact
    /// when the owning real end point leaves the registry.
    pub(crate) fn unregister_original_opposite(&mut self, owner: &ObjectId) -> Result<()> {
        match self {
            RelationEndPoint::Real(ep) => Err(StoreError::EndPointMismatch(
                ep.id.clone(),
                "only virtual end points track opposite owners".to_string(),
            )),
            RelationEndPoint::VirtualObject(ep) => {
                if ep.original.as_ref() == Some(owner) {
                    ep.original = None;
                }
                if ep.current.as_ref() == Some(owner) {
                    ep.current = None;
                }
                Ok(())
            }
            RelationEndPoint::VirtualCollection(ep) => {
                ep.original.retain(|item| item != owner);
                ep.current.retain(|item| item != owner);
                Ok(())
            }
        }
    }

    /// Record `owner` in the current value only (used when a real end point
    /// is re-registered against a new opposite after a modification).
    pub(crate) fn register_current_opposite(&mut self, owner: ObjectId) -> Result<()> {
        match self {
            RelationEndPoint::Real(ep) => Err(StoreError::EndPointMismatch(
                ep.id.clone(),
                "only virtual end points track opposite owners".to_string(),
            )),
            RelationEndPoint::VirtualObject(ep) => {
                ep.current = Some(owner);
                Ok(())
            }
            RelationEndPoint::VirtualCollection(ep) => {
                if !ep.current.contains(&owner) {
                    ep.current.push(owner);
                }
                Ok(())
            }
        }
    }
}
