//! Async backing store trait.
//!
//! The relational source of truth behind the Entity and Association Stores.
//! Implementations must enforce uniqueness of the association triple
//! atomically on insert and must serve ordered range queries over
//! `(created_at DESC, destination_id DESC)`.

use ::async_trait::async_trait;
use assoc_core::{
    Association, AssociationItem, AssociationKey, AssociationPatch, AssociationType, AssocResult,
    Cursor, NewAssociation, Object, ObjectId, ObjectType,
};
use serde_json::Value as JsonValue;

/// One page worth of an edge listing, as the backing store sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub source_id: ObjectId,
    pub association_type: AssociationType,
    /// Exclusive bound; rows must lie strictly past it in listing order.
    pub after: Option<Cursor>,
    pub limit: u32,
}

/// Async backing store for objects and associations.
#[async_trait]
pub trait BackingStore: Send + Sync {
    // ========================================================================
    // OBJECT OPERATIONS
    // ========================================================================

    /// Insert a new object. The store assigns the id and both timestamps.
    async fn object_insert(&self, object_type: ObjectType, data: &JsonValue) -> AssocResult<Object>;

    /// Get an object by id.
    async fn object_get(&self, id: ObjectId) -> AssocResult<Option<Object>>;

    /// Whether an object with this id exists.
    async fn object_exists(&self, id: ObjectId) -> AssocResult<bool>;

    /// Replace an object's payload. Returns false when no row matched.
    async fn object_update(&self, id: ObjectId, data: &JsonValue) -> AssocResult<bool>;

    /// Hard-delete an object. Returns false when no row matched.
    async fn object_delete(&self, id: ObjectId) -> AssocResult<bool>;

    // ========================================================================
    // ASSOCIATION OPERATIONS
    // ========================================================================

    /// Insert a new active association.
    ///
    /// An existing row for the same key, whatever its status, must yield
    /// `ConflictError::AssociationExists` and leave that row untouched.
    async fn association_insert(&self, new: &NewAssociation) -> AssocResult<Association>;

    /// Get an association only if it is active.
    async fn association_get_active(&self, key: &AssociationKey) -> AssocResult<Option<Association>>;

    /// Apply a partial update to a row regardless of its status.
    /// Returns the updated row, or `None` when no row matched.
    async fn association_update(
        &self,
        key: &AssociationKey,
        patch: &AssociationPatch,
    ) -> AssocResult<Option<Association>>;

    /// Active rows for one (source, type) pair, newest first, at most
    /// `query.limit` of them.
    async fn association_page(&self, query: &PageQuery) -> AssocResult<Vec<AssociationItem>>;

    /// Number of active rows for one (source, type) pair.
    async fn association_count_active(
        &self,
        source_id: ObjectId,
        association_type: AssociationType,
    ) -> AssocResult<u64>;

    // ========================================================================
    // HEALTH
    // ========================================================================

    /// Round-trip to the store.
    async fn ping(&self) -> AssocResult<()>;
}
