//! The inbound operation surface.
//!
//! [`Graph`] pairs an Entity Store and an Association Store over the same
//! backing store and cache tier. Arguments arrive already parsed and
//! type-checked; payload shape checks belong to the caller.

use std::sync::Arc;

use assoc_core::{
    AssocResult, Association, AssociationKey, AssociationPatch, AssociationType, Clock,
    CreatedObject, Object, ObjectId, ObjectType, Page, StoreConfig, SystemClock,
};
use serde_json::Value as JsonValue;

use crate::association_store::AssociationStore;
use crate::backing::BackingStore;
use crate::cache::CacheTier;
use crate::entity_store::EntityStore;
use crate::metrics::MetricsSnapshot;

pub struct Graph<B, C> {
    entities: EntityStore<B>,
    associations: AssociationStore<B, C>,
    backend: Arc<B>,
    cache: Arc<C>,
}

impl<B, C> Clone for Graph<B, C> {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            associations: self.associations.clone(),
            backend: Arc::clone(&self.backend),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<B, C> Graph<B, C>
where
    B: BackingStore,
    C: CacheTier,
{
    /// Wire both stores on the wall clock.
    pub fn new(backend: Arc<B>, cache: Arc<C>, config: StoreConfig) -> Self {
        Self::with_clock(backend, cache, config, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: Arc<B>, cache: Arc<C>, config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entities: EntityStore::new(Arc::clone(&backend)),
            associations: AssociationStore::new(Arc::clone(&backend), Arc::clone(&cache), config, clock),
            backend,
            cache,
        }
    }

    pub fn entities(&self) -> &EntityStore<B> {
        &self.entities
    }

    pub fn associations(&self) -> &AssociationStore<B, C> {
        &self.associations
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn config(&self) -> &StoreConfig {
        self.associations.config()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.associations.metrics().snapshot()
    }

    // ========================================================================
    // OBJECTS
    // ========================================================================

    pub async fn create_object(&self, object_type: ObjectType, data: JsonValue) -> AssocResult<CreatedObject> {
        self.entities.create(object_type, data).await
    }

    pub async fn get_object(&self, id: ObjectId) -> AssocResult<Object> {
        self.entities.get(id).await
    }

    pub async fn update_object(&self, id: ObjectId, data: JsonValue) -> AssocResult<()> {
        self.entities.update(id, data).await
    }

    pub async fn delete_object(&self, id: ObjectId) -> AssocResult<()> {
        self.entities.delete(id).await
    }

    // ========================================================================
    // ASSOCIATIONS
    // ========================================================================

    pub async fn create_association(
        &self,
        key: AssociationKey,
        data: Option<JsonValue>,
    ) -> AssocResult<Association> {
        self.associations.create(key, data).await
    }

    pub async fn get_association(&self, key: AssociationKey) -> AssocResult<Association> {
        self.associations.get(key).await
    }

    pub async fn update_association(
        &self,
        key: AssociationKey,
        patch: AssociationPatch,
    ) -> AssocResult<Association> {
        self.associations.update(key, patch).await
    }

    pub async fn delete_association(&self, key: AssociationKey) -> AssocResult<()> {
        self.associations.delete(key).await
    }

    pub async fn list_associations(
        &self,
        source_id: ObjectId,
        association_type: AssociationType,
        limit: u32,
        cursor: Option<&str>,
    ) -> AssocResult<Page> {
        self.associations
            .list(source_id, association_type, limit, cursor)
            .await
    }

    pub async fn count_associations(
        &self,
        source_id: ObjectId,
        association_type: AssociationType,
    ) -> AssocResult<u64> {
        self.associations.count(source_id, association_type).await
    }
}
