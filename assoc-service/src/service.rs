//! The association service: payload validation in front of [`Graph`], plus
//! startup, health and shutdown.

use std::sync::Arc;

use assoc_core::{
    AssocResult, Association, AssociationKey, AssociationPatch, AssociationType, CreatedObject,
    Object, ObjectId, ObjectType, Page, PayloadRegistry,
};
use assoc_storage::{AnyCacheTier, BackingStore, CacheTier, Graph, MetricsSnapshot};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::info;

use crate::config::ServiceConfig;
use crate::db::DbClient;
use crate::error::ServiceResult;

/// Null and absent payloads are stored as an empty object.
fn payload_or_empty(data: Option<JsonValue>) -> JsonValue {
    match data {
        None | Some(JsonValue::Null) => JsonValue::Object(Map::new()),
        Some(value) => value,
    }
}

// ============================================================================
// HEALTH
// ============================================================================

/// Reachability of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down { reason: String },
}

impl ComponentStatus {
    fn from_ping(result: AssocResult<()>) -> Self {
        match result {
            Ok(()) => ComponentStatus::Up,
            Err(e) => ComponentStatus::Down {
                reason: e.to_string(),
            },
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, ComponentStatus::Up)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub backing_store: ComponentStatus,
    pub cache: ComponentStatus,
}

impl HealthReport {
    /// Listings keep working without the cache, so only the backing store
    /// decides overall health.
    pub fn is_healthy(&self) -> bool {
        self.backing_store.is_up()
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct Service<B = DbClient, C = AnyCacheTier> {
    graph: Graph<B, C>,
    registry: Arc<PayloadRegistry>,
}

impl<B, C> Clone for Service<B, C> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl Service<DbClient, AnyCacheTier> {
    /// Build the pool, ensure the schema and open the cache tier.
    pub async fn connect(config: &ServiceConfig) -> ServiceResult<Self> {
        let db = DbClient::from_config(&config.db)?;
        db.ensure_schema().await?;
        let cache = config.cache.open()?;

        info!(
            host = %config.db.host,
            dbname = %config.db.dbname,
            cache = cache.kind(),
            "Association service connected"
        );

        let graph = Graph::new(Arc::new(db), Arc::new(cache), config.store.clone());
        Ok(Self::from_parts(graph, PayloadRegistry::with_defaults()))
    }

    /// Close the connection pool.
    pub fn shutdown(self) {
        self.graph.backend().close();
        info!("Association service shut down");
    }
}

impl<B, C> Service<B, C>
where
    B: BackingStore,
    C: CacheTier,
{
    pub fn from_parts(graph: Graph<B, C>, registry: PayloadRegistry) -> Self {
        Self {
            graph,
            registry: Arc::new(registry),
        }
    }

    pub fn graph(&self) -> &Graph<B, C> {
        &self.graph
    }

    pub fn registry(&self) -> &PayloadRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.graph.metrics()
    }

    /// Ping both dependencies concurrently.
    pub async fn health(&self) -> HealthReport {
        let (backing_store, cache) =
            tokio::join!(self.graph.backend().ping(), self.graph.cache().ping());
        HealthReport {
            backing_store: ComponentStatus::from_ping(backing_store),
            cache: ComponentStatus::from_ping(cache),
        }
    }

    // ========================================================================
    // OBJECTS
    // ========================================================================

    pub async fn create_object(
        &self,
        object_type: ObjectType,
        data: Option<JsonValue>,
    ) -> AssocResult<CreatedObject> {
        let data = payload_or_empty(data);
        self.registry.validate_object(object_type, &data)?;
        self.graph.create_object(object_type, data).await
    }

    pub async fn get_object(&self, id: ObjectId) -> AssocResult<Object> {
        self.graph.get_object(id).await
    }

    /// Replace an object's payload, validated against its stored type.
    pub async fn update_object(&self, id: ObjectId, data: Option<JsonValue>) -> AssocResult<()> {
        let existing = self.graph.get_object(id).await?;
        let data = payload_or_empty(data);
        self.registry.validate_object(existing.object_type, &data)?;
        self.graph.update_object(id, data).await
    }

    pub async fn delete_object(&self, id: ObjectId) -> AssocResult<()> {
        self.graph.delete_object(id).await
    }

    // ========================================================================
    // ASSOCIATIONS
    // ========================================================================

    pub async fn create_association(
        &self,
        key: AssociationKey,
        data: Option<JsonValue>,
    ) -> AssocResult<Association> {
        let data = data.filter(|value| !value.is_null());
        self.registry
            .validate_association(key.association_type, data.as_ref())?;
        self.graph.create_association(key, data).await
    }

    pub async fn get_association(&self, key: AssociationKey) -> AssocResult<Association> {
        self.graph.get_association(key).await
    }

    pub async fn update_association(
        &self,
        key: AssociationKey,
        mut patch: AssociationPatch,
    ) -> AssocResult<Association> {
        if matches!(patch.data, Some(JsonValue::Null)) {
            patch.data = Some(JsonValue::Object(Map::new()));
        }
        self.registry
            .validate_association(key.association_type, patch.data.as_ref())?;
        self.graph.update_association(key, patch).await
    }

    pub async fn delete_association(&self, key: AssociationKey) -> AssocResult<()> {
        self.graph.delete_association(key).await
    }

    /// List active edges. A missing limit takes the configured default and
    /// an oversized one is clamped to the maximum.
    pub async fn list_associations(
        &self,
        source_id: ObjectId,
        association_type: AssociationType,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> AssocResult<Page> {
        let config = self.graph.config();
        let limit = limit
            .unwrap_or(config.default_limit)
            .min(config.max_limit);
        self.graph
            .list_associations(source_id, association_type, limit, cursor)
            .await
    }

    pub async fn count_associations(
        &self,
        source_id: ObjectId,
        association_type: AssociationType,
    ) -> AssocResult<u64> {
        self.graph
            .count_associations(source_id, association_type)
            .await
    }
}
