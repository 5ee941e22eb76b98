//! Association Store: edge CRUD, pagination and cache orchestration.
//!
//! # Consistency
//!
//! The backing store is the source of truth; the cache only ever holds
//! whole-page snapshots. Every successful create, update or soft delete on
//! `(source, type)` evicts all cached pages for that pair, after the write
//! has been acknowledged. A listing that raced ahead of an eviction can
//! serve a stale page for at most the page TTL.
//!
//! # Failure Handling
//!
//! - Backing store errors abort the operation and propagate.
//! - Cache errors on the read path degrade to a backing store read.
//! - Cache errors on the invalidation path are logged and counted; the
//!   write has already committed and still succeeds.
//!
//! Nothing here retries.

use std::sync::Arc;

use assoc_core::{
    AssocError, Association, AssociationKey, AssociationPatch, AssociationType, AssocResult,
    Clock, Cursor, NewAssociation, NotFoundError, ObjectId, Page, StoreConfig, ValidationError,
};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::backing::{BackingStore, PageQuery};
use crate::cache::{CacheTier, PageKey};
use crate::metrics::StoreMetrics;

/// Payload stored when the caller supplies none.
fn normalize_payload(data: Option<JsonValue>) -> JsonValue {
    match data {
        None | Some(JsonValue::Null) => json!({}),
        Some(data) => data,
    }
}

pub struct AssociationStore<B, C> {
    backend: Arc<B>,
    cache: Arc<C>,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<StoreMetrics>,
}

impl<B, C> Clone for AssociationStore<B, C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<B, C> AssociationStore<B, C>
where
    B: BackingStore,
    C: CacheTier,
{
    pub fn new(backend: Arc<B>, cache: Arc<C>, config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            cache,
            config,
            clock,
            metrics: Arc::new(StoreMetrics::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<StoreMetrics> {
        &self.metrics
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Create an active edge stamped with the current time.
    ///
    /// Both endpoints must exist; a missing one is reported as a validation
    /// error naming `sourceId` or `destinationId`, source first. An
    /// existing row for the triple, active or deleted, is a conflict.
    pub async fn create(&self, key: AssociationKey, data: Option<JsonValue>) -> AssocResult<Association> {
        self.ensure_endpoints_exist(key.source_id, key.destination_id)
            .await?;

        let new = NewAssociation {
            key,
            data: normalize_payload(data),
            created_at: self.clock.now(),
        };
        let row = self.backend.association_insert(&new).await?;
        debug!(
            source_id = %key.source_id,
            association_type = %key.association_type,
            destination_id = %key.destination_id,
            "association created"
        );

        self.invalidate(key.source_id, key.association_type).await;
        Ok(row)
    }

    /// Partially update an edge, whatever its current status.
    pub async fn update(&self, key: AssociationKey, patch: AssociationPatch) -> AssocResult<Association> {
        if patch.is_empty() {
            return Err(ValidationError::NothingToUpdate.into());
        }
        let patch = AssociationPatch {
            data: patch.data.map(|data| normalize_payload(Some(data))),
            status: patch.status,
        };

        let row = self
            .backend
            .association_update(&key, &patch)
            .await?
            .ok_or_else(|| Self::not_found(&key))?;
        debug!(
            source_id = %key.source_id,
            association_type = %key.association_type,
            destination_id = %key.destination_id,
            status = ?row.status,
            "association updated"
        );

        self.invalidate(key.source_id, key.association_type).await;
        Ok(row)
    }

    /// Soft delete. Succeeds again on an already deleted edge; only a
    /// missing row is not-found.
    pub async fn delete(&self, key: AssociationKey) -> AssocResult<()> {
        self.backend
            .association_update(&key, &AssociationPatch::soft_delete())
            .await?
            .ok_or_else(|| Self::not_found(&key))?;
        debug!(
            source_id = %key.source_id,
            association_type = %key.association_type,
            destination_id = %key.destination_id,
            "association soft-deleted"
        );

        self.invalidate(key.source_id, key.association_type).await;
        Ok(())
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Fetch a single active edge. Deleted and absent edges look the same.
    pub async fn get(&self, key: AssociationKey) -> AssocResult<Association> {
        self.backend
            .association_get_active(&key)
            .await?
            .ok_or_else(|| Self::not_found(&key))
    }

    /// One page of active edges, newest first, cache-first.
    ///
    /// `limit` must lie in `1..=max_limit`. `cursor` is the `next_cursor`
    /// of a previous page; absent or empty starts from the top.
    pub async fn list(
        &self,
        source_id: ObjectId,
        association_type: AssociationType,
        limit: u32,
        cursor: Option<&str>,
    ) -> AssocResult<Page> {
        self.check_limit(limit)?;
        let after = Cursor::decode(cursor)?;

        let key = PageKey::new(source_id, association_type, after.map(|c| c.encode()), limit).encode();

        if let Some(page) = self.read_cached(&key).await {
            self.metrics.record_hit();
            debug!(cache_key = %key, items = page.len(), "page cache hit");
            return Ok(page);
        }
        self.metrics.record_miss();

        let query = PageQuery {
            source_id,
            association_type,
            after,
            limit,
        };
        let items = self.backend.association_page(&query).await?;

        let next_cursor = if items.len() == limit as usize {
            Cursor::encode_after(items.last())
        } else {
            None
        };
        let page = Page { items, next_cursor };
        debug!(
            cache_key = %key,
            items = page.len(),
            has_more = page.next_cursor.is_some(),
            "page loaded from backing store"
        );

        self.write_cached(&key, &page).await;
        Ok(page)
    }

    /// Number of active edges. Always read from the backing store.
    pub async fn count(&self, source_id: ObjectId, association_type: AssociationType) -> AssocResult<u64> {
        self.backend
            .association_count_active(source_id, association_type)
            .await
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    async fn ensure_endpoints_exist(&self, source_id: ObjectId, destination_id: ObjectId) -> AssocResult<()> {
        let (source_exists, destination_exists) = tokio::try_join!(
            self.backend.object_exists(source_id),
            self.backend.object_exists(destination_id),
        )?;
        if !source_exists {
            return Err(ValidationError::invalid("sourceId", format!("object {source_id} does not exist")).into());
        }
        if !destination_exists {
            return Err(ValidationError::invalid(
                "destinationId",
                format!("object {destination_id} does not exist"),
            )
            .into());
        }
        Ok(())
    }

    fn check_limit(&self, limit: u32) -> Result<(), ValidationError> {
        let max = self.config.max_limit;
        if limit == 0 || limit > max {
            return Err(ValidationError::InvalidRange {
                field: "limit".to_string(),
                min: 1,
                max: i64::from(max),
                value: i64::from(limit),
            });
        }
        Ok(())
    }

    /// Cached page for `key`, or `None` on a miss or any cache trouble.
    async fn read_cached(&self, key: &str) -> Option<Page> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                self.metrics.record_degraded_read();
                warn!(cache_key = %key, error = %e, "cache read failed, falling back to backing store");
                return None;
            }
        };
        match serde_json::from_str::<Page>(&raw) {
            Ok(page) => Some(page),
            Err(e) => {
                self.metrics.record_degraded_read();
                warn!(cache_key = %key, error = %e, "unreadable cached page, falling back to backing store");
                None
            }
        }
    }

    async fn write_cached(&self, key: &str, page: &Page) {
        let raw = match serde_json::to_string(page) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "failed to serialize page for cache");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, raw, self.config.page_ttl).await {
            warn!(cache_key = %key, error = %e, "failed to populate page cache");
        }
    }

    /// Evict every cached page for `(source_id, association_type)`.
    /// Never fails the caller.
    async fn invalidate(&self, source_id: ObjectId, association_type: AssociationType) {
        let result = match PageKey::invalidation_pattern(source_id, association_type) {
            Ok(pattern) => {
                self.cache
                    .scan_and_delete(&pattern, self.config.scan_batch)
                    .await
            }
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(evicted) => {
                self.metrics.record_invalidation(evicted);
                debug!(
                    source_id = %source_id,
                    association_type = %association_type,
                    evicted,
                    "page cache invalidated"
                );
            }
            Err(e) => {
                self.metrics.record_failed_invalidation();
                warn!(
                    source_id = %source_id,
                    association_type = %association_type,
                    error = %e,
                    "page cache invalidation failed; stale pages expire with their TTL"
                );
            }
        }
    }

    fn not_found(key: &AssociationKey) -> AssocError {
        NotFoundError::Association {
            source_id: key.source_id,
            association_type: key.association_type,
            destination_id: key.destination_id,
        }
        .into()
    }
}
