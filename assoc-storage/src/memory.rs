//! In-memory backing store.
//!
//! Behaves like the relational store for every contract the engine relies
//! on: server-assigned monotonic ids, atomic triple uniqueness, and the
//! composite listing order. Used by tests and by embedded setups without a
//! database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use ::async_trait::async_trait;
use assoc_core::{
    Association, AssociationItem, AssociationKey, AssociationPatch, AssociationStatus,
    AssociationType, AssocResult, Clock, ConflictError, NewAssociation, Object, ObjectId,
    ObjectType, StorageError, SystemClock,
};
use serde_json::Value as JsonValue;

use crate::backing::{BackingStore, PageQuery};

/// In-memory backing store with failure injection.
#[derive(Debug)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<ObjectId, Object>>,
    associations: RwLock<BTreeMap<AssociationKey, Association>>,
    last_id: AtomicI64,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl MemoryStore {
    /// Create an empty store on the wall clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store stamping objects from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            associations: RwLock::new(BTreeMap::new()),
            last_id: AtomicI64::new(0),
            clock,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with a backend error (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Number of association rows, deleted ones included.
    pub fn association_row_count(&self) -> usize {
        self.associations.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Raw row lookup ignoring status.
    pub fn association_row(&self, key: &AssociationKey) -> Option<Association> {
        self.associations.read().ok()?.get(key).cloned()
    }

    fn check_available(&self) -> AssocResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::backend("memory store marked unavailable").into());
        }
        Ok(())
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn object_insert(&self, object_type: ObjectType, data: &JsonValue) -> AssocResult<Object> {
        self.check_available()?;
        let mut objects = self.objects.write().map_err(|_| StorageError::LockPoisoned)?;
        let id = ObjectId::new(self.last_id.fetch_add(1, Ordering::SeqCst) + 1)?;
        let now = self.clock.now();
        let object = Object {
            id,
            object_type,
            data: data.clone(),
            created_at: now,
            updated_at: now,
        };
        objects.insert(id, object.clone());
        Ok(object)
    }

    async fn object_get(&self, id: ObjectId) -> AssocResult<Option<Object>> {
        self.check_available()?;
        let objects = self.objects.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(objects.get(&id).cloned())
    }

    async fn object_exists(&self, id: ObjectId) -> AssocResult<bool> {
        self.check_available()?;
        let objects = self.objects.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(objects.contains_key(&id))
    }

    async fn object_update(&self, id: ObjectId, data: &JsonValue) -> AssocResult<bool> {
        self.check_available()?;
        let mut objects = self.objects.write().map_err(|_| StorageError::LockPoisoned)?;
        match objects.get_mut(&id) {
            Some(object) => {
                object.data = data.clone();
                object.updated_at = self.clock.now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn object_delete(&self, id: ObjectId) -> AssocResult<bool> {
        self.check_available()?;
        let mut objects = self.objects.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(objects.remove(&id).is_some())
    }

    async fn association_insert(&self, new: &NewAssociation) -> AssocResult<Association> {
        self.check_available()?;
        let mut associations = self
            .associations
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if associations.contains_key(&new.key) {
            return Err(ConflictError::AssociationExists {
                source_id: new.key.source_id,
                association_type: new.key.association_type,
                destination_id: new.key.destination_id,
            }
            .into());
        }
        let row = Association {
            source_id: new.key.source_id,
            destination_id: new.key.destination_id,
            association_type: new.key.association_type,
            data: new.data.clone(),
            created_at: new.created_at,
            status: AssociationStatus::Active,
        };
        associations.insert(new.key, row.clone());
        Ok(row)
    }

    async fn association_get_active(&self, key: &AssociationKey) -> AssocResult<Option<Association>> {
        self.check_available()?;
        let associations = self
            .associations
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(associations
            .get(key)
            .filter(|row| row.status.is_active())
            .cloned())
    }

    async fn association_update(
        &self,
        key: &AssociationKey,
        patch: &AssociationPatch,
    ) -> AssocResult<Option<Association>> {
        self.check_available()?;
        let mut associations = self
            .associations
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let Some(row) = associations.get_mut(key) else {
            return Ok(None);
        };
        if let Some(data) = &patch.data {
            row.data = data.clone();
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        Ok(Some(row.clone()))
    }

    async fn association_page(&self, query: &PageQuery) -> AssocResult<Vec<AssociationItem>> {
        self.check_available()?;
        let associations = self
            .associations
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;

        let mut rows: Vec<&Association> = associations
            .values()
            .filter(|row| {
                row.source_id == query.source_id
                    && row.association_type == query.association_type
                    && row.status.is_active()
            })
            .filter(|row| {
                query
                    .after
                    .map_or(true, |cursor| cursor.admits(row.created_at, row.destination_id))
            })
            .collect();

        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.destination_id.cmp(&a.destination_id))
        });

        Ok(rows
            .into_iter()
            .take(query.limit as usize)
            .map(|row| AssociationItem {
                destination_id: row.destination_id,
                data: row.data.clone(),
                created_at: row.created_at,
            })
            .collect())
    }

    async fn association_count_active(
        &self,
        source_id: ObjectId,
        association_type: AssociationType,
    ) -> AssocResult<u64> {
        self.check_available()?;
        let associations = self
            .associations
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(associations
            .values()
            .filter(|row| {
                row.source_id == source_id
                    && row.association_type == association_type
                    && row.status.is_active()
            })
            .count() as u64)
    }

    async fn ping(&self) -> AssocResult<()> {
        self.check_available()
    }
}
