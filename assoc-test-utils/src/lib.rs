//! Assoc Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for ids, types, timestamps, cursors and payloads
//! - Fixtures wiring a memory-backed graph on a manual clock
//! - Assertions for the error taxonomy

// Re-export the in-process backends from their source crate
pub use assoc_storage::{Graph, InMemoryCacheTier, MemoryStore};

// Re-export core types for convenience
pub use assoc_core::{
    AssocError, AssocResult, Association, AssociationItem, AssociationKey, AssociationPatch,
    AssociationStatus, AssociationType, ConflictError, CreatedObject, Cursor, ManualClock,
    NotFoundError, Object, ObjectId, ObjectType, Page, PayloadRegistry, StorageError,
    StoreConfig, Timestamp, ValidationError,
};

use chrono::{TimeZone, Utc};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// A graph over the in-process backing store and cache tier.
pub type MemoryGraph = Graph<MemoryStore, InMemoryCacheTier>;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for the association engine's types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a valid ObjectId.
    pub fn arb_object_id() -> impl Strategy<Value = ObjectId> {
        (1i64..1_000_000).prop_filter_map("id must be positive", |raw| ObjectId::new(raw).ok())
    }

    /// Generate an ObjectType variant.
    pub fn arb_object_type() -> impl Strategy<Value = ObjectType> {
        prop::sample::select(ObjectType::ALL.to_vec())
    }

    /// Generate an AssociationType variant.
    pub fn arb_association_type() -> impl Strategy<Value = AssociationType> {
        prop::sample::select(AssociationType::ALL.to_vec())
    }

    /// Generate a microsecond-precision Timestamp between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64, 0u32..1_000_000).prop_map(|(secs, micros)| {
            chrono::DateTime::from_timestamp(secs, micros * 1_000).unwrap_or_else(Utc::now)
        })
    }

    /// Generate a pagination Cursor.
    pub fn arb_cursor() -> impl Strategy<Value = Cursor> {
        (arb_timestamp(), arb_object_id()).prop_map(|(ts, id)| Cursor::new(ts, id))
    }

    /// Generate an AssociationKey.
    pub fn arb_association_key() -> impl Strategy<Value = AssociationKey> {
        (arb_object_id(), arb_association_type(), arb_object_id())
            .prop_map(|(src, kind, dst)| AssociationKey::new(src, kind, dst))
    }

    /// Generate a small flat JSON object of string fields.
    pub fn arb_payload() -> impl Strategy<Value = JsonValue> {
        prop::collection::btree_map("[a-z]{1,8}", "[a-zA-Z0-9 ]{0,16}", 0..4).prop_map(|fields| {
            JsonValue::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, JsonValue::String(v)))
                    .collect(),
            )
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// Fixed starting instant for manual clocks: 2024-01-01T00:00:00Z.
    pub fn epoch() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// A manual clock parked at [`epoch`].
    pub fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(epoch()))
    }

    /// Memory-backed graph where the backing store, cache TTLs and
    /// association timestamps all follow the returned clock.
    pub fn memory_graph(config: StoreConfig) -> (MemoryGraph, Arc<ManualClock>) {
        let clock = manual_clock();
        let backend = Arc::new(MemoryStore::with_clock(clock.clone()));
        let cache = Arc::new(InMemoryCacheTier::with_clock(clock.clone()));
        let graph = Graph::with_clock(backend, cache, config, clock.clone());
        (graph, clock)
    }

    /// A payload that satisfies the default rules for `object_type`.
    pub fn sample_payload(object_type: ObjectType) -> JsonValue {
        match object_type {
            ObjectType::User => json!({"name": "Ada Lovelace", "username": "ada"}),
            ObjectType::Post => json!({"authorId": 1, "body": "hello"}),
            ObjectType::Page => json!({"title": "Analytical Engine"}),
            ObjectType::Checkin => json!({"userId": 1, "placeId": 2, "caption": "here"}),
            ObjectType::Place => json!({"name": "Cafe", "city": "London"}),
            ObjectType::Comment => json!({"authorId": 1, "body": "nice"}),
        }
    }

    /// Create `count` users and return their ids in creation order.
    pub async fn seed_users(graph: &MemoryGraph, count: usize) -> AssocResult<Vec<ObjectId>> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let created = graph
                .create_object(
                    ObjectType::User,
                    json!({"name": format!("User {i}"), "username": format!("user{i}")}),
                )
                .await?;
            ids.push(created.id);
        }
        Ok(ids)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion functions for the error taxonomy.

    use super::*;

    /// Assert that an AssocResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &AssocResult<T>) {
        match result {
            Err(AssocError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that an AssocResult is a Validation error naming `field`.
    #[track_caller]
    pub fn assert_invalid_field<T: std::fmt::Debug>(result: &AssocResult<T>, field: &str) {
        match result {
            Err(AssocError::Validation(err)) => {
                assert_eq!(err.field(), Some(field), "Wrong field in validation error: {err}");
            }
            other => panic!("Expected Validation error on {field}, got: {:?}", other),
        }
    }

    /// Assert that an AssocResult is a NotFound error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &AssocResult<T>) {
        match result {
            Err(AssocError::NotFound(_)) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    /// Assert that an AssocResult is a Conflict error.
    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &AssocResult<T>) {
        match result {
            Err(AssocError::Conflict(_)) => {}
            other => panic!("Expected Conflict error, got: {:?}", other),
        }
    }

    /// Assert that an AssocResult is a Storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &AssocResult<T>) {
        match result {
            Err(AssocError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that a page is ordered newest first with ids breaking ties.
    #[track_caller]
    pub fn assert_listing_order(page: &Page) {
        for pair in page.items.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                (a.created_at, a.destination_id) > (b.created_at, b.destination_id),
                "Listing out of order: {:?} before {:?}",
                a,
                b
            );
        }
    }
}
