//! End-to-end behaviour of the service over the in-process stores.

use assoc_core::{
    AssocError, AssociationKey, AssociationPatch, AssociationStatus, AssociationType, ObjectId,
    ObjectType, StoreConfig, ValidationError,
};
use assoc_service::ComponentStatus;
use assoc_test_utils::assertions::*;
use assoc_test_utils::fixtures::sample_payload;
use chrono::Duration;
use serde_json::json;

#[path = "support/memory.rs"]
mod test_memory_support;
use test_memory_support::{memory_service, MemoryService};

async fn user(service: &MemoryService, username: &str) -> ObjectId {
    service
        .create_object(
            ObjectType::User,
            Some(json!({"name": username.to_uppercase(), "username": username})),
        )
        .await
        .unwrap()
        .id
}

// ============================================================================
// OBJECTS
// ============================================================================

#[tokio::test]
async fn test_object_lifecycle() {
    let (service, _clock) = memory_service(StoreConfig::default());

    let created = service
        .create_object(ObjectType::Place, Some(sample_payload(ObjectType::Place)))
        .await
        .unwrap();
    assert_eq!(created.object_type, ObjectType::Place);

    service
        .update_object(created.id, Some(json!({"name": "Library"})))
        .await
        .unwrap();
    let object = service.get_object(created.id).await.unwrap();
    assert_eq!(object.data, json!({"name": "Library"}));

    service.delete_object(created.id).await.unwrap();
    assert_not_found(&service.get_object(created.id).await);
}

#[tokio::test]
async fn test_object_payload_rules_apply() {
    let (service, _clock) = memory_service(StoreConfig::default());

    let result = service
        .create_object(ObjectType::User, Some(json!({"username": "ada"})))
        .await;
    assert_invalid_field(&result, "data.name");

    let result = service.create_object(ObjectType::Page, Some(json!([1, 2]))).await;
    assert_invalid_field(&result, "data");

    // A missing payload is an empty object, which Page rejects for lack of a title.
    let result = service.create_object(ObjectType::Page, None).await;
    assert_invalid_field(&result, "data.title");
}

#[tokio::test]
async fn test_update_object_checks_stored_type() {
    let (service, _clock) = memory_service(StoreConfig::default());
    let page = service
        .create_object(ObjectType::Page, Some(json!({"title": "About"})))
        .await
        .unwrap();

    // Valid for a user, not for the page it is applied to.
    let result = service
        .update_object(page.id, Some(json!({"name": "x", "username": "y"})))
        .await;
    assert_invalid_field(&result, "data.title");

    let missing = ObjectId::new(9_999).unwrap();
    assert_not_found(&service.update_object(missing, Some(json!({"title": "t"}))).await);
}

// ============================================================================
// ASSOCIATIONS
// ============================================================================

#[tokio::test]
async fn test_follow_scenario() {
    let (service, clock) = memory_service(StoreConfig::default());
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;
    let carol = user(&service, "carol").await;

    let follow_bob = AssociationKey::new(alice, AssociationType::Follow, bob);
    let follow_carol = AssociationKey::new(alice, AssociationType::Follow, carol);

    let created = service.create_association(follow_bob, None).await.unwrap();
    assert_eq!(created.data, json!({}));
    assert_eq!(created.status, AssociationStatus::Active);

    clock.advance(Duration::seconds(1));
    service
        .create_association(follow_carol, Some(json!({"note": "met at work"})))
        .await
        .unwrap();

    let page = service
        .list_associations(alice, AssociationType::Follow, None, None)
        .await
        .unwrap();
    let ids: Vec<_> = page.items.iter().map(|item| item.destination_id).collect();
    assert_eq!(ids, vec![carol, bob]);
    assert!(page.next_cursor.is_none());
    assert_eq!(service.count_associations(alice, AssociationType::Follow).await.unwrap(), 2);

    service.delete_association(follow_carol).await.unwrap();
    let page = service
        .list_associations(alice, AssociationType::Follow, None, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.items[0].destination_id, bob);
    assert_eq!(service.count_associations(alice, AssociationType::Follow).await.unwrap(), 1);
    assert_not_found(&service.get_association(follow_carol).await);

    // The soft-deleted row still occupies the key.
    assert_conflict(&service.create_association(follow_carol, None).await);
}

#[tokio::test]
async fn test_association_requires_existing_endpoints() {
    let (service, _clock) = memory_service(StoreConfig::default());
    let alice = user(&service, "alice").await;
    let ghost = ObjectId::new(424_242).unwrap();

    let result = service
        .create_association(AssociationKey::new(alice, AssociationType::Friend, ghost), None)
        .await;
    assert_invalid_field(&result, "destinationId");

    let result = service
        .create_association(AssociationKey::new(ghost, AssociationType::Friend, alice), None)
        .await;
    assert_invalid_field(&result, "sourceId");
}

#[tokio::test]
async fn test_association_payload_rules_apply() {
    let (service, _clock) = memory_service(StoreConfig::default());
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;
    let key = AssociationKey::new(alice, AssociationType::Like, bob);

    let result = service.create_association(key, Some(json!({"reaction": 5}))).await;
    assert_invalid_field(&result, "data.reaction");

    let created = service
        .create_association(key, Some(serde_json::Value::Null))
        .await
        .unwrap();
    assert_eq!(created.data, json!({}));

    let result = service
        .update_association(
            key,
            AssociationPatch {
                data: Some(json!("not an object")),
                status: None,
            },
        )
        .await;
    assert_invalid_field(&result, "data");
}

#[tokio::test]
async fn test_update_association_data_and_status() {
    let (service, _clock) = memory_service(StoreConfig::default());
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;
    let key = AssociationKey::new(alice, AssociationType::Friend, bob);
    let created = service
        .create_association(key, Some(json!({"note": "school"})))
        .await
        .unwrap();

    let updated = service
        .update_association(
            key,
            AssociationPatch {
                data: Some(serde_json::Value::Null),
                status: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.data, json!({}));
    assert_eq!(updated.created_at, created.created_at);

    let result = service.update_association(key, AssociationPatch::default()).await;
    assert!(matches!(
        result,
        Err(AssocError::Validation(ValidationError::NothingToUpdate))
    ));

    service.delete_association(key).await.unwrap();
    service
        .update_association(
            key,
            AssociationPatch {
                data: None,
                status: Some(AssociationStatus::Active),
            },
        )
        .await
        .unwrap();
    assert_eq!(service.get_association(key).await.unwrap().data, json!({}));
}

#[tokio::test]
async fn test_listing_reflects_updates_after_cached_read() {
    let (service, _clock) = memory_service(StoreConfig::default());
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;
    let key = AssociationKey::new(alice, AssociationType::Friend, bob);
    service
        .create_association(key, Some(json!({"note": "school"})))
        .await
        .unwrap();

    let cached = service
        .list_associations(alice, AssociationType::Friend, None, None)
        .await
        .unwrap();
    assert_eq!(cached.items[0].data, json!({"note": "school"}));

    service
        .update_association(
            key,
            AssociationPatch {
                data: Some(json!({"note": "work"})),
                status: None,
            },
        )
        .await
        .unwrap();
    let page = service
        .list_associations(alice, AssociationType::Friend, None, None)
        .await
        .unwrap();
    assert_eq!(page.items[0].data, json!({"note": "work"}));

    service.delete_association(key).await.unwrap();
    let page = service
        .list_associations(alice, AssociationType::Friend, None, None)
        .await
        .unwrap();
    assert!(page.is_empty());

    service
        .update_association(
            key,
            AssociationPatch {
                data: None,
                status: Some(AssociationStatus::Active),
            },
        )
        .await
        .unwrap();
    let page = service
        .list_associations(alice, AssociationType::Friend, None, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.items[0].destination_id, bob);
    assert_eq!(page.items[0].data, json!({"note": "work"}));
    assert_eq!(service.count_associations(alice, AssociationType::Friend).await.unwrap(), 1);
}

// ============================================================================
// LISTING
// ============================================================================

#[tokio::test]
async fn test_list_limit_defaults_and_clamps() {
    let config = StoreConfig::default().with_default_limit(2).with_max_limit(3);
    let (service, clock) = memory_service(config);
    let alice = user(&service, "alice").await;
    for name in ["b", "c", "d", "e"] {
        let other = user(&service, name).await;
        clock.advance(Duration::milliseconds(5));
        service
            .create_association(AssociationKey::new(alice, AssociationType::Follow, other), None)
            .await
            .unwrap();
    }

    let page = service
        .list_associations(alice, AssociationType::Follow, None, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_listing_order(&page);

    let page = service
        .list_associations(alice, AssociationType::Follow, Some(50), None)
        .await
        .unwrap();
    assert_eq!(page.len(), 3);
    assert!(page.next_cursor.is_some());

    let result = service
        .list_associations(alice, AssociationType::Follow, Some(0), None)
        .await;
    assert_invalid_field(&result, "limit");

    let result = service
        .list_associations(alice, AssociationType::Follow, None, Some("garbage"))
        .await;
    assert_invalid_field(&result, "cursor");
}

#[tokio::test]
async fn test_listing_sees_writes_after_cached_read() {
    let (service, clock) = memory_service(StoreConfig::default());
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;
    let carol = user(&service, "carol").await;

    service
        .create_association(AssociationKey::new(alice, AssociationType::Like, bob), None)
        .await
        .unwrap();
    let first = service
        .list_associations(alice, AssociationType::Like, None, None)
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    clock.advance(Duration::seconds(1));
    service
        .create_association(AssociationKey::new(alice, AssociationType::Like, carol), None)
        .await
        .unwrap();
    let second = service
        .list_associations(alice, AssociationType::Like, None, None)
        .await
        .unwrap();
    assert_eq!(second.items[0].destination_id, carol);
    assert_eq!(second.len(), 2);

    let metrics = service.metrics();
    assert!(metrics.invalidations >= 2);
    assert!(metrics.evicted_pages >= 1);
}

#[tokio::test]
async fn test_listing_survives_cache_outage() {
    let (service, _clock) = memory_service(StoreConfig::default());
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;

    service.graph().cache().set_unavailable(true);
    service
        .create_association(AssociationKey::new(alice, AssociationType::Friend, bob), None)
        .await
        .unwrap();
    let page = service
        .list_associations(alice, AssociationType::Friend, None, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);

    let metrics = service.metrics();
    assert_eq!(metrics.failed_invalidations, 1);
    assert_eq!(metrics.degraded_reads, 1);
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn test_health_reports_each_dependency() {
    let (service, _clock) = memory_service(StoreConfig::default());

    let report = service.health().await;
    assert!(report.is_healthy());
    assert_eq!(report.cache, ComponentStatus::Up);

    service.graph().cache().set_unavailable(true);
    let report = service.health().await;
    assert!(report.is_healthy());
    assert!(!report.cache.is_up());

    service.graph().backend().set_unavailable(true);
    let report = service.health().await;
    assert!(!report.is_healthy());
    assert_storage_error(&service.get_object(ObjectId::new(1).unwrap()).await);
}
