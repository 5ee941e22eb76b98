//! Entity Store: object CRUD against the backing store.
//!
//! No cache and no pagination. Object types and payload shapes are checked
//! by the caller before they get here.

use std::sync::Arc;

use assoc_core::{AssocResult, CreatedObject, NotFoundError, Object, ObjectId, ObjectType};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::backing::BackingStore;

pub struct EntityStore<B> {
    backend: Arc<B>,
}

impl<B> Clone for EntityStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: BackingStore> EntityStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Insert a new object and return its assigned id.
    pub async fn create(&self, object_type: ObjectType, data: JsonValue) -> AssocResult<CreatedObject> {
        let object = self.backend.object_insert(object_type, &data).await?;
        debug!(id = %object.id, object_type = %object_type, "object created");
        Ok(CreatedObject {
            id: object.id,
            object_type: object.object_type,
        })
    }

    pub async fn get(&self, id: ObjectId) -> AssocResult<Object> {
        self.backend
            .object_get(id)
            .await?
            .ok_or_else(|| NotFoundError::Object { id }.into())
    }

    /// Replace the object's payload wholesale.
    pub async fn update(&self, id: ObjectId, data: JsonValue) -> AssocResult<()> {
        if !self.backend.object_update(id, &data).await? {
            return Err(NotFoundError::Object { id }.into());
        }
        debug!(id = %id, "object updated");
        Ok(())
    }

    /// Hard delete. Associations naming the object are left in place.
    pub async fn delete(&self, id: ObjectId) -> AssocResult<()> {
        if !self.backend.object_delete(id).await? {
            return Err(NotFoundError::Object { id }.into());
        }
        debug!(id = %id, "object deleted");
        Ok(())
    }

    /// Whether an object exists.
    pub async fn exists(&self, id: ObjectId) -> AssocResult<bool> {
        self.backend.object_exists(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use assoc_core::AssocError;
    use serde_json::json;

    fn store() -> EntityStore<MemoryStore> {
        EntityStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = store();
        let created = store
            .create(ObjectType::User, json!({"name": "Ada", "username": "ada"}))
            .await
            .unwrap();
        assert_eq!(created.object_type, ObjectType::User);

        let object = store.get(created.id).await.unwrap();
        assert_eq!(object.data["username"], json!("ada"));
        assert!(store.exists(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_replaces_payload() {
        let store = store();
        let created = store
            .create(ObjectType::Place, json!({"name": "Cafe", "city": "Oslo"}))
            .await
            .unwrap();
        store.update(created.id, json!({"name": "Bar"})).await.unwrap();

        let object = store.get(created.id).await.unwrap();
        assert_eq!(object.data, json!({"name": "Bar"}));
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let store = store();
        let missing = ObjectId::new(404).unwrap();
        for err in [
            store.get(missing).await.unwrap_err(),
            store.update(missing, json!({})).await.unwrap_err(),
            store.delete(missing).await.unwrap_err(),
        ] {
            assert!(matches!(err, AssocError::NotFound(NotFoundError::Object { .. })));
        }
    }

    #[tokio::test]
    async fn test_delete_is_hard() {
        let store = store();
        let created = store.create(ObjectType::Page, json!({"title": "t"})).await.unwrap();
        store.delete(created.id).await.unwrap();
        assert!(!store.exists(created.id).await.unwrap());
        assert!(store.delete(created.id).await.is_err());
    }
}
