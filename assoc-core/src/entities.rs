//! Stored entities and the values that flow between the stores

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::enums::{AssociationStatus, AssociationType, ObjectType};
use crate::identity::{ObjectId, Timestamp};

// ============================================================================
// OBJECTS
// ============================================================================

/// A typed entity with an opaque JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    pub id: ObjectId,
    pub object_type: ObjectType,
    pub data: JsonValue,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// What `create` hands back for a new object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedObject {
    pub id: ObjectId,
    pub object_type: ObjectType,
}

// ============================================================================
// ASSOCIATIONS
// ============================================================================

/// Primary key of an association: one row per directed, typed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationKey {
    pub source_id: ObjectId,
    pub association_type: AssociationType,
    pub destination_id: ObjectId,
}

impl AssociationKey {
    pub fn new(
        source_id: ObjectId,
        association_type: AssociationType,
        destination_id: ObjectId,
    ) -> Self {
        Self {
            source_id,
            association_type,
            destination_id,
        }
    }
}

/// A full association row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub source_id: ObjectId,
    pub destination_id: ObjectId,
    pub association_type: AssociationType,
    pub data: JsonValue,
    /// Set once by the store at creation; never mutated.
    pub created_at: Timestamp,
    pub status: AssociationStatus,
}

impl Association {
    pub fn key(&self) -> AssociationKey {
        AssociationKey::new(self.source_id, self.association_type, self.destination_id)
    }
}

/// Insert payload for a new association row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssociation {
    pub key: AssociationKey,
    pub data: JsonValue,
    pub created_at: Timestamp,
}

/// Update payload for associations. Only supplied fields change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociationPatch {
    /// Replacement payload
    pub data: Option<JsonValue>,
    /// New status
    pub status: Option<AssociationStatus>,
}

impl AssociationPatch {
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.status.is_none()
    }

    /// The patch a soft delete applies.
    pub fn soft_delete() -> Self {
        Self {
            data: None,
            status: Some(AssociationStatus::Deleted),
        }
    }
}

// ============================================================================
// PAGES
// ============================================================================

/// One row of an edge listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationItem {
    pub destination_id: ObjectId,
    pub data: JsonValue,
    pub created_at: Timestamp,
}

/// A bounded, ordered slice of an edge listing plus its continuation cursor.
///
/// This is also the cached representation: a cache hit returns the page
/// exactly as it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<AssociationItem>,
    pub next_cursor: Option<String>,
}

impl Page {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
