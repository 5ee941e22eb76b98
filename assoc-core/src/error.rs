//! Error types for association store operations

use thiserror::Error;

use crate::enums::AssociationType;
use crate::identity::ObjectId;

/// Validation errors.
///
/// Raised before anything reaches the backing store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid {field}: {value} is outside {min}..={max}")]
    InvalidRange {
        field: String,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("Invalid cursor: {reason}")]
    InvalidCursor { reason: String },

    #[error("Nothing to update")]
    NothingToUpdate,

    #[error("Invalid {kind}: {value:?} is not an allowed type")]
    UnknownType { kind: String, value: String },
}

impl ValidationError {
    /// Shorthand for an `InvalidValue` naming the offending field.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The request field this error refers to, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::RequiredFieldMissing { field }
            | ValidationError::InvalidValue { field, .. }
            | ValidationError::InvalidRange { field, .. } => Some(field),
            ValidationError::InvalidCursor { .. } => Some("cursor"),
            ValidationError::UnknownType { kind, .. } => Some(kind),
            ValidationError::NothingToUpdate => None,
        }
    }
}

/// A lookup, update or delete matched nothing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Object not found: {id}")]
    Object { id: ObjectId },

    #[error("Association not found: {source_id} -[{association_type}]-> {destination_id}")]
    Association {
        source_id: ObjectId,
        association_type: AssociationType,
        destination_id: ObjectId,
    },
}

/// A write collided with an existing row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Association already exists: {source_id} -[{association_type}]-> {destination_id}")]
    AssociationExists {
        source_id: ObjectId,
        association_type: AssociationType,
        destination_id: ObjectId,
    },
}

/// Backing store or cache tier failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Backing store failure: {reason}")]
    Backend { reason: String },

    #[error("Connection pool failure: {reason}")]
    Pool { reason: String },

    #[error("Cache tier failure: {reason}")]
    Cache { reason: String },

    #[error("Malformed row: {reason}")]
    MalformedRow { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    pub fn cache(reason: impl Into<String>) -> Self {
        Self::Cache {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            reason: reason.into(),
        }
    }
}

/// Master error type for all association store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssocError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AssocError {
    /// Validation, not-found and conflict failures are reported to the
    /// caller as-is and are never worth retrying.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AssocError::Storage(_))
    }
}

impl From<serde_json::Error> for AssocError {
    fn from(err: serde_json::Error) -> Self {
        AssocError::Storage(StorageError::malformed(format!("JSON: {err}")))
    }
}

/// Result type alias for association store operations.
pub type AssocResult<T> = Result<T, AssocError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: i64) -> ObjectId {
        ObjectId::new(raw).unwrap()
    }

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::invalid("destinationId", "object does not exist");
        let msg = err.to_string();
        assert!(msg.contains("destinationId"));
        assert_eq!(err.field(), Some("destinationId"));
        assert_eq!(ValidationError::NothingToUpdate.field(), None);
    }

    #[test]
    fn test_not_found_display_association() {
        let err = NotFoundError::Association {
            source_id: id(1),
            association_type: AssociationType::Follow,
            destination_id: id(2),
        };
        let msg = err.to_string();
        assert!(msg.contains("1 -[follow]-> 2"));
    }

    #[test]
    fn test_assoc_error_from_variants() {
        let validation = AssocError::from(ValidationError::NothingToUpdate);
        assert!(matches!(validation, AssocError::Validation(_)));
        assert!(validation.is_client_error());

        let conflict = AssocError::from(ConflictError::AssociationExists {
            source_id: id(1),
            association_type: AssociationType::Like,
            destination_id: id(3),
        });
        assert!(matches!(conflict, AssocError::Conflict(_)));
        assert!(conflict.is_client_error());

        let storage = AssocError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, AssocError::Storage(_)));
        assert!(!storage.is_client_error());
    }

    #[test]
    fn test_json_error_is_storage_failure() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AssocError::from(err);
        assert!(matches!(
            err,
            AssocError::Storage(StorageError::MalformedRow { .. })
        ));
    }
}
