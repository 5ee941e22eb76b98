//! Enum types for objects and associations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// ============================================================================
// OBJECT TYPES
// ============================================================================

/// Allow-list of object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    User,
    Post,
    Page,
    Checkin,
    Place,
    Comment,
}

impl ObjectType {
    /// Every allowed object type.
    pub const ALL: [ObjectType; 6] = [
        ObjectType::User,
        ObjectType::Post,
        ObjectType::Page,
        ObjectType::Checkin,
        ObjectType::Place,
        ObjectType::Comment,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ObjectType::User => "user",
            ObjectType::Post => "post",
            ObjectType::Page => "page",
            ObjectType::Checkin => "checkin",
            ObjectType::Place => "place",
            ObjectType::Comment => "comment",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "user" => Ok(ObjectType::User),
            "post" => Ok(ObjectType::Post),
            "page" => Ok(ObjectType::Page),
            "checkin" => Ok(ObjectType::Checkin),
            "place" => Ok(ObjectType::Place),
            "comment" => Ok(ObjectType::Comment),
            _ => Err(ValidationError::UnknownType {
                kind: "objectType".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for ObjectType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

// ============================================================================
// ASSOCIATION TYPES
// ============================================================================

/// Allow-list of association (edge) types.
///
/// The wire tag doubles as the cache-key segment, so tags never contain
/// the `:` key separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationType {
    Friend,
    Like,
    Follow,
    Authored,
    TaggedIn,
    LocatedAt,
    HasComment,
}

impl AssociationType {
    /// Every allowed association type.
    pub const ALL: [AssociationType; 7] = [
        AssociationType::Friend,
        AssociationType::Like,
        AssociationType::Follow,
        AssociationType::Authored,
        AssociationType::TaggedIn,
        AssociationType::LocatedAt,
        AssociationType::HasComment,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AssociationType::Friend => "friend",
            AssociationType::Like => "like",
            AssociationType::Follow => "follow",
            AssociationType::Authored => "authored",
            AssociationType::TaggedIn => "tagged_in",
            AssociationType::LocatedAt => "located_at",
            AssociationType::HasComment => "has_comment",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "friend" => Ok(AssociationType::Friend),
            "like" => Ok(AssociationType::Like),
            "follow" => Ok(AssociationType::Follow),
            "authored" => Ok(AssociationType::Authored),
            "tagged_in" => Ok(AssociationType::TaggedIn),
            "located_at" => Ok(AssociationType::LocatedAt),
            "has_comment" => Ok(AssociationType::HasComment),
            _ => Err(ValidationError::UnknownType {
                kind: "associationType".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AssociationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for AssociationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

// ============================================================================
// ASSOCIATION STATUS
// ============================================================================

/// Lifecycle status of an association row.
///
/// Deletion is a status flip; rows are never physically removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssociationStatus {
    #[default]
    Active,
    Deleted,
}

impl AssociationStatus {
    /// Integer column value: `1` for active, `0` for deleted.
    pub fn as_db_i16(&self) -> i16 {
        match self {
            AssociationStatus::Active => 1,
            AssociationStatus::Deleted => 0,
        }
    }

    /// Parse the integer column value.
    pub fn from_db_i16(value: i16) -> Result<Self, ValidationError> {
        match value {
            1 => Ok(AssociationStatus::Active),
            0 => Ok(AssociationStatus::Deleted),
            other => Err(ValidationError::InvalidValue {
                field: "status".to_string(),
                reason: format!("expected 0 or 1, got {other}"),
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AssociationStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_db_str_roundtrip() {
        for ty in ObjectType::ALL {
            assert_eq!(ObjectType::from_db_str(ty.as_db_str()).unwrap(), ty);
        }
    }

    #[test]
    fn test_association_type_db_str_roundtrip() {
        for ty in AssociationType::ALL {
            assert_eq!(ty.as_db_str().parse::<AssociationType>().unwrap(), ty);
            assert!(!ty.as_db_str().contains(':'));
        }
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        let err = "group".parse::<ObjectType>().unwrap_err();
        assert!(matches!(err, ValidationError::UnknownType { .. }));
        assert!("Follow".parse::<AssociationType>().is_err());
        assert!("".parse::<AssociationType>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_tags() {
        assert_eq!(
            serde_json::to_string(&AssociationType::TaggedIn).unwrap(),
            "\"tagged_in\""
        );
        assert_eq!(
            serde_json::to_string(&AssociationStatus::Deleted).unwrap(),
            "\"DELETED\""
        );
    }

    #[test]
    fn test_status_integer_mapping() {
        assert_eq!(AssociationStatus::Active.as_db_i16(), 1);
        assert_eq!(AssociationStatus::Deleted.as_db_i16(), 0);
        assert_eq!(
            AssociationStatus::from_db_i16(0).unwrap(),
            AssociationStatus::Deleted
        );
        assert!(AssociationStatus::from_db_i16(2).is_err());
    }
}
