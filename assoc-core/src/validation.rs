//! Request value parsing and per-type payload validation.
//!
//! These checks run upstream of the stores: by the time a call reaches the
//! Entity or Association Store its ids are positive, its types are in the
//! allow-lists and its payload has the shape its type demands.
//!
//! Payload rules live in a [`PayloadRegistry`] keyed by type tag, so adding
//! a type means registering its rules rather than growing a dispatch chain.

use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

use crate::config::StoreConfig;
use crate::enums::{AssociationStatus, AssociationType, ObjectType};
use crate::error::ValidationError;
use crate::identity::ObjectId;

// ============================================================================
// SCALAR PARSERS
// ============================================================================

/// Parse a positive integer id, naming `field` on failure.
pub fn parse_id(raw: &str, field: &str) -> Result<ObjectId, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|value| ObjectId::new(value).ok())
        .ok_or_else(|| ValidationError::invalid(field, format!("expected a positive integer, got {raw:?}")))
}

/// Parse a page size.
///
/// Absent means the configured default; zero, negative and non-integer
/// values are rejected; anything above the maximum is clamped to it.
pub fn parse_limit(raw: Option<&str>, config: &StoreConfig) -> Result<u32, ValidationError> {
    let Some(raw) = raw else {
        return Ok(config.default_limit);
    };
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::invalid("limit", format!("not an integer: {raw:?}")))?;
    if value <= 0 {
        return Err(ValidationError::invalid("limit", "must be positive"));
    }
    Ok(value.min(i64::from(config.max_limit)) as u32)
}

/// Parse an optional association status given as its integer form.
pub fn parse_status(raw: Option<&str>) -> Result<Option<AssociationStatus>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<i16>()
        .map_err(|_| ValidationError::invalid("status", format!("not an integer: {raw:?}")))?;
    AssociationStatus::from_db_i16(value).map(Some)
}

// ============================================================================
// PAYLOAD RULES
// ============================================================================

/// A single constraint on a payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRule {
    /// Field must be present and a string with non-whitespace content.
    RequiredText(&'static str),
    /// Field must be present and a positive integer.
    RequiredPositiveInt(&'static str),
    /// Field may be absent; when present it must be a string.
    OptionalText(&'static str),
}

impl PayloadRule {
    fn check(&self, payload: &Map<String, JsonValue>) -> Result<(), ValidationError> {
        match *self {
            PayloadRule::RequiredText(name) => match payload.get(name) {
                Some(JsonValue::String(s)) if !s.trim().is_empty() => Ok(()),
                _ => Err(missing_or_invalid(name)),
            },
            PayloadRule::RequiredPositiveInt(name) => match payload.get(name).and_then(JsonValue::as_i64) {
                Some(n) if n > 0 => Ok(()),
                _ => Err(missing_or_invalid(name)),
            },
            PayloadRule::OptionalText(name) => match payload.get(name) {
                None | Some(JsonValue::String(_)) => Ok(()),
                Some(_) => Err(ValidationError::invalid(format!("data.{name}"), "must be a string")),
            },
        }
    }
}

fn missing_or_invalid(name: &str) -> ValidationError {
    ValidationError::invalid(format!("data.{name}"), "missing or invalid")
}

fn ensure_plain_object(value: &JsonValue) -> Result<&Map<String, JsonValue>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::invalid("data", "must be a JSON object"))
}

/// Registry of payload rules keyed by object and association type.
#[derive(Debug, Clone, Default)]
pub struct PayloadRegistry {
    objects: HashMap<ObjectType, Vec<PayloadRule>>,
    associations: HashMap<AssociationType, Vec<PayloadRule>>,
}

impl PayloadRegistry {
    /// An empty registry: every type accepts any JSON object.
    pub fn new() -> Self {
        Self::default()
    }

    /// The rule set for the built-in types.
    pub fn with_defaults() -> Self {
        use PayloadRule::*;

        Self::new()
            .register_object(ObjectType::User, vec![RequiredText("name"), RequiredText("username")])
            .register_object(ObjectType::Post, vec![RequiredPositiveInt("authorId"), RequiredText("body")])
            .register_object(ObjectType::Page, vec![RequiredText("title")])
            .register_object(
                ObjectType::Checkin,
                vec![
                    RequiredPositiveInt("userId"),
                    RequiredPositiveInt("placeId"),
                    OptionalText("caption"),
                ],
            )
            .register_object(ObjectType::Place, vec![RequiredText("name"), OptionalText("city")])
            .register_object(
                ObjectType::Comment,
                vec![RequiredPositiveInt("authorId"), RequiredText("body")],
            )
            .register_association(AssociationType::Friend, vec![OptionalText("note")])
            .register_association(AssociationType::Like, vec![OptionalText("reaction")])
            .register_association(AssociationType::Follow, vec![OptionalText("note")])
            .register_association(AssociationType::Authored, vec![OptionalText("role")])
            .register_association(AssociationType::TaggedIn, vec![OptionalText("context")])
            .register_association(AssociationType::LocatedAt, vec![OptionalText("precision")])
            .register_association(AssociationType::HasComment, vec![OptionalText("note")])
    }

    /// Replace the rules for an object type.
    pub fn register_object(mut self, object_type: ObjectType, rules: Vec<PayloadRule>) -> Self {
        self.objects.insert(object_type, rules);
        self
    }

    /// Replace the rules for an association type.
    pub fn register_association(
        mut self,
        association_type: AssociationType,
        rules: Vec<PayloadRule>,
    ) -> Self {
        self.associations.insert(association_type, rules);
        self
    }

    /// Validate an object payload. Objects always carry a JSON object.
    pub fn validate_object(&self, object_type: ObjectType, data: &JsonValue) -> Result<(), ValidationError> {
        let payload = ensure_plain_object(data)?;
        self.objects
            .get(&object_type)
            .map(|rules| rules.iter().try_for_each(|rule| rule.check(payload)))
            .unwrap_or(Ok(()))
    }

    /// Validate an association payload. The payload itself is optional.
    pub fn validate_association(
        &self,
        association_type: AssociationType,
        data: Option<&JsonValue>,
    ) -> Result<(), ValidationError> {
        let Some(data) = data else {
            return Ok(());
        };
        let payload = ensure_plain_object(data)?;
        self.associations
            .get(&association_type)
            .map(|rules| rules.iter().try_for_each(|rule| rule.check(payload)))
            .unwrap_or(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12", "sourceId").unwrap().get(), 12);
        let err = parse_id("0", "sourceId").unwrap_err();
        assert_eq!(err.field(), Some("sourceId"));
        assert!(parse_id("x", "destinationId").is_err());
    }

    #[test]
    fn test_parse_limit_defaults_and_clamps() {
        let config = StoreConfig::default();
        assert_eq!(parse_limit(None, &config).unwrap(), 20);
        assert_eq!(parse_limit(Some("5"), &config).unwrap(), 5);
        assert_eq!(parse_limit(Some("1000"), &config).unwrap(), 100);
        assert!(parse_limit(Some("0"), &config).is_err());
        assert!(parse_limit(Some("-1"), &config).is_err());
        assert!(parse_limit(Some("ten"), &config).is_err());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(None).unwrap(), None);
        assert_eq!(parse_status(Some("1")).unwrap(), Some(AssociationStatus::Active));
        assert_eq!(parse_status(Some("0")).unwrap(), Some(AssociationStatus::Deleted));
        assert!(parse_status(Some("2")).is_err());
        assert!(parse_status(Some("yes")).is_err());
    }

    #[test]
    fn test_user_payload_rules() {
        let registry = PayloadRegistry::with_defaults();
        assert!(registry
            .validate_object(ObjectType::User, &json!({"name": "Ada", "username": "ada"}))
            .is_ok());

        let err = registry
            .validate_object(ObjectType::User, &json!({"name": "  ", "username": "ada"}))
            .unwrap_err();
        assert_eq!(err.field(), Some("data.name"));

        let err = registry
            .validate_object(ObjectType::User, &json!({"name": "Ada"}))
            .unwrap_err();
        assert_eq!(err.field(), Some("data.username"));
    }

    #[test]
    fn test_object_payload_must_be_object() {
        let registry = PayloadRegistry::with_defaults();
        let err = registry
            .validate_object(ObjectType::Page, &json!(["title"]))
            .unwrap_err();
        assert_eq!(err.field(), Some("data"));
        assert!(registry.validate_object(ObjectType::Page, &JsonValue::Null).is_err());
    }

    #[test]
    fn test_checkin_payload_rules() {
        let registry = PayloadRegistry::with_defaults();
        assert!(registry
            .validate_object(ObjectType::Checkin, &json!({"userId": 1, "placeId": 2}))
            .is_ok());
        let err = registry
            .validate_object(ObjectType::Checkin, &json!({"userId": 1, "placeId": -2}))
            .unwrap_err();
        assert_eq!(err.field(), Some("data.placeId"));
        let err = registry
            .validate_object(
                ObjectType::Checkin,
                &json!({"userId": 1, "placeId": 2, "caption": 7}),
            )
            .unwrap_err();
        assert_eq!(err.field(), Some("data.caption"));
    }

    #[test]
    fn test_association_payload_rules() {
        let registry = PayloadRegistry::with_defaults();
        assert!(registry.validate_association(AssociationType::Like, None).is_ok());
        assert!(registry
            .validate_association(AssociationType::Like, Some(&json!({"reaction": "wow"})))
            .is_ok());
        let err = registry
            .validate_association(AssociationType::Like, Some(&json!({"reaction": 3})))
            .unwrap_err();
        assert_eq!(err.field(), Some("data.reaction"));
        assert!(registry
            .validate_association(AssociationType::Follow, Some(&json!("note")))
            .is_err());
    }

    #[test]
    fn test_empty_registry_accepts_any_object() {
        let registry = PayloadRegistry::new();
        assert!(registry.validate_object(ObjectType::Post, &json!({})).is_ok());
    }
}
