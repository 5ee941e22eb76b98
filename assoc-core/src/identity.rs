//! Identity types for stored entities

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Identifier of a stored object.
///
/// Ids are assigned by the backing store, are strictly positive and are
/// never reused. The type can only be built through [`ObjectId::new`], so a
/// zero or negative id never reaches a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ObjectId(i64);

impl ObjectId {
    /// Wrap a raw id, rejecting anything that is not strictly positive.
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        if raw <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "id".to_string(),
                reason: format!("must be a positive integer, got {raw}"),
            });
        }
        Ok(Self(raw))
    }

    /// The raw integer value, as stored in the backing store.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for ObjectId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectId> for i64 {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().parse::<i64>().map_err(|_| ValidationError::InvalidValue {
            field: "id".to_string(),
            reason: format!("not an integer: {s:?}"),
        })?;
        Self::new(raw)
    }
}

/// Drop sub-microsecond precision from a timestamp.
///
/// Relational timestamp columns keep microseconds, so every server-assigned
/// creation time is truncated before it is written. This keeps the cursor
/// form of a row identical to what the store hands back on the next read.
pub fn truncate_to_micros(ts: Timestamp) -> Timestamp {
    let nanos = ts.nanosecond();
    let truncated = nanos - nanos % 1_000;
    ts.with_nanosecond(truncated).unwrap_or(ts)
}
