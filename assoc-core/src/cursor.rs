//! Opaque pagination cursors.
//!
//! A cursor names the last edge of the previous page by its ordering key
//! `(created_at, destination_id)`. The wire form is a public contract that
//! clients may persist across sessions:
//!
//! ```text
//! 2024-05-01T12:00:00.123456Z|42
//! ```
//!
//! The RFC 3339 timestamp (microsecond precision, `Z` suffix) and the
//! positive integer id are joined by [`CURSOR_DELIMITER`], which cannot
//! appear in either part. The codec is pure: it never checks that the row a
//! cursor names still exists. A cursor naming a row that is gone simply
//! continues from that position in the ordering.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entities::AssociationItem;
use crate::error::ValidationError;
use crate::identity::{truncate_to_micros, ObjectId, Timestamp};

/// Separator between the timestamp and the id.
pub const CURSOR_DELIMITER: char = '|';

/// Exclusive lower bound for the next page under the
/// `(created_at DESC, destination_id DESC)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub created_at: Timestamp,
    pub destination_id: ObjectId,
}

impl Cursor {
    /// Build a cursor. The timestamp is cut to microseconds, the precision
    /// of the wire form and of the backing store, so two cursors that encode
    /// alike also bound a query alike.
    pub fn new(created_at: Timestamp, destination_id: ObjectId) -> Self {
        Self {
            created_at: truncate_to_micros(created_at),
            destination_id,
        }
    }

    /// Cursor pointing just past the given listing row.
    pub fn after(item: &AssociationItem) -> Self {
        Self::new(item.created_at, item.destination_id)
    }

    /// Wire cursor continuing past `row`, or `None` when there is no row.
    pub fn encode_after(row: Option<&AssociationItem>) -> Option<String> {
        row.map(|row| Self::after(row).encode())
    }

    /// Render the wire form.
    pub fn encode(&self) -> String {
        format!(
            "{}{}{}",
            self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            CURSOR_DELIMITER,
            self.destination_id
        )
    }

    /// Parse an optional wire cursor.
    ///
    /// Absent or empty input is a first-page request and yields `Ok(None)`.
    /// Anything else must have exactly two parts, a valid RFC 3339 timestamp
    /// and a positive integer id.
    pub fn decode(raw: Option<&str>) -> Result<Option<Self>, ValidationError> {
        match raw {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }

    /// Whether a row lies strictly past this cursor in the listing order:
    /// `created_at < c.created_at OR (created_at = c.created_at AND
    /// destination_id < c.destination_id)`.
    pub fn admits(&self, created_at: Timestamp, destination_id: ObjectId) -> bool {
        created_at < self.created_at
            || (created_at == self.created_at && destination_id < self.destination_id)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Cursor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(CURSOR_DELIMITER).collect();
        if parts.len() != 2 {
            return Err(ValidationError::InvalidCursor {
                reason: format!("expected 2 parts, found {}", parts.len()),
            });
        }
        let (created_raw, id_raw) = (parts[0], parts[1]);
        if created_raw.is_empty() {
            return Err(ValidationError::InvalidCursor {
                reason: "missing timestamp".to_string(),
            });
        }

        let created_at = DateTime::parse_from_rfc3339(created_raw)
            .map_err(|e| ValidationError::InvalidCursor {
                reason: format!("bad timestamp {created_raw:?}: {e}"),
            })?
            .with_timezone(&Utc);

        let raw_id = id_raw
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidCursor {
                reason: format!("destination id is not an integer: {id_raw:?}"),
            })?;
        let destination_id = ObjectId::new(raw_id).map_err(|_| ValidationError::InvalidCursor {
            reason: format!("destination id must be positive, got {raw_id}"),
        })?;

        Ok(Self::new(created_at, destination_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use proptest::prelude::*;

    fn ts(secs: i64, micros: u32) -> Timestamp {
        Utc.timestamp_opt(secs, micros * 1_000).unwrap()
    }

    fn id(raw: i64) -> ObjectId {
        ObjectId::new(raw).unwrap()
    }

    #[test]
    fn test_encode_format() {
        let cursor = Cursor::new(ts(1_714_564_800, 123_456), id(42));
        assert_eq!(cursor.encode(), "2024-05-01T12:00:00.123456Z|42");
    }

    #[test]
    fn test_encode_after_needs_a_row() {
        assert!(Cursor::encode_after(None).is_none());
        let row = AssociationItem {
            destination_id: id(9),
            created_at: ts(1_714_564_800, 5),
            data: serde_json::json!({}),
        };
        assert_eq!(
            Cursor::encode_after(Some(&row)).as_deref(),
            Some("2024-05-01T12:00:00.000005Z|9")
        );
    }

    #[test]
    fn test_sub_micro_digits_are_dropped() {
        let precise = Cursor::decode(Some("2024-05-01T12:00:00.000000999Z|2"))
            .unwrap()
            .unwrap();
        let canonical = Cursor::decode(Some("2024-05-01T12:00:00Z|2"))
            .unwrap()
            .unwrap();
        assert_eq!(precise, canonical);
        assert_eq!(precise.encode(), canonical.encode());
        assert_eq!(precise.created_at.nanosecond(), 0);

        let built = Cursor::new(Utc.timestamp_opt(100, 1_999).unwrap(), id(1));
        assert_eq!(built.created_at, ts(100, 1));
    }

    #[test]
    fn test_decode_absent_is_first_page() {
        assert_eq!(Cursor::decode(None).unwrap(), None);
        assert_eq!(Cursor::decode(Some("")).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for bad in [
            "2024-05-01T12:00:00Z",
            "2024-05-01T12:00:00Z|1|2",
            "|5",
            "2024-05-01T12:00:00Z|",
            "2024-05-01T12:00:00Z|abc",
            "2024-05-01T12:00:00Z|0",
            "2024-05-01T12:00:00Z|-4",
            "2024-05-01T12:00:00Z|1.5",
            "yesterday|3",
        ] {
            let err = Cursor::decode(Some(bad)).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidCursor { .. }),
                "expected cursor error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_decode_accepts_offset_timestamps() {
        let cursor = Cursor::decode(Some("2024-05-01T14:00:00+02:00|7"))
            .unwrap()
            .unwrap();
        assert_eq!(cursor.created_at, ts(1_714_564_800, 0));
        assert_eq!(cursor.destination_id, id(7));
    }

    #[test]
    fn test_admits_is_strict_descending_bound() {
        let cursor = Cursor::new(ts(100, 0), id(10));
        assert!(cursor.admits(ts(99, 0), id(50)));
        assert!(cursor.admits(ts(100, 0), id(9)));
        assert!(!cursor.admits(ts(100, 0), id(10)));
        assert!(!cursor.admits(ts(100, 0), id(11)));
        assert!(!cursor.admits(ts(101, 0), id(1)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Any row with both fields populated survives encode -> decode.
        #[test]
        fn prop_cursor_roundtrip(
            secs in 0i64..4_102_444_800,
            nanos in 0u32..1_000_000_000,
            raw_id in 1i64..i64::MAX,
        ) {
            let created_at = truncate_to_micros(Utc.timestamp_opt(secs, nanos).unwrap());
            let encoded = Cursor::new(created_at, id(raw_id)).encode();
            let decoded = Cursor::decode(Some(&encoded)).unwrap().unwrap();
            prop_assert_eq!(decoded.created_at, created_at);
            prop_assert_eq!(decoded.destination_id.get(), raw_id);
            prop_assert_eq!(decoded.created_at.nanosecond() % 1_000, 0);
        }
    }
}
