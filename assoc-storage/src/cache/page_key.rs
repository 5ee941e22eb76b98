//! Cache key scheme for listing pages.
//!
//! Every cached page lives under
//!
//! ```text
//! assoc:{source_id}:{association_type}:{cursor|start}:{limit}
//! ```
//!
//! so each distinct (source, type, cursor, limit) tuple has exactly one key,
//! and `assoc:{source_id}:{association_type}:*` covers every page ever
//! cached for one (source, type) pair. Cursor strings contain `:` inside
//! their timestamp, so decoding takes the three leading fields from the
//! left and the limit from the right.

use assoc_core::{AssociationType, ObjectId, StorageError};

use super::pattern::KeyPattern;

/// Namespace every page key starts with.
pub const KEY_PREFIX: &str = "assoc";

/// Cursor slot value for a first-page request.
pub const START_MARKER: &str = "start";

const SEPARATOR: char = ':';

/// Components of a page cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    source_id: ObjectId,
    association_type: AssociationType,
    cursor: Option<String>,
    limit: u32,
}

impl PageKey {
    /// Build a key. `cursor` must be the canonical encoded cursor so that
    /// equivalent cursors share one cache entry.
    pub fn new(
        source_id: ObjectId,
        association_type: AssociationType,
        cursor: Option<String>,
        limit: u32,
    ) -> Self {
        Self {
            source_id,
            association_type,
            cursor: cursor.filter(|c| !c.is_empty()),
            limit,
        }
    }

    pub fn source_id(&self) -> ObjectId {
        self.source_id
    }

    pub fn association_type(&self) -> AssociationType {
        self.association_type
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Render the key string.
    pub fn encode(&self) -> String {
        format!(
            "{KEY_PREFIX}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.source_id,
            self.association_type.as_db_str(),
            self.cursor.as_deref().unwrap_or(START_MARKER),
            self.limit
        )
    }

    /// Parse a key string back into its components.
    ///
    /// Returns `None` for anything `encode` could not have produced.
    pub fn decode(key: &str) -> Option<Self> {
        let mut head = key.splitn(4, SEPARATOR);
        if head.next()? != KEY_PREFIX {
            return None;
        }
        let source_id: ObjectId = head.next()?.parse().ok()?;
        let association_type: AssociationType = head.next()?.parse().ok()?;
        let rest = head.next()?;

        let (cursor, limit) = rest.rsplit_once(SEPARATOR)?;
        let limit: u32 = limit.parse().ok()?;
        let cursor = match cursor {
            "" => return None,
            START_MARKER => None,
            other => Some(other.to_string()),
        };

        Some(Self {
            source_id,
            association_type,
            cursor,
            limit,
        })
    }

    /// Glob matching every page key for one (source, type) pair.
    pub fn invalidation_glob(source_id: ObjectId, association_type: AssociationType) -> String {
        format!(
            "{KEY_PREFIX}{SEPARATOR}{source_id}{SEPARATOR}{}{SEPARATOR}*",
            association_type.as_db_str()
        )
    }

    /// Compiled form of [`PageKey::invalidation_glob`].
    pub fn invalidation_pattern(
        source_id: ObjectId,
        association_type: AssociationType,
    ) -> Result<KeyPattern, StorageError> {
        KeyPattern::new(Self::invalidation_glob(source_id, association_type))
    }
}
