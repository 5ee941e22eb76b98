//! Page cache tiers and the key scheme around them.
//!
//! Cached values are whole listing pages serialized as JSON, stored under a
//! [`PageKey`]. Writes evict every page of an edge type at once by scanning
//! for the (source, type) [`KeyPattern`] and deleting the matches in
//! batches.
//!
//! Two tiers ship with the crate:
//!
//! - [`InMemoryCacheTier`]: process-local ordered map, lazy TTL expiry
//!   with periodic sweeps.
//! - [`LmdbCacheTier`]: persistent LMDB store via heed.
//!
//! [`AnyCacheTier`] picks one at runtime.

pub mod any;
pub mod lmdb_backend;
pub mod memory;
pub mod page_key;
pub mod pattern;
pub mod traits;

pub use any::AnyCacheTier;
pub use lmdb_backend::{LmdbCacheError, LmdbCacheTier};
pub use memory::InMemoryCacheTier;
pub use page_key::{PageKey, KEY_PREFIX, START_MARKER};
pub use pattern::KeyPattern;
pub use traits::{CacheStats, CacheTier, ScanBatch, SWEEP_INTERVAL};
