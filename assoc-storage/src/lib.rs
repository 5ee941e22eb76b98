//! Assoc Storage - Association Engine
//!
//! Backing-store abstraction, page cache tiers and the two stores built on
//! them:
//!
//! - [`EntityStore`] owns object CRUD.
//! - [`AssociationStore`] owns edge CRUD, cursor pagination and keeps the
//!   page cache coherent with the backing store.
//!
//! [`Graph`] exposes both as one operation surface. The PostgreSQL backing
//! store lives in `assoc-service`; [`MemoryStore`] is the in-process one.

pub mod association_store;
pub mod backing;
pub mod cache;
pub mod entity_store;
pub mod graph;
pub mod memory;
pub mod metrics;

pub use association_store::AssociationStore;
pub use backing::{BackingStore, PageQuery};
pub use cache::{
    AnyCacheTier, CacheStats, CacheTier, InMemoryCacheTier, KeyPattern, LmdbCacheError,
    LmdbCacheTier, PageKey, ScanBatch,
};
pub use entity_store::EntityStore;
pub use graph::Graph;
pub use memory::MemoryStore;
pub use metrics::{MetricsSnapshot, StoreMetrics};
