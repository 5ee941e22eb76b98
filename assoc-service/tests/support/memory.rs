use assoc_core::{PayloadRegistry, StoreConfig};
use assoc_service::Service;
use assoc_test_utils::fixtures::memory_graph;
use assoc_test_utils::{InMemoryCacheTier, ManualClock, MemoryStore};
use std::sync::Arc;

pub type MemoryService = Service<MemoryStore, InMemoryCacheTier>;

/// A service over the in-process stores with the default payload rules.
pub fn memory_service(config: StoreConfig) -> (MemoryService, Arc<ManualClock>) {
    let (graph, clock) = memory_graph(config);
    (Service::from_parts(graph, PayloadRegistry::with_defaults()), clock)
}
