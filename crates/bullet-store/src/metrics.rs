//! Allocator-level cache metrics, in the same singleton style as the
//! teacher's `raw-store::DBMetrics`.

use once_cell::sync::OnceCell;
use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Registry,
};
use std::sync::Arc;

/// Cache hit/miss/eviction/size counters for the `NodeAllocator`.
#[derive(Debug)]
pub struct AllocatorMetrics {
    /// Number of `load_node` calls served from the in-memory cache.
    pub cache_hits: IntCounter,
    /// Number of `load_node` calls that fell through to the backing store.
    pub cache_misses: IntCounter,
    /// Number of cache entries written back to the backing store on
    /// eviction.
    pub evictions: IntCounter,
    /// Current number of cached nodes.
    pub cache_size: IntGauge,
}

static ALLOCATOR_METRICS_ONCE: OnceCell<Arc<AllocatorMetrics>> = OnceCell::new();

impl AllocatorMetrics {
    fn new(registry: &Registry) -> Self {
        AllocatorMetrics {
            cache_hits: register_int_counter_with_registry!(
                "bullet_allocator_cache_hits",
                "Number of load_node calls served from the in-memory node cache",
                registry,
            )
            .unwrap(),
            cache_misses: register_int_counter_with_registry!(
                "bullet_allocator_cache_misses",
                "Number of load_node calls that fell through to the backing store",
                registry,
            )
            .unwrap(),
            evictions: register_int_counter_with_registry!(
                "bullet_allocator_evictions",
                "Number of cache entries written back on eviction",
                registry,
            )
            .unwrap(),
            cache_size: register_int_gauge_with_registry!(
                "bullet_allocator_cache_size",
                "Current number of cached nodes",
                registry,
            )
            .unwrap(),
        }
    }

    /// Registers the metrics once and returns the shared instance; later
    /// calls with a different registry are ignored and logged.
    pub fn get_or_init(registry: &Registry) -> &'static Arc<AllocatorMetrics> {
        ALLOCATOR_METRICS_ONCE.get_or_init(|| Arc::new(AllocatorMetrics::new(registry)))
    }

    /// Returns the already-initialised metrics, if any.
    pub fn get() -> Option<&'static Arc<AllocatorMetrics>> {
        ALLOCATOR_METRICS_ONCE.get()
    }
}
