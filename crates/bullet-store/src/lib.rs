//! Storage layer: `BulletDb` (the embedded KV), the LRU cache, and the
//! `NodeAllocator` implementation that ties them to `bullet-trie`.

pub mod allocator;
pub mod bulletdb;
pub mod cache;
pub mod error;
pub mod kv;
pub mod metrics;
pub mod mock_db;

pub use allocator::Allocator;
pub use bulletdb::BulletDb;
pub use cache::LruCacheMap;
pub use error::{StoreError, StoreResult};
pub use kv::KvStore;
pub use metrics::AllocatorMetrics;
pub use mock_db::MockDb;
