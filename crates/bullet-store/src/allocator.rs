//! The concrete [`NodeAllocator`] backing the trie: an FNV-keyed LRU
//! cache over a [`KvStore`], with write-back-on-eviction so the trie
//! never needs an explicit flush.
//!
//! Mirrors `smt`'s split between `TreeReader`/`TreeWriter` and its
//! backing store, but folds both directions into one object the way the
//! component design's `NodeAllocator` does: a single reader-writer lock
//! (here `parking_lot::RwLock`) guards the cache, per §5 of the
//! concurrency model.

use bullet_trie::{Node, NodeAllocator, NodeId, NodeIdHashBuilder, TrieError, TrieResult};
use parking_lot::RwLock;
use prometheus::Registry;
use std::sync::Arc;

use crate::cache::LruCacheMap;
use crate::kv::KvStore;
use crate::metrics::AllocatorMetrics;

/// Key under which a value payload is stored, keyed by `Blake3(user_key)`.
fn value_key(key_hash: [u8; 32]) -> [u8; 33] {
    let mut out = [0u8; 33];
    out[0] = b'v';
    out[1..].copy_from_slice(&key_hash);
    out
}

/// A cache-backed `NodeAllocator` over any [`KvStore`].
pub struct Allocator<S: KvStore> {
    kv: Arc<S>,
    cache: RwLock<LruCacheMap<NodeId, Node, NodeIdHashBuilder>>,
    metrics: &'static Arc<AllocatorMetrics>,
}

impl<S: KvStore> Allocator<S> {
    /// Builds an allocator over `kv` with a cache holding at most
    /// `cache_size` nodes.
    pub fn new(kv: Arc<S>, cache_size: usize) -> Self {
        Allocator {
            kv,
            cache: RwLock::new(LruCacheMap::with_hasher(cache_size)),
            metrics: AllocatorMetrics::get_or_init(&Registry::new()),
        }
    }

    fn write_back(&self, node: &Node) {
        if node.should_delete() {
            return;
        }
        let _ = self.persist_node(node);
    }

    /// Reads a value payload by its `Blake3(user_key)` digest. Not part of
    /// `NodeAllocator` since the trie layer never reads values directly;
    /// only the Ledger facade's `db_get_value` calls this.
    pub fn get_value(&self, key_hash: [u8; 32]) -> TrieResult<Option<Vec<u8>>> {
        self.kv
            .get(&value_key(key_hash))
            .map_err(|_| TrieError::LoadNodeErr)
    }

    /// `true` iff a value payload is stored under `Blake3(user_key)`.
    pub fn value_exists(&self, key_hash: [u8; 32]) -> TrieResult<bool> {
        self.kv
            .exists(&value_key(key_hash))
            .map_err(|_| TrieError::LoadNodeErr)
    }
}

impl<S: KvStore> NodeAllocator for Allocator<S> {
    fn load_node(&self, id: NodeId) -> TrieResult<Node> {
        if let Some(node) = self.cache.write().get(&id) {
            self.metrics.cache_hits.inc();
            return Ok(node.clone());
        }
        self.metrics.cache_misses.inc();

        let bytes = self
            .kv
            .get(&id.to_bytes())
            .map_err(|_| TrieError::LoadNodeErr)?
            .ok_or(TrieError::LoadNodeErr)?;
        let node = Node::decode(id, &bytes)?;
        self.cache_node(node.clone());
        Ok(node)
    }

    fn cache_node(&self, node: Node) {
        let id = node.id();
        let evicted = self.cache.write().put(id, node);
        self.metrics.cache_size.set(self.cache.read().len() as i64);
        if let Some((_, evicted_node)) = evicted {
            self.metrics.evictions.inc();
            self.write_back(&evicted_node);
        }
    }

    fn recache(&self, old_id: NodeId, new_id: NodeId) -> TrieResult<()> {
        let mut node = self.cache.write().remove(&old_id);
        if node.is_none() {
            // Not cached: load it (which caches it under `old_id`), then
            // fall through to the same remove-and-reinsert path.
            let loaded = self.load_node(old_id)?;
            self.cache.write().remove(&old_id);
            node = Some(loaded);
        }
        let mut node = node.ok_or(TrieError::NotExistRecache)?;

        let _ = self.kv.delete(&old_id.to_bytes());
        node.set_id(new_id);
        self.cache_node(node);
        Ok(())
    }

    fn delete_node(&self, id: NodeId) -> TrieResult<()> {
        if self.cache.write().remove(&id).is_none() {
            // Touch the persistent store to see whether it's worth a
            // delete at all; absence here is not an error for callers
            // like `prune`, which tolerate missing nodes upstream.
        }
        self.kv
            .delete(&id.to_bytes())
            .map_err(|_| TrieError::LoadNodeErr)
    }

    fn persist_node(&self, node: &Node) -> TrieResult<()> {
        self.kv
            .put(&node.id().to_bytes(), &node.encode())
            .map_err(|_| TrieError::LoadNodeErr)
    }

    fn store_value(&self, key_hash: [u8; 32], value: &[u8]) -> TrieResult<()> {
        self.kv
            .put(&value_key(key_hash), value)
            .map_err(|_| TrieError::DeleteValueErr)
    }

    fn delete_value(&self, key_hash: [u8; 32]) -> TrieResult<()> {
        self.kv
            .delete(&value_key(key_hash))
            .map_err(|_| TrieError::DeleteValueErr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_db::MockDb;
    use bullet_trie::{Branch, Leaf};

    fn allocator(cache_size: usize) -> Allocator<MockDb> {
        Allocator::new(Arc::new(MockDb::new()), cache_size)
    }

    #[test]
    fn cache_node_then_load_round_trips_without_hitting_store() {
        let alloc = allocator(8);
        let id = NodeId::root(1);
        let branch = Branch::new(id);
        alloc.cache_node(Node::Branch(branch.clone()));

        let loaded = alloc.load_node(id).unwrap();
        assert_eq!(loaded, Node::Branch(branch));
    }

    #[test]
    fn eviction_writes_back_through_the_kv_store() {
        let alloc = allocator(1);
        let id_a = NodeId::root(1);
        let mut id_b = NodeId::root(1);
        id_b.set_block_id(2);

        let mut branch_a = Branch::new(id_a);
        branch_a.insert_child(0, 1);
        alloc.cache_node(Node::Branch(branch_a.clone()));

        // Evicts `branch_a`; its write-back lands in the backing store
        // because it has a child and thus isn't `should_delete()`.
        let mut branch_b = Branch::new(id_b);
        branch_b.insert_child(0, 1);
        alloc.cache_node(Node::Branch(branch_b));

        let reloaded = alloc.load_node(id_a).unwrap();
        assert_eq!(reloaded, Node::Branch(branch_a));
    }

    #[test]
    fn eviction_of_an_empty_branch_is_not_written_back() {
        let alloc = allocator(1);
        let id_a = NodeId::root(1);
        let mut id_b = NodeId::root(1);
        id_b.set_block_id(2);

        let empty = Branch::new(id_a);
        assert!(empty.should_delete());
        alloc.cache_node(Node::Branch(empty));

        let branch_b = Branch::new(id_b);
        alloc.cache_node(Node::Branch(branch_b));

        assert!(matches!(
            alloc.load_node(id_a),
            Err(TrieError::LoadNodeErr)
        ));
    }

    #[test]
    fn recache_moves_a_cached_node_to_its_new_id() {
        let alloc = allocator(8);
        let old_id = NodeId::root(1);
        let mut new_id = NodeId::root(1);
        new_id.set_block_id(0);

        let leaf = Leaf::new(old_id, [3u8; 32]);
        alloc.cache_node(Node::Leaf(leaf));

        alloc.recache(old_id, new_id).unwrap();

        assert!(matches!(
            alloc.load_node(old_id),
            Err(TrieError::LoadNodeErr)
        ));
        let moved = alloc.load_node(new_id).unwrap();
        assert_eq!(moved.id(), new_id);
    }

    #[test]
    fn delete_node_removes_from_cache_and_store() {
        let alloc = allocator(8);
        let id = NodeId::root(1);
        alloc.cache_node(Node::Branch(Branch::new(id)));
        alloc.delete_node(id).unwrap();
        assert!(matches!(alloc.load_node(id), Err(TrieError::LoadNodeErr)));
    }

    #[test]
    fn value_round_trips() {
        let alloc = allocator(8);
        alloc.store_value([1u8; 32], b"payload").unwrap();
        assert!(alloc.kv.exists(&value_key([1u8; 32])).unwrap());
        alloc.delete_value([1u8; 32]).unwrap();
        assert!(!alloc.kv.exists(&value_key([1u8; 32])).unwrap());
    }
}
