//! The Ledger facade: maps block hashes to small integer block ids, derives
//! key hashes, and delegates trie mutation/reads to the root `Branch` for
//! whichever block is in play.
//!
//! Block ids are kept small (`u16`) on purpose: every `NodeId` carries one,
//! and only `PENDING_BLOCKS_HINT`-ish blocks are ever in flight at once
//! (unfinalized candidates waiting on consensus elsewhere). Id `0` is
//! reserved for the canonical, finalized-and-justified view.

use std::collections::HashMap;
use std::sync::Arc;

use bullet_kzg::derive_hash;
use bullet_store::kv::KvStore;
use bullet_trie::{Branch, Node, NodeAllocator, NodeId, TrieError};

use crate::error::{LedgerError, LedgerResult};
use crate::gadgets::Gadgets;

const PENDING_BLOCKS_HINT: usize = 256;

/// The Ledger facade over one shard of the trie.
pub struct Ledger<S: KvStore> {
    gadgets: Arc<Gadgets<S>>,
    block_hash_map: HashMap<[u8; 32], u16>,
    current_block_id: u16,
    shard_prefix: Vec<u8>,
}

impl<S: KvStore> Ledger<S> {
    /// Builds a Ledger over an already-constructed `Gadgets`, covering the
    /// shard whose keys share `shard_prefix` (empty means "every key").
    pub fn new(gadgets: Arc<Gadgets<S>>, shard_prefix: Vec<u8>) -> Self {
        Ledger {
            gadgets,
            block_hash_map: HashMap::with_capacity(PENDING_BLOCKS_HINT),
            current_block_id: 1,
            shard_prefix,
        }
    }

    /// The shared KZG setup and node allocator.
    pub fn gadgets(&self) -> &Arc<Gadgets<S>> {
        &self.gadgets
    }

    /// `true` iff `hash`'s prefix matches this shard's.
    pub fn in_shard(&self, hash: &[u8; 32]) -> bool {
        let matched = self
            .shard_prefix
            .iter()
            .zip(hash.iter())
            .take_while(|(a, b)| a == b)
            .count();
        matched == self.shard_prefix.len()
    }

    /// Maps a block hash to its small integer id, allocating a fresh one
    /// (skipping the reserved canonical id `0`) if `create_new` and the
    /// hash hasn't been seen before. Returns `0` if not found and
    /// `create_new` is `false` — the canonical, already-justified view.
    pub fn get_block_id(&mut self, block_hash: &[u8; 32], create_new: bool) -> u16 {
        if let Some(&id) = self.block_hash_map.get(block_hash) {
            return id;
        }
        if !create_new {
            return 0;
        }
        let id = self.current_block_id;
        self.current_block_id = self.current_block_id.wrapping_add(1);
        if self.current_block_id == 0 {
            self.current_block_id = 1;
        }
        self.block_hash_map.insert(*block_hash, id);
        id
    }

    /// Forgets a block hash's id mapping, e.g. once its block has been
    /// justified or pruned. `true` iff an entry was present.
    pub fn remove_block_id(&mut self, block_hash: &[u8; 32]) -> bool {
        self.block_hash_map.remove(block_hash).is_some()
    }

    /// Loads the root for `block_id`, lazily materializing it by copying
    /// `prev_block_id`'s root (or an empty branch, if that one doesn't
    /// exist either) under `block_id`. Nothing is duplicated in storage —
    /// this is the trie's copy-on-write entry point, just retagging a
    /// cached `Node` under the new id.
    pub fn get_root(&self, block_id: u16, prev_block_id: u16) -> LedgerResult<Node> {
        let id = NodeId::root(block_id);
        match self.gadgets.alloc.load_node(id) {
            Ok(node) => Ok(node),
            Err(TrieError::LoadNodeErr) | Err(TrieError::NotExist) => {
                let prev_id = NodeId::root(prev_block_id);
                let prev_root = match self.gadgets.alloc.load_node(prev_id) {
                    Ok(node) => node,
                    Err(TrieError::LoadNodeErr) | Err(TrieError::NotExist) => {
                        let fresh = Node::Branch(Branch::new(prev_id));
                        self.gadgets.alloc.cache_node(fresh.clone());
                        fresh
                    }
                    Err(e) => return Err(e.into()),
                };
                let mut node = prev_root;
                node.set_id(id);
                self.gadgets.alloc.cache_node(node.clone());
                Ok(node)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn key_hash(&self, key: &[u8], idx: u8) -> [u8; 32] {
        let mut h = derive_hash(key);
        h[31] = idx;
        h
    }

    /// Inserts/updates the value at `key[idx]` under `block_hash` (whose
    /// trie view is copy-on-write materialized from `prev_block_hash` on
    /// first write).
    pub fn put(
        &mut self,
        key: &[u8],
        val_hash: [u8; 32],
        idx: u8,
        block_hash: &[u8; 32],
        prev_block_hash: &[u8; 32],
    ) -> LedgerResult<()> {
        let key_hash = self.key_hash(key, idx);
        if !self.in_shard(&key_hash) {
            return Err(LedgerError::NotInShard);
        }
        let block_id = self.get_block_id(block_hash, true);
        let prev_block_id = self.get_block_id(prev_block_hash, false);
        let mut root = self.get_root(block_id, prev_block_id)?.expect_branch();
        root.put(&key_hash, val_hash, block_id, &self.gadgets.alloc)?;
        self.gadgets.alloc.cache_node(Node::Branch(root));
        Ok(())
    }

    /// Replaces the value at `key[idx]`, requiring it currently equal
    /// `prev_val_hash`.
    pub fn replace(
        &mut self,
        key: &[u8],
        val_hash: [u8; 32],
        prev_val_hash: [u8; 32],
        idx: u8,
        block_hash: &[u8; 32],
        prev_block_hash: &[u8; 32],
    ) -> LedgerResult<()> {
        let key_hash = self.key_hash(key, idx);
        if !self.in_shard(&key_hash) {
            return Err(LedgerError::NotInShard);
        }
        let block_id = self.get_block_id(block_hash, true);
        let prev_block_id = self.get_block_id(prev_block_hash, false);
        let mut root = self.get_root(block_id, prev_block_id)?.expect_branch();
        root.replace(
            &key_hash,
            val_hash,
            prev_val_hash,
            block_id,
            &self.gadgets.alloc,
        )?;
        self.gadgets.alloc.cache_node(Node::Branch(root));
        Ok(())
    }

    /// Zeroes the value at `key[idx]`. Idempotent-safe: a second removal of
    /// the same slot surfaces `AlreadyDeleted` rather than `NotExist`.
    pub fn remove(
        &mut self,
        key: &[u8],
        idx: u8,
        block_hash: &[u8; 32],
        prev_block_hash: &[u8; 32],
    ) -> LedgerResult<()> {
        let key_hash = self.key_hash(key, idx);
        if !self.in_shard(&key_hash) {
            return Err(LedgerError::NotInShard);
        }
        let block_id = self.get_block_id(block_hash, true);
        let prev_block_id = self.get_block_id(prev_block_hash, false);
        let mut root = self.get_root(block_id, prev_block_id)?.expect_branch();
        match root.remove(&key_hash, block_id, &self.gadgets.alloc) {
            Ok(()) => {
                self.gadgets.alloc.cache_node(Node::Branch(root));
                Ok(())
            }
            Err(TrieError::Deleted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates a fresh account at `key`, writing the account's own key
    /// digest into its reserved value index `0` slot (callers store real
    /// values at any other index via [`Ledger::put`]). This slot-0 marker
    /// is what the full-key binding proof in `generate_proof` opens.
    pub fn create_account(
        &mut self,
        key: &[u8],
        block_hash: &[u8; 32],
        prev_block_hash: &[u8; 32],
    ) -> LedgerResult<()> {
        let key_hash = self.key_hash(key, 0);
        if !self.in_shard(&key_hash) {
            return Err(LedgerError::NotInShard);
        }
        let block_id = self.get_block_id(block_hash, true);
        let prev_block_id = self.get_block_id(prev_block_hash, false);
        let mut root = self.get_root(block_id, prev_block_id)?.expect_branch();
        root.create_account(&key_hash, block_id, &self.gadgets.alloc)?;
        self.gadgets.alloc.cache_node(Node::Branch(root));
        Ok(())
    }

    /// Deletes an account at `key` and every stored slot value under it.
    pub fn delete_account(
        &mut self,
        key: &[u8],
        block_hash: &[u8; 32],
        prev_block_hash: &[u8; 32],
    ) -> LedgerResult<()> {
        let key_hash = self.key_hash(key, 0);
        if !self.in_shard(&key_hash) {
            return Err(LedgerError::NotInShard);
        }
        let block_id = self.get_block_id(block_hash, true);
        let prev_block_id = self.get_block_id(prev_block_hash, false);
        let mut root = self.get_root(block_id, prev_block_id)?.expect_branch();
        match root.delete_account(&key_hash, block_id, &self.gadgets.alloc) {
            Ok(()) => {
                self.gadgets.alloc.cache_node(Node::Branch(root));
                Ok(())
            }
            Err(TrieError::Deleted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stores a value payload keyed by `Blake3(key)`.
    pub fn db_store_value(&self, key: &[u8], value: &[u8]) -> LedgerResult<()> {
        self.gadgets
            .alloc
            .store_value(derive_hash(key), value)
            .map_err(Into::into)
    }

    /// Reads a value payload keyed by `Blake3(key)`.
    pub fn db_get_value(&self, key: &[u8]) -> LedgerResult<Option<Vec<u8>>> {
        self.gadgets
            .alloc
            .get_value(derive_hash(key))
            .map_err(Into::into)
    }

    /// Deletes a value payload keyed by `Blake3(key)`.
    pub fn db_delete_value(&self, key: &[u8]) -> LedgerResult<()> {
        self.gadgets
            .alloc
            .delete_value(derive_hash(key))
            .map_err(Into::into)
    }

    /// `true` iff a value payload is stored under `Blake3(key)`.
    pub fn db_value_exists(&self, key: &[u8]) -> LedgerResult<bool> {
        self.gadgets
            .alloc
            .value_exists(derive_hash(key))
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bullet_kzg::scalar::scalar_from;
    use bullet_store::allocator::Allocator;
    use bullet_store::mock_db::MockDb;
    use crate::gadgets::KzgSettings;

    fn test_ledger() -> Ledger<MockDb> {
        let settings = KzgSettings::new(scalar_from(13), b"TAG".to_vec());
        let alloc = Allocator::new(Arc::new(MockDb::new()), 64);
        let gadgets = Arc::new(Gadgets::new(settings, alloc));
        Ledger::new(gadgets, Vec::new())
    }

    #[test]
    fn get_block_id_allocates_and_remembers() {
        let mut ledger = test_ledger();
        let hash = [1u8; 32];
        let id_a = ledger.get_block_id(&hash, true);
        let id_b = ledger.get_block_id(&hash, true);
        assert_eq!(id_a, id_b);
        assert_ne!(id_a, 0);
    }

    #[test]
    fn get_block_id_without_create_defaults_to_canonical() {
        let mut ledger = test_ledger();
        assert_eq!(ledger.get_block_id(&[9u8; 32], false), 0);
    }

    #[test]
    fn put_then_value_round_trips_through_db_store() {
        let mut ledger = test_ledger();
        let key = b"account-key";
        let value = b"account-value";
        ledger.db_store_value(key, value).unwrap();
        assert_eq!(ledger.db_get_value(key).unwrap(), Some(value.to_vec()));
        assert!(ledger.db_value_exists(key).unwrap());

        let val_hash = bullet_kzg::derive_kv_hash(key, value);
        let block_hash = [2u8; 32];
        let prev_hash = [0u8; 32];
        ledger.put(key, val_hash, 0, &block_hash, &prev_hash).unwrap();

        let block_id = ledger.get_block_id(&block_hash, false);
        let root = ledger.get_root(block_id, 0).unwrap().expect_branch();
        assert!(!root.should_delete());
    }

    #[test]
    fn remove_of_missing_key_is_not_exist() {
        let mut ledger = test_ledger();
        let block_hash = [3u8; 32];
        let prev_hash = [0u8; 32];
        let res = ledger.remove(b"missing", 0, &block_hash, &prev_hash);
        assert_eq!(res, Err(LedgerError::NotExist));
    }
}
