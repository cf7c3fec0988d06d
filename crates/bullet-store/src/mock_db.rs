//! An in-memory key-value store, for tests that exercise the allocator
//! without paying RocksDB's setup cost. Mirrors the shape of
//! `smt::jellyfish_merkle::mock_tree_store::MockTreeStore`: a single
//! `RwLock`-guarded map, no persistence across process restarts.

use crate::error::StoreResult;
use crate::kv::KvStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// An in-memory `KvStore`, for unit and integration tests.
#[derive(Default)]
pub struct MockDb {
    map: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MockDb {
    /// Builds an empty store.
    pub fn new() -> Self {
        MockDb::default()
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    /// `true` iff the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.read().unwrap().is_empty()
    }
}

impl KvStore for MockDb {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.map.read().unwrap().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.map
            .write()
            .unwrap()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.map.write().unwrap().remove(key);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.map.read().unwrap().contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let db = MockDb::new();
        db.put(b"k", b"v").unwrap();
        assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert!(db.exists(b"k").unwrap());
    }

    #[test]
    fn delete_removes_entry() {
        let db = MockDb::new();
        db.put(b"k", b"v").unwrap();
        db.delete(b"k").unwrap();
        assert_eq!(db.get(b"k").unwrap(), None);
        assert!(!db.exists(b"k").unwrap());
    }
}
