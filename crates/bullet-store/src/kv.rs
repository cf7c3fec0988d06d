//! The minimal key-value surface the [`NodeAllocator`](crate::allocator)
//! needs, implemented by both [`BulletDb`](crate::bulletdb::BulletDb) and
//! [`MockDb`](crate::mock_db::MockDb). Each call is its own per-node
//! transaction, per the component design's note that the external KV's
//! transactions operate at per-node granularity rather than across a
//! whole trie mutation.

use crate::error::StoreResult;
use crate::bulletdb::BulletDb;

/// Byte-oriented get/put/delete/exists, each a self-contained transaction.
pub trait KvStore: Send + Sync {
    /// Reads `key`, copying the value out.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;
    /// Writes `key => value`, committing immediately.
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;
    /// Deletes `key`, committing immediately.
    fn delete(&self, key: &[u8]) -> StoreResult<()>;
    /// `true` iff `key` is present.
    fn exists(&self, key: &[u8]) -> StoreResult<bool>;
}

impl KvStore for BulletDb {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        BulletDb::get(self, key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let mut txn = self.start_txn();
        txn.put(key, value);
        txn.commit()
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        let mut txn = self.start_txn();
        txn.del(key);
        txn.commit()
    }

    fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        BulletDb::exists(self, key)
    }
}
