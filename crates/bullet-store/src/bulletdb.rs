//! `BulletDb`: a thin, transactional wrapper around an embedded ordered
//! KV store (RocksDB), matching the single-writer/multi-reader contract.
//!
//! Reads go through a snapshot (`start_rd_txn`) so that a long-lived
//! reader is never disturbed by a writer committing underneath it.
//! Writes are batched (`start_txn`) and only become visible atomically on
//! `commit`. `get_raw` on either kind of transaction may borrow directly
//! from RocksDB's pinned buffer; callers that need the bytes past the end
//! of the transaction must copy them out first.

use crate::error::StoreResult;
use rocksdb::{DBPinnableSlice, Snapshot, WriteBatch, DB};
use std::path::Path;

/// An open RocksDB-backed key-value store.
pub struct BulletDb {
    db: DB,
}

impl BulletDb {
    /// Opens (creating if absent) the database rooted at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(BulletDb { db })
    }

    /// Begins a read-only, snapshot-isolated transaction.
    pub fn start_rd_txn(&self) -> ReadTxn<'_> {
        ReadTxn {
            snapshot: self.db.snapshot(),
        }
    }

    /// Begins a write transaction. Nothing is visible to readers until
    /// [`WriteTxn::commit`].
    pub fn start_txn(&self) -> WriteTxn<'_> {
        WriteTxn {
            db: &self.db,
            batch: WriteBatch::default(),
        }
    }

    /// Reads `key` against the live (uncommitted-read) view, for callers
    /// that don't need snapshot isolation.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    /// `true` iff `key` is present in the live view.
    pub fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.db.get_pinned(key)?.is_some())
    }
}

/// A consistent-snapshot read transaction.
pub struct ReadTxn<'a> {
    snapshot: Snapshot<'a>,
}

impl<'a> ReadTxn<'a> {
    /// Looks up `key`, returning a slice pinned into the snapshot's
    /// memory. The caller must not retain it past `self`'s lifetime;
    /// copy immediately if the value needs to outlive this transaction.
    pub fn get_raw(&self, key: &[u8]) -> StoreResult<Option<DBPinnableSlice<'_>>> {
        Ok(self.snapshot.get_pinned(key)?)
    }

    /// Convenience over [`ReadTxn::get_raw`] that copies the value out.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.get_raw(key)?.map(|slice| slice.to_vec()))
    }

    /// `true` iff `key` is present in this snapshot.
    pub fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get_raw(key)?.is_some())
    }
}

/// A batched write transaction. Mutations are buffered and applied
/// atomically on [`WriteTxn::commit`].
pub struct WriteTxn<'a> {
    db: &'a DB,
    batch: WriteBatch,
}

impl<'a> WriteTxn<'a> {
    /// Stages `key => value`.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.batch.put(key, value);
    }

    /// Stages a deletion of `key`.
    pub fn del(&mut self, key: &[u8]) {
        self.batch.delete(key);
    }

    /// Reads `key` against the live view, bypassing this transaction's
    /// own uncommitted writes (the engine does not provide read-your-writes
    /// at the batch level; callers track their own staged state if needed).
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    /// `true` iff `key` is present in the live view.
    pub fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.db.get_pinned(key)?.is_some())
    }

    /// Applies all staged mutations atomically.
    pub fn commit(self) -> StoreResult<()> {
        self.db.write(self.batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_txn_commit_is_visible_to_new_read_txn() {
        let dir = tempfile::tempdir().unwrap();
        let db = BulletDb::open(dir.path()).unwrap();

        let mut txn = db.start_txn();
        txn.put(b"k1", b"v1");
        txn.commit().unwrap();

        let rd = db.start_rd_txn();
        assert_eq!(rd.get(b"k1").unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn read_txn_is_isolated_from_later_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db = BulletDb::open(dir.path()).unwrap();

        let mut txn = db.start_txn();
        txn.put(b"k1", b"v1");
        txn.commit().unwrap();

        let rd = db.start_rd_txn();

        let mut txn2 = db.start_txn();
        txn2.put(b"k1", b"v2");
        txn2.commit().unwrap();

        assert_eq!(rd.get(b"k1").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(db.get(b"k1").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn del_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let db = BulletDb::open(dir.path()).unwrap();

        let mut txn = db.start_txn();
        txn.put(b"k1", b"v1");
        txn.commit().unwrap();
        assert!(db.exists(b"k1").unwrap());

        let mut txn = db.start_txn();
        txn.del(b"k1");
        txn.commit().unwrap();
        assert!(!db.exists(b"k1").unwrap());
    }
}
