//! Leaf nodes: up to `LEAF_ORDER` value digests for one account, committed
//! with a single KZG polynomial.

use crate::error::{TrieError, TrieResult};
use crate::node::NodeAllocator;
use crate::node_id::NodeId;
use bullet_kzg::{G1Point, NttRoots, Polynomial, Scalar, hash_to_sk, zero_sk, BRANCH_ORDER};

/// Value slots per account leaf.
pub const LEAF_ORDER: usize = 128;

const ZERO_HASH: [u8; 32] = [0u8; 32];

/// A leaf node: one account's value slots.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    /// This node's identity.
    pub id: NodeId,
    /// The full account key.
    path: [u8; 32],
    /// KZG commitment to the leaf's value-digest polynomial.
    pub commit: G1Point,
    /// Number of occupied (non-zero) slots.
    pub count: u8,
    /// `true` once the account has been deleted.
    pub is_deleted: bool,
    /// Value digest per slot; a zero hash means the slot is empty. Slot `0`
    /// is conventionally the account's own key digest, written by
    /// `create_account` rather than a normal value write.
    children: Vec<[u8; 32]>,
    /// Block that last touched each slot.
    child_block_ids: Vec<u16>,
}

impl Leaf {
    /// Builds an empty leaf for `path` at `id`.
    pub fn new(id: NodeId, path: [u8; 32]) -> Leaf {
        Leaf {
            id,
            path,
            commit: bullet_kzg::point::identity_g1(),
            count: 0,
            is_deleted: false,
            children: vec![ZERO_HASH; LEAF_ORDER],
            child_block_ids: vec![0u16; LEAF_ORDER],
        }
    }

    /// The account key this leaf covers.
    pub fn path(&self) -> &[u8; 32] {
        &self.path
    }

    /// `true` iff this leaf should be deleted.
    pub fn should_delete(&self) -> bool {
        self.is_deleted
    }

    /// Compares `key[0..31]` against `path[0..31]`. Returns `None` if they
    /// fully match; otherwise the first differing byte index.
    pub fn matching_path(&self, key: &[u8; 32]) -> Option<usize> {
        (0..31).find(|&i| key[i] != self.path[i])
    }

    fn recache_if_needed(&mut self, new_block_id: u16, alloc: &impl NodeAllocator) -> TrieResult<()> {
        if self.id.block_id() != new_block_id {
            let old_id = self.id;
            self.id.set_block_id(new_block_id);
            alloc.recache(old_id, self.id)?;
        }
        Ok(())
    }

    fn slot_key(&self, val_idx: usize) -> [u8; 32] {
        let mut k = self.path;
        k[31] = val_idx as u8;
        k
    }

    /// Writes `val_hash` at `key[31]`, creating the slot if absent.
    /// Assumes `matching_path(key).is_none()`.
    pub fn write_slot(
        &mut self,
        key: &[u8; 32],
        val_hash: [u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        let val_idx = key[31] as usize;
        if val_idx >= LEAF_ORDER {
            return Err(TrieError::ValIdxRange);
        }
        if self.children[val_idx] == ZERO_HASH && val_hash != ZERO_HASH {
            self.count += 1;
        } else if self.children[val_idx] != ZERO_HASH && val_hash == ZERO_HASH {
            self.count = self.count.saturating_sub(1);
        }
        self.children[val_idx] = val_hash;
        self.child_block_ids[val_idx] = new_block_id;
        self.recache_if_needed(new_block_id, alloc)
    }

    /// Replaces the value at `key[31]`, requiring it currently equal
    /// `prev_val_hash`. Assumes `matching_path(key).is_none()`.
    pub fn replace_slot(
        &mut self,
        key: &[u8; 32],
        val_hash: [u8; 32],
        prev_val_hash: [u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        let val_idx = key[31] as usize;
        if val_idx >= LEAF_ORDER {
            return Err(TrieError::ValIdxRange);
        }
        if self.children[val_idx] != prev_val_hash {
            return Err(TrieError::ReplaceValueErr);
        }
        self.children[val_idx] = val_hash;
        self.child_block_ids[val_idx] = new_block_id;
        self.recache_if_needed(new_block_id, alloc)
    }

    /// Zeroes the slot at `key[31]`. `NOT_EXIST` if this leaf doesn't match
    /// `key` at all; `ALREADY_DELETED` if the slot is already empty,
    /// making repeated removal of the same slot idempotent-safe.
    pub fn remove_slot(
        &mut self,
        key: &[u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        if self.matching_path(key).is_some() {
            return Err(TrieError::NotExist);
        }
        let val_idx = key[31] as usize;
        if val_idx >= LEAF_ORDER {
            return Err(TrieError::ValIdxRange);
        }
        if self.children[val_idx] == ZERO_HASH {
            return Err(TrieError::AlreadyDeleted);
        }
        self.children[val_idx] = ZERO_HASH;
        self.count = self.count.saturating_sub(1);
        self.recache_if_needed(new_block_id, alloc)
    }

    /// Marks the whole account deleted, zeroing all slots and deleting
    /// their stored values. Always signals `Deleted` on success so the
    /// caller (a `Branch`) removes its own child entry.
    pub fn delete_account(
        &mut self,
        key: &[u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        if self.matching_path(key).is_some() {
            return Err(TrieError::NotExist);
        }
        if self.is_deleted {
            return Err(TrieError::AlreadyDeleted);
        }
        for i in 0..LEAF_ORDER {
            if self.children[i] != ZERO_HASH {
                let k = self.slot_key(i);
                let digest = bullet_kzg::derive_hash(&k);
                alloc
                    .delete_value(digest)
                    .map_err(|_| TrieError::DeleteValueErr)?;
            }
        }
        self.children = vec![ZERO_HASH; LEAF_ORDER];
        self.child_block_ids = vec![0u16; LEAF_ORDER];
        self.count = 0;
        self.is_deleted = true;
        self.recache_if_needed(new_block_id, alloc)?;
        Err(TrieError::Deleted)
    }

    /// Builds this leaf's `Fx`: a `BRANCH_ORDER`-length buffer with the
    /// first `LEAF_ORDER` slots set to `scalar(children[i])` and the rest
    /// zero-padded, so it can be transformed with the same `NttRoots`
    /// table the branch layer uses.
    fn padded_fx(&self) -> Vec<Scalar> {
        let mut fx = vec![zero_sk(); BRANCH_ORDER];
        for (i, h) in self.children.iter().enumerate() {
            fx[i] = hash_to_sk(h);
        }
        fx
    }

    /// Pushes this leaf's zero-padded `Fx` and commitment onto the proof
    /// vectors.
    pub fn generate_proof(&self, fxs: &mut Vec<Polynomial>, cs: &mut Vec<G1Point>) -> TrieResult<()> {
        fxs.push(Polynomial::new(self.padded_fx()));
        cs.push(self.commit);
        Ok(())
    }

    /// `commit = commit_g1(iFFT(Fx))` over the leaf's zero-padded
    /// value-digest polynomial, using the shared `BRANCH_ORDER`-sized
    /// `NttRoots` table.
    pub fn finalize(
        &mut self,
        _block_id: u16,
        _tag: &[u8],
        roots: &NttRoots,
        srs: &bullet_kzg::Srs,
        _alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        let mut coeffs = self.padded_fx();
        bullet_kzg::ntt::inverse_fft_in_place(&mut coeffs, &roots.inv_roots);
        self.commit = srs.commit_g1(&Polynomial::new(coeffs));
        Ok(())
    }

    /// For each slot tied to `block_id`, deletes the stored value; then
    /// deletes this node (ignoring `NOT_FOUND`).
    pub fn prune(&mut self, block_id: u16, alloc: &impl NodeAllocator) -> TrieResult<()> {
        for i in 0..LEAF_ORDER {
            if self.child_block_ids[i] == block_id && self.children[i] != ZERO_HASH {
                let k = self.slot_key(i);
                let digest = bullet_kzg::derive_hash(&k);
                match alloc.delete_value(digest) {
                    Ok(()) | Err(TrieError::NotExist) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        match alloc.delete_node(self.id) {
            Ok(()) | Err(TrieError::NotExist) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Promotes this block's values to canonical (`block_id = 0`). If the
    /// leaf is being deleted, deletes underlying values instead of
    /// renaming them. Returns `Err(Deleted)` if `is_deleted`.
    pub fn justify(&mut self, _block_id: u16, alloc: &impl NodeAllocator) -> TrieResult<()> {
        for i in 0..LEAF_ORDER {
            if self.child_block_ids[i] == 0 {
                continue;
            }
            if self.children[i] == ZERO_HASH {
                self.child_block_ids[i] = 0;
                continue;
            }
            if self.is_deleted {
                let k = self.slot_key(i);
                let digest = bullet_kzg::derive_hash(&k);
                match alloc.delete_value(digest) {
                    Ok(()) | Err(TrieError::NotExist) => {}
                    Err(e) => return Err(e),
                }
            }
            self.child_block_ids[i] = 0;
        }

        alloc.delete_node(self.id)?;
        if self.is_deleted {
            return Err(TrieError::Deleted);
        }
        self.id.set_block_id(0);
        alloc.cache_node(crate::node::Node::Leaf(self.clone()));
        Ok(())
    }

    /// Writes this leaf's serialized bytes (without the leading tag) to
    /// `out`.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&bullet_kzg::point::compress_g1(&self.commit));
        out.push(if self.is_deleted { 1 } else { 0 });
        out.extend_from_slice(&self.path);
        out.push(self.count);
        for h in &self.children {
            out.extend_from_slice(h);
        }
        for blk in &self.child_block_ids {
            let mut b = [0u8; 2];
            byteorder::LittleEndian::write_u16(&mut b, *blk);
            out.extend_from_slice(&b);
        }
    }

    /// Parses the bytes following the tag byte written by [`Leaf::serialize`].
    pub fn deserialize(id: NodeId, bytes: &[u8]) -> TrieResult<Leaf> {
        use byteorder::{ByteOrder, LittleEndian};
        let expected = 48 + 1 + 32 + 1 + LEAF_ORDER * 32 + LEAF_ORDER * 2;
        if bytes.len() != expected {
            return Err(TrieError::LoadNodeErr);
        }
        let commit =
            bullet_kzg::point::decompress_g1(&bytes[0..48]).map_err(|_| TrieError::LoadNodeErr)?;
        let is_deleted = bytes[48] != 0;
        let mut path = [0u8; 32];
        path.copy_from_slice(&bytes[49..81]);
        let count = bytes[81];
        let mut offset = 82;
        let mut children = Vec::with_capacity(LEAF_ORDER);
        for _ in 0..LEAF_ORDER {
            let mut h = [0u8; 32];
            h.copy_from_slice(&bytes[offset..offset + 32]);
            children.push(h);
            offset += 32;
        }
        let mut child_block_ids = Vec::with_capacity(LEAF_ORDER);
        for _ in 0..LEAF_ORDER {
            child_block_ids.push(LittleEndian::read_u16(&bytes[offset..offset + 2]));
            offset += 2;
        }
        Ok(Leaf {
            id,
            path,
            commit,
            count,
            is_deleted,
            children,
            child_block_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_id::NodeId as TestNodeId;

    fn leaf_with_path(path: [u8; 32]) -> Leaf {
        Leaf::new(TestNodeId::new(&path, 32, 0), path)
    }

    #[test]
    fn matching_path_detects_divergence() {
        let mut path = [1u8; 32];
        let leaf = leaf_with_path(path);
        assert_eq!(leaf.matching_path(&path), None);
        path[5] = 9;
        assert_eq!(leaf.matching_path(&path), Some(5));
    }

    #[test]
    fn serialize_round_trips() {
        let mut path = [3u8; 32];
        path[31] = 7;
        let mut leaf = leaf_with_path(path);
        leaf.count = 1;
        leaf.children[7] = [9u8; 32];
        leaf.child_block_ids[7] = 4;

        let mut bytes = Vec::new();
        leaf.serialize(&mut bytes);
        let parsed = Leaf::deserialize(leaf.id, &bytes).unwrap();
        assert_eq!(parsed, leaf);
    }
}
