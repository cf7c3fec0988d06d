//! `NodeId`: a 16-byte identity carrying `(path prefix, level, block_id)`.

use byteorder::{ByteOrder, LittleEndian};
use std::hash::{BuildHasherDefault, Hasher};

/// Length of the stored path prefix, in bytes/nibbles.
pub const PATH_BYTES: usize = 13;
/// Length of the level field, in bytes.
pub const LEVEL_BYTES: usize = 1;
/// Length of the block id field, in bytes.
pub const BLOCK_ID_BYTES: usize = 2;
/// Total encoded size of a [`NodeId`].
pub const ID_SIZE: usize = PATH_BYTES + LEVEL_BYTES + BLOCK_ID_BYTES;

/// Block id reserved for the canonical, finalized-and-justified view.
pub const CANONICAL_BLOCK_ID: u16 = 0;

/// 16-byte node identity: `path[13] \| level[1] \| block_id[2]`.
///
/// `path[i]` for `i < level` holds the nibble taken at trie level `i` on
/// the way from the root; `path[i]` for `i >= level` is zero for
/// canonical/root-like ids.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct NodeId {
    path: [u8; PATH_BYTES],
    level: u8,
    block_id: u16,
}

impl NodeId {
    /// Builds a `NodeId` at the trie root: empty path, `level = 0`.
    pub fn root(block_id: u16) -> Self {
        NodeId {
            path: [0u8; PATH_BYTES],
            level: 0,
            block_id,
        }
    }

    /// Builds a `NodeId` whose path is `key`'s first `level` bytes, zero
    /// beyond that, at the given `level` and `block_id`.
    pub fn new(key: &[u8; 32], level: u8, block_id: u16) -> Self {
        let mut path = [0u8; PATH_BYTES];
        let prefix = (level as usize).min(PATH_BYTES);
        path[..prefix].copy_from_slice(&key[..prefix]);
        NodeId {
            path,
            level,
            block_id,
        }
    }

    /// The recorded path prefix.
    pub fn path(&self) -> &[u8; PATH_BYTES] {
        &self.path
    }

    /// The level this id was recorded at.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// The block id this id belongs to.
    pub fn block_id(&self) -> u16 {
        self.block_id
    }

    /// `true` iff this id belongs to the canonical, finalized-and-justified
    /// view.
    pub fn is_canonical(&self) -> bool {
        self.block_id == CANONICAL_BLOCK_ID
    }

    /// Increments `level` by one.
    pub fn increment_level(&mut self) {
        self.level += 1;
    }

    /// Writes `nib` at offset `level` (the nibble a child of this node
    /// will be reached through).
    pub fn set_child_nibble(&mut self, nib: u8) {
        self.path[self.level as usize] = nib;
    }

    /// Writes `nib` at offset `level - 1` (the nibble this node itself
    /// was reached through).
    pub fn set_self_nibble(&mut self, nib: u8) {
        self.path[self.level as usize - 1] = nib;
    }

    /// Overwrites the block id in place.
    pub fn set_block_id(&mut self, block_id: u16) {
        self.block_id = block_id;
    }

    /// Overwrites the level in place.
    pub fn set_level(&mut self, level: u8) {
        self.level = level;
    }

    /// Compares `path[0..level]` against `hash[0..level]`; `true` iff this
    /// id's recorded path is a prefix of `hash`.
    pub fn cmp(&self, hash: &[u8; 32]) -> bool {
        let level = self.level as usize;
        self.path[..level] == hash[..level]
    }

    /// Encodes this id as its canonical 16-byte key.
    pub fn to_bytes(&self) -> [u8; ID_SIZE] {
        let mut out = [0u8; ID_SIZE];
        out[..PATH_BYTES].copy_from_slice(&self.path);
        out[PATH_BYTES] = self.level;
        LittleEndian::write_u16(&mut out[PATH_BYTES + LEVEL_BYTES..], self.block_id);
        out
    }

    /// Decodes a 16-byte key previously produced by [`NodeId::to_bytes`].
    pub fn from_bytes(bytes: &[u8; ID_SIZE]) -> Self {
        let mut path = [0u8; PATH_BYTES];
        path.copy_from_slice(&bytes[..PATH_BYTES]);
        let level = bytes[PATH_BYTES];
        let block_id = LittleEndian::read_u16(&bytes[PATH_BYTES + LEVEL_BYTES..]);
        NodeId {
            path,
            level,
            block_id,
        }
    }
}

/// FNV-1a hasher used for the `NodeId -> Node` cache maps, matching the
/// component design's choice of FNV over the default SipHash: NodeId
/// lookups are on the hot path of every trie operation and FNV avoids
/// SipHash's setup cost for a fixed 16-byte key.
pub struct FnvHasher(u64);

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

impl Default for FnvHasher {
    fn default() -> Self {
        FnvHasher(FNV_OFFSET_BASIS)
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut hash = self.0;
        for b in bytes {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        self.0 = hash;
    }
}

/// `BuildHasher` for [`FnvHasher`], for use as
/// `HashMap<NodeId, V, NodeIdHashBuilder>`.
pub type NodeIdHashBuilder = BuildHasherDefault<FnvHasher>;

impl std::hash::Hash for NodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.to_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_level_and_set_child_nibble_are_monotone() {
        let mut id = NodeId::root(1);
        assert_eq!(id.level(), 0);
        id.set_child_nibble(0xa);
        id.increment_level();
        assert_eq!(id.level(), 1);
        assert_eq!(id.path()[0], 0xa);
    }

    #[test]
    fn round_trips_through_bytes() {
        let key = [7u8; 32];
        let id = NodeId::new(&key, 3, 42);
        let bytes = id.to_bytes();
        assert_eq!(bytes.len(), ID_SIZE);
        let back = NodeId::from_bytes(&bytes);
        assert_eq!(back, id);
    }

    #[test]
    fn cmp_checks_recorded_prefix() {
        let key = [9u8; 32];
        let id = NodeId::new(&key, 5, 0);
        assert!(id.cmp(&key));
        let mut other = key;
        other[0] = 0;
        assert!(!id.cmp(&other));
    }
}
