//! The `Node` enum (Branch/Leaf polymorphism), its tagged wire encoding,
//! and the `NodeAllocator` contract that recursive trie operations use to
//! load, cache, and persist nodes.
//!
//! `bullet-trie` never talks to storage directly: it is generic over an
//! allocator implementation, the same way `smt`'s `JellyfishMerkleTree` is
//! generic over a `TreeReader`/`TreeWriter`. `bullet-store::NodeAllocator`
//! is the concrete implementation used in production; tests use an
//! in-memory double.

use crate::branch::Branch;
use crate::error::{TrieError, TrieResult};
use crate::leaf::Leaf;
use crate::node_id::NodeId;

/// Tag byte for a serialized [`Node::Branch`].
pub const BRANCH_TAG: u8 = 69;
/// Tag byte for a serialized [`Node::Leaf`].
pub const LEAF_TAG: u8 = 71;

/// A trie node: either a `Branch` (fans out over a nibble range) or a
/// `Leaf` (stores an account's value slots).
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A branch node.
    Branch(Branch),
    /// A leaf node.
    Leaf(Leaf),
}

impl Node {
    /// The id of the wrapped node.
    pub fn id(&self) -> NodeId {
        match self {
            Node::Branch(b) => b.id,
            Node::Leaf(l) => l.id,
        }
    }

    /// `true` iff the wrapped node should be deleted rather than
    /// persisted (`Branch::should_delete` / `Leaf::should_delete`).
    pub fn should_delete(&self) -> bool {
        match self {
            Node::Branch(b) => b.should_delete(),
            Node::Leaf(l) => l.should_delete(),
        }
    }

    /// Overwrites the wrapped node's id, e.g. when `recache` moves it to
    /// a new `NodeId`.
    pub fn set_id(&mut self, id: NodeId) {
        match self {
            Node::Branch(b) => b.id = id,
            Node::Leaf(l) => l.id = id,
        }
    }

    /// Serialises the node with its leading tag byte, per the external
    /// wire format.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Node::Branch(b) => {
                out.push(BRANCH_TAG);
                b.serialize(&mut out);
            }
            Node::Leaf(l) => {
                out.push(LEAF_TAG);
                l.serialize(&mut out);
            }
        }
        out
    }

    /// Parses a node previously produced by [`Node::encode`], dispatching
    /// on the leading tag byte.
    pub fn decode(id: NodeId, bytes: &[u8]) -> TrieResult<Node> {
        let (&tag, rest) = bytes.split_first().ok_or(TrieError::LoadNodeErr)?;
        match tag {
            BRANCH_TAG => Ok(Node::Branch(Branch::deserialize(id, rest)?)),
            LEAF_TAG => Ok(Node::Leaf(Leaf::deserialize(id, rest)?)),
            _ => Err(TrieError::LoadNodeErr),
        }
    }

    /// Unwraps a branch, or panics. Used where the caller has already
    /// established the node's kind.
    pub fn expect_branch(self) -> Branch {
        match self {
            Node::Branch(b) => b,
            Node::Leaf(_) => panic!("expected a branch node"),
        }
    }

    /// Unwraps a leaf, or panics. Used where the caller has already
    /// established the node's kind.
    pub fn expect_leaf(self) -> Leaf {
        match self {
            Node::Leaf(l) => l,
            Node::Branch(_) => panic!("expected a leaf node"),
        }
    }
}

/// Bridges the trie layer to the node cache and persistent store.
///
/// `load_node` takes a shared lock internally (see `bullet-store`); write
/// paths (`cache_node`/`recache`/`delete_node`) take an exclusive lock.
/// This trait lets `bullet-trie`'s recursive operations stay storage
/// agnostic.
pub trait NodeAllocator {
    /// Loads the node at `id`, consulting the cache before the
    /// persistent store.
    fn load_node(&self, id: NodeId) -> TrieResult<Node>;

    /// Inserts `node` into the cache under `node.id()`. If this evicts
    /// another node, the evicted node is written back to the persistent
    /// store by the allocator (the write-back invariant), never here.
    fn cache_node(&self, node: Node);

    /// Moves a node from `old_id` to `new_id` in both the cache and the
    /// persistent store.
    fn recache(&self, old_id: NodeId, new_id: NodeId) -> TrieResult<()>;

    /// Removes the node at `id` from the cache (loading it first if
    /// necessary) and deletes it from the persistent store.
    fn delete_node(&self, id: NodeId) -> TrieResult<()>;

    /// Serialises and writes `node` under its current id.
    fn persist_node(&self, node: &Node) -> TrieResult<()>;

    /// Stores a value payload keyed by `Blake3(user_key)`.
    fn store_value(&self, key_hash: [u8; 32], value: &[u8]) -> TrieResult<()>;

    /// Deletes a value payload keyed by `Blake3(user_key)`. Not finding
    /// one is not an error (mirrors `prune`/`justify`'s "ignore
    /// NOT_FOUND" contract).
    fn delete_value(&self, key_hash: [u8; 32]) -> TrieResult<()>;
}
