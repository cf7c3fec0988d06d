//! Shared cryptographic + storage context every Ledger operation threads
//! through: the KZG setup (SRS, the single NTT root table, and the
//! domain-separation tag) and the node allocator.
//!
//! `bullet-store`'s `Allocator` never touches the KZG setup at all
//! (write-back just re-serializes a `Node`), and every trie operation
//! that needs `roots`/`srs`/`tag` (`finalize`, `generate_proof`, ...)
//! already takes them as explicit parameters. So `Gadgets` here is a
//! plain owning struct, not an `Rc`/`Arc` cycle back into the allocator.

use bullet_kzg::{BRANCH_ORDER, NttRoots, Scalar, Srs};
use bullet_store::allocator::Allocator;
use bullet_store::kv::KvStore;

/// The KZG setup shared by every trie operation: the structured reference
/// string, the single `BRANCH_ORDER`-sized NTT root table, and the
/// domain-separation tag folded into every commitment-to-scalar hash.
pub struct KzgSettings {
    /// Structured reference string, sized for a `BRANCH_ORDER - 1` degree
    /// polynomial.
    pub srs: Srs,
    /// The one NTT root table used at every trie level; leaves zero-pad
    /// their shorter polynomials up to this same size rather than using a
    /// second, smaller table.
    pub roots: NttRoots,
    /// Domain-separation tag folded into `hash_p1_to_scalar`.
    pub tag: Vec<u8>,
}

impl KzgSettings {
    /// Builds the setup from a toxic-waste secret scalar and a tag. The
    /// secret is consumed by `Srs::new` and not retained here.
    pub fn new(secret: Scalar, tag: impl Into<Vec<u8>>) -> Self {
        KzgSettings {
            srs: Srs::new(BRANCH_ORDER - 1, secret),
            roots: bullet_kzg::ntt::build_roots(BRANCH_ORDER),
            tag: tag.into(),
        }
    }
}

/// The container a `Ledger` holds: the KZG setup and the node allocator.
pub struct Gadgets<S: KvStore> {
    /// The shared KZG setup.
    pub settings: KzgSettings,
    /// The node allocator backing every trie operation.
    pub alloc: Allocator<S>,
}

impl<S: KvStore> Gadgets<S> {
    /// Builds the gadgets container from an already-constructed setup and
    /// allocator.
    pub fn new(settings: KzgSettings, alloc: Allocator<S>) -> Self {
        Gadgets { settings, alloc }
    }
}
