//! Block lifecycle operations: finalize a block's overlay into a KZG
//! commitment, justify it into the canonical view, prune a losing
//! candidate, and prove/verify membership of a value against a
//! finalized root.
//!
//! Each function takes the block id directly rather than a block hash —
//! hash-to-id resolution happens once, at the call site, via
//! [`Ledger::get_block_id`].

use rayon::prelude::*;

use bullet_kzg::scalar::scalar_from_le_bytes;
use bullet_kzg::{G1Point, Polynomial, Scalar, batch_verify, derive_hash, hash_p1_to_scalar, prove_kzg};
use bullet_store::kv::KvStore;
use bullet_trie::{BRANCH_ORDER, Node, NodeAllocator, TrieError};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Ledger;

/// Descends the whole subtree under `block_id`, committing every node the
/// block touched and folding the commitments up into a new root
/// commitment. Returns the scalar derived from that root commitment (the
/// block's state root hash), as raw little-endian bytes.
pub fn finalize_block<S: KvStore>(ledger: &Ledger<S>, block_id: u16) -> LedgerResult<[u8; 32]> {
    let gadgets = ledger.gadgets();
    let mut root = ledger.get_root(block_id, 0)?.expect_branch();

    let mut root_commit = bullet_kzg::point::identity_g1();
    root.finalize(
        None,
        block_id,
        Some(&mut root_commit),
        0,
        BRANCH_ORDER as u16,
        None,
        &gadgets.settings.tag,
        &gadgets.settings.roots,
        &gadgets.settings.srs,
        &gadgets.alloc,
    )?;
    gadgets.alloc.cache_node(Node::Branch(root));

    let sk = hash_p1_to_scalar(&root_commit, &gadgets.settings.tag);
    Ok(bullet_kzg::scalar::scalar_to_le_bytes(&sk))
}

/// Deletes every node this losing block touched, including stored
/// values. A block id with no remaining footprint (already pruned, or
/// never written to) is a no-op, not an error — `Ledger::get_root`'s
/// copy-on-write fallback means "missing" and "empty" are the same state
/// here.
pub fn prune_block<S: KvStore>(ledger: &Ledger<S>, block_id: u16) -> LedgerResult<()> {
    let gadgets = ledger.gadgets();
    let mut root = ledger.get_root(block_id, 0)?.expect_branch();
    root.prune(block_id, &gadgets.alloc)?;
    Ok(())
}

/// Promotes `block_id`'s overlay into the canonical (`block_id = 0`)
/// view. A root left with no children after justification is reported as
/// success, not failure — the block simply emptied the trie.
pub fn justify_block<S: KvStore>(ledger: &Ledger<S>, block_id: u16) -> LedgerResult<()> {
    let gadgets = ledger.gadgets();
    let mut root = ledger.get_root(block_id, 0)?.expect_branch();
    match root.justify(block_id, &gadgets.alloc) {
        Ok(()) => Ok(()),
        Err(TrieError::Deleted) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// A KZG opening proof that `key_hash`'s value equals some hash, anchored
/// to `block_id`'s root commitment.
///
/// `commitments[0]` and `commitments[1]` both equal the leaf's own
/// commitment (evaluated at two different points — the full-key binding
/// and the value slot itself), so `commitments.len() == proofs.len()`
/// even though the trie only holds one commitment per level.
pub struct Proof {
    pub commitments: Vec<G1Point>,
    pub proofs: Vec<G1Point>,
}

/// Builds the opening proof chain for `key_hash` against `block_id`'s
/// root: one KZG proof per trie level plus one extra proof binding the
/// leaf commitment to the full key.
pub fn generate_proof<S: KvStore>(
    ledger: &Ledger<S>,
    key_hash: &[u8; 32],
    block_id: u16,
) -> LedgerResult<Proof> {
    if !ledger.in_shard(key_hash) {
        return Err(LedgerError::NotInShard);
    }
    let gadgets = ledger.gadgets();
    let root = ledger.get_root(block_id, 0)?.expect_branch();

    let mut fxs: Vec<Polynomial> = Vec::with_capacity(6);
    let mut cs: Vec<G1Point> = Vec::with_capacity(6);
    let mut split_map = vec![false; 32];
    root.generate_proof(key_hash, &mut fxs, &mut cs, &mut split_map, &gadgets.alloc)?;

    let n = fxs.len();
    let roots = &gadgets.settings.roots;
    let srs = &gadgets.settings.srs;

    let leaf_key_proof = prove_kzg(&fxs[0].0, 0, roots, srs)?;
    let rest: Vec<G1Point> = (0..n)
        .into_par_iter()
        .map(|i| {
            let nib = if i == 0 {
                key_hash[31]
            } else {
                key_hash[(n - 1) - i]
            };
            prove_kzg(&fxs[i].0, nib as usize, roots, srs)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut proofs = Vec::with_capacity(n + 1);
    proofs.push(leaf_key_proof);
    proofs.extend(rest);

    let mut commitments = Vec::with_capacity(n + 1);
    commitments.push(cs[0]);
    commitments.extend(cs);

    Ok(Proof { commitments, proofs })
}

/// Derives the `(z, y)` opening-point pairs a [`Proof`] claims, per
/// level: level `0` is the full-key binding (`z = 0`, `y = key_hash` with
/// its value-index byte zeroed); level `1` is the value slot itself
/// (`z = val_idx`, `y = val_hash`); every level above folds the previous
/// level's commitment into `y` (`y = H(C_{k-1})`) and reads its own
/// routing nibble out of `key_hash` for `z`.
pub fn derive_zs_ys<S: KvStore>(
    ledger: &Ledger<S>,
    key_hash: &[u8; 32],
    val_hash: &[u8; 32],
    proof: &Proof,
) -> LedgerResult<(Vec<Scalar>, Vec<Scalar>)> {
    let n = proof.proofs.len();
    if proof.commitments.len() != n {
        return Err(LedgerError::RootErr);
    }
    let gadgets = ledger.gadgets();
    let tag = &gadgets.settings.tag;
    let roots = &gadgets.settings.roots.roots;

    let mut zs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n);

    for k in 0..n {
        if k == 0 {
            zs.push(roots[0]);
            let mut key_hash_c = *key_hash;
            key_hash_c[31] = 0;
            ys.push(scalar_from_le_bytes(&key_hash_c));
        } else if k == 1 {
            zs.push(roots[key_hash[31] as usize]);
            ys.push(scalar_from_le_bytes(val_hash));
        } else {
            let nib = key_hash[(n - 1) - k];
            zs.push(roots[nib as usize]);
            ys.push(hash_p1_to_scalar(&proof.commitments[k - 1], tag));
        }
    }
    Ok((zs, ys))
}

/// `true` iff `proof` is a valid opening of `val_hash` at `key_hash`
/// against `block_id`'s root commitment, checked via a single batched
/// pairing.
pub fn valid_proof<S: KvStore>(
    ledger: &Ledger<S>,
    proof: &Proof,
    key_hash: &[u8; 32],
    val_hash: &[u8; 32],
) -> LedgerResult<bool> {
    let (zs, ys) = derive_zs_ys(ledger, key_hash, val_hash, proof)?;
    let gadgets = ledger.gadgets();
    let base_hash = derive_hash(&gadgets.settings.tag);
    Ok(batch_verify(
        &proof.proofs,
        &proof.commitments,
        &zs,
        &ys,
        &base_hash,
        &gadgets.settings.srs,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gadgets::{Gadgets, KzgSettings};
    use bullet_kzg::scalar::scalar_from;
    use bullet_store::allocator::Allocator;
    use bullet_store::mock_db::MockDb;
    use std::sync::Arc;

    fn test_ledger() -> Ledger<MockDb> {
        let settings = KzgSettings::new(scalar_from(13), b"TAG".to_vec());
        let alloc = Allocator::new(Arc::new(MockDb::new()), 64);
        let gadgets = Arc::new(Gadgets::new(settings, alloc));
        Ledger::new(gadgets, Vec::new())
    }

    #[test]
    fn finalize_then_prove_and_verify_round_trips() {
        let mut ledger = test_ledger();
        let key = b"alice";
        let value = b"balance:100";
        let val_hash = bullet_kzg::derive_kv_hash(key, value);
        ledger.db_store_value(key, value).unwrap();

        let block_hash = [7u8; 32];
        let prev_hash = [0u8; 32];
        ledger.create_account(key, &block_hash, &prev_hash).unwrap();
        ledger
            .put(key, val_hash, 7, &block_hash, &prev_hash)
            .unwrap();
        let block_id = ledger.get_block_id(&block_hash, false);

        let root_hash = finalize_block(&ledger, block_id).unwrap();
        assert_ne!(root_hash, [0u8; 32]);

        justify_block(&ledger, block_id).unwrap();

        let mut key_hash = bullet_kzg::derive_hash(key);
        key_hash[31] = 7;
        let proof = generate_proof(&ledger, &key_hash, 0).unwrap();
        assert_eq!(proof.commitments.len(), proof.proofs.len());

        assert!(valid_proof(&ledger, &proof, &key_hash, &val_hash).unwrap());

        let wrong_val_hash = bullet_kzg::derive_kv_hash(key, b"balance:999");
        assert!(!valid_proof(&ledger, &proof, &key_hash, &wrong_val_hash).unwrap());
    }

    #[test]
    fn prune_of_empty_block_is_a_no_op() {
        let ledger = test_ledger();
        prune_block(&ledger, 5).unwrap();
    }
}
