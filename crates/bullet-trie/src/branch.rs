//! Branch nodes: the fan-out layer of the trie, committed with a single
//! KZG polynomial over `[0, BRANCH_ORDER)`.

use crate::error::{TrieError, TrieResult};
use crate::node::{Node, NodeAllocator};
use crate::node_id::NodeId;
use bullet_kzg::scalar::{scalar_is_zero, zero_sk};
use bullet_kzg::{G1Point, NttRoots, Polynomial, Scalar, Srs, hash_p1_to_scalar};
use byteorder::{ByteOrder, LittleEndian};
use rayon::prelude::*;

/// Polynomial length / child fanout for a branch.
pub const BRANCH_ORDER: usize = bullet_kzg::BRANCH_ORDER;

/// A single child slot: an inclusive nibble range `[anchor, end]` folded
/// into one scalar contribution to the branch polynomial.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Child {
    /// First nibble this child owns.
    pub anchor: u8,
    /// Last nibble this child owns (inclusive). `anchor == end` for a
    /// non-split branch.
    pub end: u8,
    /// Folded scalar contributed to the branch polynomial for this range.
    /// Zero means "slot present but empty"; only non-zero is routable.
    pub sk: Scalar,
    /// Block that last touched this child.
    pub blk_id: u16,
}

impl Child {
    fn contains(&self, nib: u8) -> bool {
        self.anchor <= nib && nib <= self.end
    }
}

/// The write to apply once `descend_insert` reaches the target slot.
enum WriteOp {
    Put([u8; 32]),
    Replace([u8; 32], [u8; 32]),
    CreateAccount,
}

/// Splits `old_leaf` (whose recorded path diverges from `key` at byte
/// `div`) into a chain of branches, returning the top-most one. Every
/// intermediate branch and the two leaves are cached under `new_block_id`.
fn split_leaf(
    mut old_leaf: crate::leaf::Leaf,
    key: &[u8; 32],
    val_hash: [u8; 32],
    new_block_id: u16,
    div: usize,
    alloc: &impl NodeAllocator,
) -> TrieResult<Branch> {
    let level = old_leaf.id.level() as usize;
    let old_path = *old_leaf.path();

    let split_branch_id = NodeId::new(key, div as u8, new_block_id);
    let mut split_branch = Branch::new(split_branch_id);

    old_leaf.id = NodeId::new(&old_path, div as u8 + 1, new_block_id);
    split_branch.insert_child(old_path[div], new_block_id);

    let mut new_leaf = crate::leaf::Leaf::new(
        NodeId::new(key, div as u8 + 1, new_block_id),
        *key,
    );
    new_leaf.write_slot(key, val_hash, new_block_id, alloc)?;
    split_branch.insert_child(key[div], new_block_id);

    alloc.cache_node(Node::Leaf(old_leaf));
    alloc.cache_node(Node::Leaf(new_leaf));

    let mut top = split_branch;
    for lvl in (level..div).rev() {
        let branch_id = NodeId::new(key, lvl as u8, new_block_id);
        let mut branch = Branch::new(branch_id);
        branch.insert_child(key[lvl], new_block_id);
        alloc.cache_node(Node::Branch(top));
        top = branch;
    }
    Ok(top)
}

/// A branch node.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    /// This node's identity.
    pub id: NodeId,
    /// KZG commitment to the branch's folded-child polynomial.
    pub commit: G1Point,
    /// `true` iff one or more children delegate a nibble range to another
    /// shard.
    pub is_split: bool,
    /// Children, kept sorted by `anchor`, ranges never overlapping.
    pub children: Vec<Child>,
}

impl Branch {
    /// Builds an empty branch at `id`.
    pub fn new(id: NodeId) -> Branch {
        Branch {
            id,
            commit: bullet_kzg::point::identity_g1(),
            is_split: false,
            children: Vec::new(),
        }
    }

    /// `true` iff this branch has no children and should be deleted.
    pub fn should_delete(&self) -> bool {
        self.children.is_empty()
    }

    /// Linear scan returning the child whose range contains `nib`.
    pub fn get_child(&self, nib: u8) -> Option<&Child> {
        self.children.iter().find(|c| c.contains(nib))
    }

    fn get_child_mut(&mut self, nib: u8) -> Option<&mut Child> {
        self.children.iter_mut().find(|c| c.contains(nib))
    }

    /// Inserts a fresh single-nibble child for `nib`, or marks an existing
    /// child's slot routable under `block_id` if one already covers it.
    pub fn insert_child(&mut self, nib: u8, block_id: u16) {
        if let Some(child) = self.get_child_mut(nib) {
            child.blk_id = block_id;
            if scalar_is_zero(&child.sk) {
                let mut bytes = [0u8; 32];
                bytes[0] = 1;
                child.sk = bullet_kzg::scalar::scalar_from_le_bytes(&bytes);
            }
            return;
        }
        let child = Child {
            anchor: nib,
            end: nib,
            sk: zero_sk(),
            blk_id: block_id,
        };
        let pos = self
            .children
            .iter()
            .position(|c| c.anchor > nib)
            .unwrap_or(self.children.len());
        self.children.insert(pos, child);
        if let Some(slot) = self.children.get_mut(pos) {
            slot.sk = {
                let mut bytes = [0u8; 32];
                bytes[0] = 1;
                bullet_kzg::scalar::scalar_from_le_bytes(&bytes)
            };
        }
    }

    /// Removes the child covering `nib`, if any.
    pub fn delete_child(&mut self, nib: u8) {
        self.children.retain(|c| !c.contains(nib));
    }

    /// Builds the `NodeId` a child reached through `nib` lives at. Returns
    /// `None` if there is no routable child there.
    pub fn get_next_id(&self, nib: u8) -> Option<NodeId> {
        let child = self.get_child(nib)?;
        if scalar_is_zero(&child.sk) {
            return None;
        }
        let mut next = self.id;
        next.set_block_id(child.blk_id);
        next.set_child_nibble(nib);
        if !self.is_split {
            next.increment_level();
        }
        Some(next)
    }

    /// The nibble this branch reads from `key` at its own level, honouring
    /// the split-branch "same nibble as parent" rule.
    fn lookup_nibble(&self, key: &[u8; 32]) -> u8 {
        let level = self.id.level() as usize;
        if self.is_split {
            key[level.saturating_sub(1)]
        } else {
            key[level]
        }
    }

    fn recache_if_needed(&mut self, new_block_id: u16, alloc: &impl NodeAllocator) -> TrieResult<()> {
        if self.id.block_id() != new_block_id {
            let old_id = self.id;
            self.id.set_block_id(new_block_id);
            alloc.recache(old_id, self.id)?;
        }
        Ok(())
    }

    /// Recursively inserts/updates a value at `key[31] = val_idx`, creating
    /// leaves and branches as needed.
    pub fn put(
        &mut self,
        key: &[u8; 32],
        val_hash: [u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        self.descend_insert(key, new_block_id, alloc, WriteOp::Put(val_hash))
    }

    /// Recursively replaces a value, checking it currently equals
    /// `prev_val_hash`.
    pub fn replace(
        &mut self,
        key: &[u8; 32],
        val_hash: [u8; 32],
        prev_val_hash: [u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        self.descend_insert(
            key,
            new_block_id,
            alloc,
            WriteOp::Replace(val_hash, prev_val_hash),
        )
    }

    /// Recursively creates an account leaf at `key`, writing `key` itself
    /// (with its value-index byte already zeroed by the caller) into slot
    /// `0` as the account's own binding marker.
    pub fn create_account(
        &mut self,
        key: &[u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        self.descend_insert(key, new_block_id, alloc, WriteOp::CreateAccount)
    }

    /// Recursively removes a value slot.
    pub fn remove(
        &mut self,
        key: &[u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        self.descend_remove(key, new_block_id, alloc, |node, alloc| match node {
            Node::Leaf(leaf) => leaf.remove_slot(key, new_block_id, alloc),
            Node::Branch(branch) => branch.remove(key, new_block_id, alloc),
        })
    }

    /// Recursively deletes an account.
    pub fn delete_account(
        &mut self,
        key: &[u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        self.descend_remove(key, new_block_id, alloc, |node, alloc| match node {
            Node::Leaf(leaf) => leaf.delete_account(key, new_block_id, alloc),
            Node::Branch(branch) => branch.delete_account(key, new_block_id, alloc),
        })
    }

    fn descend_insert(
        &mut self,
        key: &[u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
        op: WriteOp,
    ) -> TrieResult<()> {
        let nib = self.lookup_nibble(key);
        let child_id = match self.get_next_id(nib) {
            Some(id) => id,
            None => {
                match op {
                    WriteOp::Replace(_, _) => return Err(TrieError::NotExist),
                    WriteOp::Put(val_hash) => {
                        let child_level = if self.is_split {
                            self.id.level()
                        } else {
                            self.id.level() + 1
                        };
                        let mut leaf = crate::leaf::Leaf::new(
                            NodeId::new(key, child_level, new_block_id),
                            *key,
                        );
                        leaf.write_slot(key, val_hash, new_block_id, alloc)?;
                        alloc.cache_node(Node::Leaf(leaf));
                    }
                    WriteOp::CreateAccount => {
                        let child_level = if self.is_split {
                            self.id.level()
                        } else {
                            self.id.level() + 1
                        };
                        let mut leaf = crate::leaf::Leaf::new(
                            NodeId::new(key, child_level, new_block_id),
                            *key,
                        );
                        leaf.write_slot(key, *key, new_block_id, alloc)?;
                        alloc.cache_node(Node::Leaf(leaf));
                    }
                }
                self.recache_if_needed(new_block_id, alloc)?;
                self.insert_child(nib, new_block_id);
                return Ok(());
            }
        };
        let node = alloc.load_node(child_id)?;
        match node {
            Node::Branch(mut branch) => {
                match op {
                    WriteOp::Put(val_hash) => branch.put(key, val_hash, new_block_id, alloc)?,
                    WriteOp::Replace(val_hash, prev) => {
                        branch.replace(key, val_hash, prev, new_block_id, alloc)?
                    }
                    WriteOp::CreateAccount => {
                        branch.create_account(key, new_block_id, alloc)?
                    }
                }
                alloc.cache_node(Node::Branch(branch));
            }
            Node::Leaf(mut leaf) => match leaf.matching_path(key) {
                None => {
                    match op {
                        WriteOp::Put(val_hash) => {
                            leaf.write_slot(key, val_hash, new_block_id, alloc)?
                        }
                        WriteOp::Replace(val_hash, prev) => {
                            leaf.replace_slot(key, val_hash, prev, new_block_id, alloc)?
                        }
                        WriteOp::CreateAccount => {
                            leaf.write_slot(key, *key, new_block_id, alloc)?
                        }
                    }
                    alloc.cache_node(Node::Leaf(leaf));
                }
                Some(div) => match op {
                    WriteOp::Replace(_, _) => return Err(TrieError::NotExist),
                    WriteOp::Put(val_hash) => {
                        let top = split_leaf(leaf, key, val_hash, new_block_id, div, alloc)?;
                        alloc.cache_node(Node::Branch(top));
                    }
                    WriteOp::CreateAccount => {
                        let top = split_leaf(leaf, key, *key, new_block_id, div, alloc)?;
                        alloc.cache_node(Node::Branch(top));
                    }
                },
            },
        }
        self.recache_if_needed(new_block_id, alloc)?;
        self.insert_child(nib, new_block_id);
        Ok(())
    }

    fn descend_remove(
        &mut self,
        key: &[u8; 32],
        new_block_id: u16,
        alloc: &impl NodeAllocator,
        op: impl FnOnce(&mut Node, &impl NodeAllocator) -> TrieResult<()>,
    ) -> TrieResult<()> {
        let nib = self.lookup_nibble(key);
        let child_id = self.get_next_id(nib).ok_or(TrieError::NotExist)?;
        let mut node = alloc.load_node(child_id)?;
        let result = op(&mut node, alloc);
        match result {
            Ok(()) => {
                alloc.cache_node(node);
                self.recache_if_needed(new_block_id, alloc)?;
                self.insert_child(nib, new_block_id);
                Ok(())
            }
            Err(TrieError::Deleted) => {
                self.recache_if_needed(new_block_id, alloc)?;
                self.delete_child(nib);
                if self.should_delete() {
                    alloc.delete_node(self.id)?;
                    Err(TrieError::Deleted)
                } else {
                    Ok(())
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Recursively descends to the leaf that would hold `key`, accumulating
    /// the per-child-range scalar arrays `Fxs`/`Cs` (leaf-to-root order is
    /// built by the caller appending after the recursive call returns) and
    /// setting `split_map`'s bit for this level when this branch is split.
    pub fn generate_proof(
        &self,
        key: &[u8; 32],
        fxs: &mut Vec<Polynomial>,
        cs: &mut Vec<G1Point>,
        split_map: &mut Vec<bool>,
        alloc: &impl NodeAllocator,
    ) -> TrieResult<()> {
        let nib = self.lookup_nibble(key);
        let child_id = self.get_next_id(nib).ok_or(TrieError::NotExist)?;
        let child = alloc.load_node(child_id)?;
        match child {
            Node::Leaf(leaf) => leaf.generate_proof(fxs, cs)?,
            Node::Branch(branch) => {
                branch.generate_proof(key, fxs, cs, split_map, alloc)?;
            }
        }

        let mut fx = vec![zero_sk(); BRANCH_ORDER];
        for c in &self.children {
            for i in c.anchor..=c.end {
                fx[i as usize] = c.sk;
            }
        }
        fxs.push(Polynomial::new(fx));
        cs.push(self.commit);

        let level = self.id.level() as usize;
        if self.is_split && level < split_map.len() {
            split_map[level] = true;
        }
        Ok(())
    }

    /// Finalizes children with `blk_id == block_id` whose range lies in
    /// `[start, end)`, folding their commitments into `self`'s children and
    /// optionally writing into a shared `Fx` accumulator or committing the
    /// branch polynomial into `out`. The per-child recursive work (the
    /// expensive KZG commit step) runs across `rayon`'s thread pool, since
    /// child ranges never overlap and each task only needs read access to
    /// `self` plus its own owned `Child` copy.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize(
        &mut self,
        shard_path: Option<&[u8; 32]>,
        block_id: u16,
        out: Option<&mut G1Point>,
        start: u16,
        end: u16,
        fx: Option<&mut [Scalar]>,
        tag: &[u8],
        roots: &NttRoots,
        srs: &Srs,
        alloc: &(impl NodeAllocator + Sync),
    ) -> TrieResult<()> {
        let self_id = self.id;
        let is_split = self.is_split;

        let targets: Vec<(usize, Child, NodeId)> = self
            .children
            .iter()
            .enumerate()
            .filter(|(_, child)| {
                child.blk_id == block_id
                    && !scalar_is_zero(&child.sk)
                    && (child.anchor as u16) < end
                    && (child.end as u16) >= start
            })
            .map(|(i, child)| {
                let mut next = self_id;
                next.set_block_id(child.blk_id);
                next.set_child_nibble(child.anchor);
                if !is_split {
                    next.increment_level();
                }
                (i, *child, next)
            })
            .collect();

        let results: Vec<TrieResult<(usize, Scalar)>> = targets
            .par_iter()
            .map(|&(i, child, next)| {
                let loaded = match alloc.load_node(next) {
                    Ok(n) => n,
                    Err(e) => {
                        if is_split {
                            if let Some(path) = shard_path {
                                if !next.cmp(path) {
                                    return Ok((i, child.sk));
                                }
                            }
                        }
                        return Err(e);
                    }
                };
                let child_commit = match loaded {
                    Node::Leaf(mut leaf) => {
                        leaf.finalize(block_id, tag, roots, srs, alloc)?;
                        let c = leaf.commit;
                        alloc.cache_node(Node::Leaf(leaf));
                        c
                    }
                    Node::Branch(mut branch) => {
                        branch.finalize(
                            shard_path,
                            block_id,
                            None,
                            0,
                            BRANCH_ORDER as u16,
                            None,
                            tag,
                            roots,
                            srs,
                            alloc,
                        )?;
                        let c = branch.commit;
                        alloc.cache_node(Node::Branch(branch));
                        c
                    }
                };
                Ok((i, hash_p1_to_scalar(&child_commit, tag)))
            })
            .collect();

        let mut fx = fx;
        for r in results {
            let (i, sk) = r?;
            self.children[i].sk = sk;
            if let Some(ref mut fx_buf) = fx {
                let c = self.children[i];
                for k in c.anchor..=c.end {
                    fx_buf[k as usize] = sk;
                }
            }
        }

        if fx.is_none() {
            if let Some(out) = out {
                let mut coeffs = vec![zero_sk(); BRANCH_ORDER];
                for c in &self.children {
                    for i in c.anchor..=c.end {
                        coeffs[i as usize] = c.sk;
                    }
                }
                bullet_kzg::ntt::inverse_fft_in_place(&mut coeffs, &roots.inv_roots);
                self.commit = srs.commit_g1(&Polynomial::new(coeffs));
                *out = self.commit;
            }
        }
        Ok(())
    }

    /// Recursively prunes every child touched by `block_id`, then deletes
    /// this node. Clears children.
    pub fn prune(&mut self, block_id: u16, alloc: &impl NodeAllocator) -> TrieResult<()> {
        for child in self.children.clone() {
            if child.blk_id != block_id {
                continue;
            }
            let mut next = self.id;
            next.set_block_id(block_id);
            next.set_child_nibble(child.anchor);
            if !self.is_split {
                next.increment_level();
            }
            match alloc.load_node(next) {
                Ok(Node::Leaf(mut leaf)) => leaf.prune(block_id, alloc)?,
                Ok(Node::Branch(mut branch)) => branch.prune(block_id, alloc)?,
                Err(TrieError::NotExist) | Err(TrieError::LoadNodeErr) => {}
                Err(e) => return Err(e),
            }
        }
        self.children.clear();
        match alloc.delete_node(self.id) {
            Ok(()) | Err(TrieError::NotExist) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Promotes this block's overlay children into canonical state
    /// (`block_id = 0`), recursing into each locally-held child. Returns
    /// `Err(Deleted)` if the branch ends up empty.
    pub fn justify(&mut self, _block_id: u16, alloc: &impl NodeAllocator) -> TrieResult<()> {
        let children = self.children.clone();
        for child in children {
            if child.blk_id == 0 {
                continue;
            }
            let mut next = self.id;
            next.set_block_id(child.blk_id);
            next.set_child_nibble(child.anchor);
            if !self.is_split {
                next.increment_level();
            }
            let result = match alloc.load_node(next) {
                Ok(Node::Leaf(mut leaf)) => leaf.justify(child.blk_id, alloc),
                Ok(Node::Branch(mut branch)) => branch.justify(child.blk_id, alloc),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) | Err(TrieError::Deleted) => {}
                Err(e) => return Err(e),
            }
            if let Some(slot) = self.get_child_mut(child.anchor) {
                slot.blk_id = 0;
            }
        }

        alloc.delete_node(self.id)?;
        if self.should_delete() {
            return Err(TrieError::Deleted);
        }
        self.id.set_block_id(0);
        alloc.cache_node(Node::Branch(self.clone()));
        Ok(())
    }

    /// `true` if `commit == commitment`, or the recursive descent along
    /// `key` confirms it. For an unreachable cross-shard child, compares
    /// the child's folded `sk` against `hash_p1_to_scalar(commitment, tag)`.
    pub fn commit_is_in_path(
        &self,
        key: &[u8; 32],
        commitment: &G1Point,
        tag: &[u8],
        alloc: &impl NodeAllocator,
    ) -> bool {
        if self.commit == *commitment {
            return true;
        }
        let nib = self.lookup_nibble(key);
        let child = match self.get_child(nib) {
            Some(c) => c,
            None => return false,
        };
        match self.get_next_id(nib) {
            Some(next) => match alloc.load_node(next) {
                Ok(Node::Leaf(leaf)) => leaf.commit == *commitment,
                Ok(Node::Branch(branch)) => branch.commit_is_in_path(key, commitment, tag, alloc),
                Err(_) => bullet_kzg::scalar::equal_scalars(
                    &child.sk,
                    &hash_p1_to_scalar(commitment, tag),
                ),
            },
            None => false,
        }
    }

    /// Writes this branch's serialized bytes (without the leading tag) to
    /// `out`.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.push(if self.is_split { 1 } else { 0 });
        out.extend_from_slice(&bullet_kzg::point::compress_g1(&self.commit));
        out.push(self.children.len() as u8);
        for c in &self.children {
            out.push(c.anchor);
            out.push(c.end);
            let mut sk_bytes = [0u8; 32];
            use ark_serialize::CanonicalSerialize;
            c.sk
                .serialize_compressed(&mut sk_bytes[..])
                .expect("scalar is 32 bytes");
            out.extend_from_slice(&sk_bytes);
            let mut blk = [0u8; 2];
            LittleEndian::write_u16(&mut blk, c.blk_id);
            out.extend_from_slice(&blk);
        }
    }

    /// Parses the bytes following the tag byte written by [`Branch::serialize`].
    pub fn deserialize(id: NodeId, bytes: &[u8]) -> TrieResult<Branch> {
        use ark_serialize::CanonicalDeserialize;
        if bytes.len() < 1 + 48 + 1 {
            return Err(TrieError::LoadNodeErr);
        }
        let is_split = bytes[0] != 0;
        let commit = bullet_kzg::point::decompress_g1(&bytes[1..49]).map_err(|_| TrieError::LoadNodeErr)?;
        let child_count = bytes[49] as usize;
        let mut children = Vec::with_capacity(child_count);
        let mut offset = 50;
        for _ in 0..child_count {
            if bytes.len() < offset + 1 + 1 + 32 + 2 {
                return Err(TrieError::LoadNodeErr);
            }
            let anchor = bytes[offset];
            let end = bytes[offset + 1];
            let sk = Scalar::deserialize_compressed(&bytes[offset + 2..offset + 34])
                .map_err(|_| TrieError::LoadNodeErr)?;
            let blk_id = LittleEndian::read_u16(&bytes[offset + 34..offset + 36]);
            children.push(Child {
                anchor,
                end,
                sk,
                blk_id,
            });
            offset += 36;
        }
        Ok(Branch {
            id,
            commit,
            is_split,
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bullet_kzg::scalar::scalar_from;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory double for [`NodeAllocator`]: no eviction, no write-back
    /// ordering, just enough to exercise recursive trie operations. Uses
    /// `Mutex` rather than `RefCell` so it is `Sync`, matching the
    /// production allocator's thread-safety contract (`finalize` fans its
    /// per-child work out across `rayon`).
    struct TestAllocator {
        cache: Mutex<HashMap<NodeId, Node>>,
        persisted: Mutex<HashMap<NodeId, Vec<u8>>>,
        values: Mutex<HashMap<[u8; 32], Vec<u8>>>,
    }

    impl TestAllocator {
        fn new() -> Self {
            TestAllocator {
                cache: Mutex::new(HashMap::new()),
                persisted: Mutex::new(HashMap::new()),
                values: Mutex::new(HashMap::new()),
            }
        }
    }

    impl NodeAllocator for TestAllocator {
        fn load_node(&self, id: NodeId) -> TrieResult<Node> {
            if let Some(n) = self.cache.lock().unwrap().get(&id) {
                return Ok(n.clone());
            }
            if let Some(bytes) = self.persisted.lock().unwrap().get(&id) {
                let node = Node::decode(id, bytes)?;
                self.cache.lock().unwrap().insert(id, node.clone());
                return Ok(node);
            }
            Err(TrieError::NotExist)
        }

        fn cache_node(&self, node: Node) {
            self.cache.lock().unwrap().insert(node.id(), node);
        }

        fn recache(&self, old_id: NodeId, new_id: NodeId) -> TrieResult<()> {
            let mut node = self
                .cache
                .lock()
                .unwrap()
                .remove(&old_id)
                .or_else(|| {
                    self.persisted
                        .lock()
                        .unwrap()
                        .remove(&old_id)
                        .and_then(|bytes| Node::decode(old_id, &bytes).ok())
                })
                .ok_or(TrieError::NotExistRecache)?;
            match &mut node {
                Node::Branch(b) => b.id = new_id,
                Node::Leaf(l) => l.id = new_id,
            }
            self.cache.lock().unwrap().insert(new_id, node);
            Ok(())
        }

        fn delete_node(&self, id: NodeId) -> TrieResult<()> {
            self.cache.lock().unwrap().remove(&id);
            self.persisted.lock().unwrap().remove(&id);
            Ok(())
        }

        fn persist_node(&self, node: &Node) -> TrieResult<()> {
            self.persisted
                .lock()
                .unwrap()
                .insert(node.id(), node.encode());
            Ok(())
        }

        fn store_value(&self, key_hash: [u8; 32], value: &[u8]) -> TrieResult<()> {
            self.values.lock().unwrap().insert(key_hash, value.to_vec());
            Ok(())
        }

        fn delete_value(&self, key_hash: [u8; 32]) -> TrieResult<()> {
            self.values.lock().unwrap().remove(&key_hash);
            Ok(())
        }
    }

    fn key(byte: u8) -> [u8; 32] {
        [byte; 32]
    }

    #[test]
    fn put_then_load_round_trips_through_the_allocator() {
        let alloc = TestAllocator::new();
        let mut root = Branch::new(NodeId::root(1));
        let k = key(5);
        root.put(&k, [9u8; 32], 1, &alloc).unwrap();

        let nib = k[0];
        let child_id = root.get_next_id(nib).unwrap();
        let loaded = alloc.load_node(child_id).unwrap().expect_leaf();
        assert_eq!(loaded.path(), &k);
    }

    #[test]
    fn finalize_commits_a_nonzero_polynomial() {
        let alloc = TestAllocator::new();
        let mut root = Branch::new(NodeId::root(1));
        let k = key(3);
        root.put(&k, [7u8; 32], 1, &alloc).unwrap();

        let roots = bullet_kzg::ntt::build_roots(BRANCH_ORDER);
        let srs = Srs::new(BRANCH_ORDER - 1, scalar_from(13));
        let mut out = bullet_kzg::point::identity_g1();
        root.finalize(
            None,
            1,
            Some(&mut out),
            0,
            BRANCH_ORDER as u16,
            None,
            b"TAG",
            &roots,
            &srs,
            &alloc,
        )
        .unwrap();
        assert_ne!(out, bullet_kzg::point::identity_g1());
        assert_eq!(root.commit, out);
    }

    #[test]
    fn generate_proof_accumulates_one_polynomial_per_level() {
        let alloc = TestAllocator::new();
        let mut root = Branch::new(NodeId::root(1));
        let k = key(11);
        root.put(&k, [4u8; 32], 1, &alloc).unwrap();

        let mut fxs = Vec::new();
        let mut cs = Vec::new();
        let mut split_map = vec![false; 32];
        root.generate_proof(&k, &mut fxs, &mut cs, &mut split_map, &alloc)
            .unwrap();
        assert_eq!(fxs.len(), 2);
        assert_eq!(cs.len(), 2);
    }

    #[test]
    fn serialize_round_trips_children() {
        let mut b = Branch::new(NodeId::root(1));
        b.insert_child(4, 1);
        b.insert_child(9, 1);
        let mut bytes = Vec::new();
        b.serialize(&mut bytes);
        let parsed = Branch::deserialize(b.id, &bytes).unwrap();
        assert_eq!(parsed, b);
    }

    #[test]
    fn remove_then_already_deleted() {
        let alloc = TestAllocator::new();
        let mut root = Branch::new(NodeId::root(1));
        let mut k = key(2);
        k[31] = 0;
        root.put(&k, [6u8; 32], 1, &alloc).unwrap();

        root.remove(&k, 1, &alloc).unwrap();
        let second = root.remove(&k, 1, &alloc);
        assert_eq!(second, Err(TrieError::AlreadyDeleted));
    }
}
