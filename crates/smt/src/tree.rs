//! Fixed-depth sparse Merkle tree with lazy node resolution.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::hasher::{empty_subtree_hashes, Hasher, PoseidonHasher, MAX_DEPTH};
use crate::{Fr, MerklePath, PathElem, TreeError};

/// Sparse accumulator over `2^depth` leaf slots.
///
/// Only non-empty leaves are materialized; interior nodes are resolved level
/// by level on demand, falling back to the precomputed empty-subtree table
/// for untouched regions. `root` and `path_above` are pure functions of the
/// current leaf contents. Instances are not safe for concurrent mutation;
/// `Clone` is cheap and is the intended way to snapshot per-block states.
#[derive(Clone, Debug)]
pub struct SparseMerkleTree<H: Hasher = PoseidonHasher> {
    depth: u32,
    empty: Vec<Fr>,
    leaves: BTreeMap<u64, Fr>,
    _hasher: PhantomData<H>,
}

impl<H: Hasher> SparseMerkleTree<H> {
    /// Create an empty tree. Fails for depth zero or above [`MAX_DEPTH`].
    pub fn new(depth: u32) -> Result<Self, TreeError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(TreeError::InvalidDepth(depth));
        }
        Ok(Self {
            depth,
            empty: empty_subtree_hashes::<H>(depth),
            leaves: BTreeMap::new(),
            _hasher: PhantomData,
        })
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of addressable leaf slots.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Hash of a fully empty subtree of the given height.
    pub fn empty_hash_at(&self, height: u32) -> Fr {
        self.empty[height as usize]
    }

    /// Store a leaf value. The index must be exactly `depth` bits. Storing
    /// the canonical empty value is allowed and hashes identically to an
    /// absent leaf, so emptiness stays a derived property of the contents.
    pub fn set(&mut self, index: u64, value: Fr) -> Result<(), TreeError> {
        if index >= self.capacity() {
            return Err(TreeError::InvalidIndex { index, bits: self.depth });
        }
        self.leaves.insert(index, value);
        Ok(())
    }

    /// Stored value at a leaf slot, if any was set.
    pub fn get(&self, index: u64) -> Option<Fr> {
        self.leaves.get(&index).copied()
    }

    /// Current root, recomputed from the leaf contents.
    pub fn root(&self) -> Fr {
        let levels = self.levels();
        self.node(&levels, self.depth, 0)
    }

    /// Hash of the interior node at `height` with the given in-level index.
    pub fn subtree_root(&self, height: u32, index: u64) -> Result<Fr, TreeError> {
        if height > self.depth {
            return Err(TreeError::InvalidDepth(height));
        }
        let bits = self.depth - height;
        if bits < 64 && index >= (1u64 << bits) {
            return Err(TreeError::InvalidIndex { index, bits });
        }
        let levels = self.levels();
        Ok(self.node(&levels, height, index))
    }

    /// Sibling path from the node at `height`/`index` up to the root,
    /// `depth - height` elements long.
    pub fn path_above(&self, height: u32, index: u64) -> Result<MerklePath, TreeError> {
        if height > self.depth {
            return Err(TreeError::InvalidDepth(height));
        }
        let bits = self.depth - height;
        if bits < 64 && index >= (1u64 << bits) {
            return Err(TreeError::InvalidIndex { index, bits });
        }
        let levels = self.levels();
        let mut path = Vec::with_capacity(bits as usize);
        let mut ix = index;
        for h in height..self.depth {
            let sibling = self.node(&levels, h, ix ^ 1);
            path.push(PathElem { sibling, is_right: ix & 1 == 1 });
            ix >>= 1;
        }
        Ok(MerklePath(path))
    }

    /// Full sibling path for a leaf index.
    pub fn path_to(&self, index: u64) -> Result<MerklePath, TreeError> {
        self.path_above(0, index)
    }

    /// Reference path check: re-hash `value` through `path` and compare
    /// against the current root, also re-deriving the index from the
    /// direction bits.
    pub fn verify_path(&self, index: u64, value: Fr, path: &MerklePath) -> bool {
        path.len() == self.depth as usize
            && path.implied_index() == index
            && path.fold::<H>(H::hash_leaf(&value)) == self.root()
    }

    /// Occupied node hashes per level, bottom up. Level `h` holds only the
    /// nodes with at least one stored leaf below them.
    fn levels(&self) -> Vec<BTreeMap<u64, Fr>> {
        let mut levels: Vec<BTreeMap<u64, Fr>> = Vec::with_capacity(self.depth as usize + 1);
        levels.push(
            self.leaves
                .iter()
                .map(|(ix, value)| (*ix, H::hash_leaf(value)))
                .collect(),
        );
        for h in 0..self.depth as usize {
            let prev = &levels[h];
            let mut next = BTreeMap::new();
            for &ix in prev.keys() {
                let parent = ix >> 1;
                if next.contains_key(&parent) {
                    continue;
                }
                let left = prev.get(&(parent << 1)).copied().unwrap_or(self.empty[h]);
                let right = prev.get(&((parent << 1) | 1)).copied().unwrap_or(self.empty[h]);
                next.insert(parent, H::compress(&left, &right));
            }
            levels.push(next);
        }
        levels
    }

    fn node(&self, levels: &[BTreeMap<u64, Fr>], height: u32, index: u64) -> Fr {
        levels[height as usize]
            .get(&index)
            .copied()
            .unwrap_or(self.empty[height as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::empty_subtree_root;
    use ff::Field;

    fn tree(depth: u32) -> SparseMerkleTree {
        SparseMerkleTree::new(depth).expect("valid depth")
    }

    #[test]
    fn rejects_out_of_range_depths() {
        assert_eq!(
            SparseMerkleTree::<PoseidonHasher>::new(0).unwrap_err(),
            TreeError::InvalidDepth(0)
        );
        assert_eq!(
            SparseMerkleTree::<PoseidonHasher>::new(MAX_DEPTH + 1).unwrap_err(),
            TreeError::InvalidDepth(MAX_DEPTH + 1)
        );
    }

    #[test]
    fn empty_root_equals_empty_table_entry() {
        for depth in [1u32, 4, 8, 16] {
            let t = tree(depth);
            assert_eq!(t.root(), empty_subtree_root::<PoseidonHasher>(depth));
            assert_eq!(t.root(), t.empty_hash_at(depth));
        }
    }

    #[test]
    fn set_then_path_folds_back_to_root() {
        let mut t = tree(6);
        for (ix, v) in [(0u64, 3u64), (5, 17), (41, 9), (63, 1)] {
            t.set(ix, Fr::from(v)).unwrap();
        }
        let root = t.root();
        for (ix, v) in [(0u64, 3u64), (5, 17), (41, 9), (63, 1)] {
            let path = t.path_to(ix).unwrap();
            assert_eq!(path.len(), 6);
            assert_eq!(path.implied_index(), ix);
            assert_eq!(path.fold::<PoseidonHasher>(PoseidonHasher::hash_leaf(&Fr::from(v))), root);
            assert!(t.verify_path(ix, Fr::from(v), &path));
        }
    }

    #[test]
    fn absent_leaf_path_folds_from_empty_value() {
        let mut t = tree(5);
        t.set(7, Fr::from(100u64)).unwrap();
        let path = t.path_to(12).unwrap();
        assert_eq!(
            path.fold::<PoseidonHasher>(PoseidonHasher::hash_leaf(&Fr::ZERO)),
            t.root()
        );
        assert!(t.verify_path(12, Fr::ZERO, &path));
    }

    #[test]
    fn wrong_value_or_index_fails_reference_check() {
        let mut t = tree(4);
        t.set(9, Fr::from(2u64)).unwrap();
        let path = t.path_to(9).unwrap();
        assert!(!t.verify_path(9, Fr::from(3u64), &path));
        assert!(!t.verify_path(8, Fr::from(2u64), &path));
    }

    #[test]
    fn set_rejects_index_wider_than_depth() {
        let mut t = tree(4);
        assert_eq!(
            t.set(16, Fr::from(1u64)).unwrap_err(),
            TreeError::InvalidIndex { index: 16, bits: 4 }
        );
        assert!(t.path_to(16).is_err());
    }

    #[test]
    fn subtree_root_matches_manual_compression() {
        let mut t = tree(4);
        t.set(4, Fr::from(8u64)).unwrap();
        let left = t.subtree_root(1, 2).unwrap();
        let right = t.subtree_root(1, 3).unwrap();
        assert_eq!(
            t.subtree_root(2, 1).unwrap(),
            PoseidonHasher::compress(&left, &right)
        );
        // The untouched quarter of the tree resolves through the empty table.
        assert_eq!(t.subtree_root(2, 3).unwrap(), t.empty_hash_at(2));
        assert_eq!(t.subtree_root(4, 0).unwrap(), t.root());
    }

    #[test]
    fn overwriting_a_leaf_changes_the_root() {
        let mut t = tree(4);
        t.set(3, Fr::from(1u64)).unwrap();
        let before = t.root();
        t.set(3, Fr::from(2u64)).unwrap();
        assert_ne!(t.root(), before);
    }

    #[test]
    fn storing_the_empty_value_keeps_the_empty_root() {
        let mut t = tree(4);
        t.set(5, Fr::ZERO).unwrap();
        assert_eq!(t.root(), t.empty_hash_at(4));
    }

    #[test]
    fn path_above_is_the_truncated_leaf_path() {
        let mut t = tree(6);
        t.set(33, Fr::from(4u64)).unwrap();
        let full = t.path_to(33).unwrap();
        let above = t.path_above(2, 33 >> 2).unwrap();
        assert_eq!(above.len(), 4);
        assert_eq!(&full.0[2..], &above.0[..]);
        let start = t.subtree_root(2, 33 >> 2).unwrap();
        assert_eq!(above.fold::<PoseidonHasher>(start), t.root());
    }
}
