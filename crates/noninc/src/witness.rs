//! Non-inclusion witness construction across a block history.

use smt::{Fr, MerklePath, PoseidonHasher, SparseMerkleTree};

use crate::errors::WitnessError;

/// Historical state commitment: an externally supplied fact, not computed
/// here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    pub sequence_number: u64,
    pub root: Fr,
}

/// Witness that the subtree of height `level` covering `leaf_index` is empty
/// in every block of the window. The same `(leaf_index, level)` pair is
/// replicated across all blocks so a single circuit instance amortizes the
/// whole range.
#[derive(Clone, Debug)]
pub struct NonInclusionWitness {
    leaf_index: u64,
    level: u32,
    tree_depth: u32,
    blocks: Vec<Block>,
    paths: Vec<MerklePath>,
}

impl NonInclusionWitness {
    /// Build the witness from per-block accumulator states.
    ///
    /// `trees` carries one state per entry in `blocks`, in the same order,
    /// and each supplied root must match its tree. If any block's tree holds
    /// a value inside the target subtree, construction fails with
    /// [`WitnessError::NotActuallyEmpty`] rather than producing an
    /// unprovable witness.
    pub fn build(
        leaf_index: u64,
        level: u32,
        blocks: &[Block],
        trees: &[SparseMerkleTree],
    ) -> Result<Self, WitnessError> {
        if blocks.is_empty() {
            return Err(WitnessError::InvalidParameters("empty block sequence".into()));
        }
        if blocks.len() != trees.len() {
            return Err(WitnessError::InvalidParameters(format!(
                "{} blocks but {} tree states",
                blocks.len(),
                trees.len()
            )));
        }
        let depth = trees[0].depth();
        if trees.iter().any(|t| t.depth() != depth) {
            return Err(WitnessError::InvalidParameters(
                "tree states have differing depths".into(),
            ));
        }
        if level == 0 || level > depth {
            return Err(WitnessError::InvalidParameters(format!(
                "non-inclusion level {level} is outside [1, {depth}]"
            )));
        }
        if leaf_index >= trees[0].capacity() {
            return Err(WitnessError::InvalidIndex { index: leaf_index, depth });
        }

        let subtree_index = leaf_index >> level;
        let mut paths = Vec::with_capacity(blocks.len());
        for (block, tree) in blocks.iter().zip(trees) {
            if tree.root() != block.root {
                return Err(WitnessError::InvalidParameters(format!(
                    "supplied root for block {} does not match its tree state",
                    block.sequence_number
                )));
            }
            let empty = tree.empty_hash_at(level);
            let actual = tree
                .subtree_root(level, subtree_index)
                .map_err(|e| WitnessError::InvalidParameters(e.to_string()))?;
            if actual != empty {
                return Err(WitnessError::NotActuallyEmpty {
                    sequence_number: block.sequence_number,
                    leaf_index,
                    level,
                });
            }
            let path = tree
                .path_above(level, subtree_index)
                .map_err(|e| WitnessError::InvalidParameters(e.to_string()))?;
            debug_assert_eq!(path.fold::<PoseidonHasher>(empty), block.root);
            paths.push(path);
        }

        Ok(Self { leaf_index, level, tree_depth: depth, blocks: blocks.to_vec(), paths })
    }

    pub fn leaf_index(&self) -> u64 {
        self.leaf_index
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn tree_depth(&self) -> u32 {
        self.tree_depth
    }

    pub fn num_blocks(&self) -> u32 {
        self.blocks.len() as u32
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Truncated sibling paths, one per block, each `depth - level` long.
    pub fn paths(&self) -> &[MerklePath] {
        &self.paths
    }

    /// Public inputs: the block roots, in window order.
    pub fn roots(&self) -> Vec<Fr> {
        self.blocks.iter().map(|b| b.root).collect()
    }
}
