//! Sparse Merkle accumulator over an algebraic hash on the Pasta field domain.
//!
//! This crate provides the accumulator used by the non-inclusion prover: a
//! fixed-depth binary tree keyed by leaf index, with canonical empty-subtree
//! hashes per level so absent indices resolve without special-casing. The
//! node hash is the same Poseidon permutation the circuit crate folds
//! in-constraints, which is what makes off-circuit paths provable.

pub mod hasher;
pub mod tree;

use thiserror::Error;

pub use hasher::{empty_subtree_hashes, empty_subtree_root, Hasher, PoseidonHasher, MAX_DEPTH};
pub use tree::SparseMerkleTree;

/// Field element of the proof system's scalar field (Vesta's scalar, i.e.
/// the Pallas base field). All node values and circuit wires live here.
pub type Fr = pasta_curves::Fp;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// Depth is zero or exceeds [`MAX_DEPTH`].
    #[error("tree depth {0} is outside the supported range")]
    InvalidDepth(u32),
    /// Leaf or node index does not fit in the addressable range.
    #[error("index {index} does not fit in {bits} bits")]
    InvalidIndex { index: u64, bits: u32 },
}

/// One step of a Merkle path: the sibling hash and whether the current node
/// is the right child at this level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathElem {
    pub sibling: Fr,
    pub is_right: bool,
}

/// Sibling path ordered from the starting node up to the root.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MerklePath(pub Vec<PathElem>);

impl MerklePath {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold a starting node hash up through the path, returning the implied
    /// root. Iterative on purpose: path length is bounded by the tree depth
    /// and the loop shape mirrors the circuit's hash chain one-to-one.
    pub fn fold<H: Hasher>(&self, start: Fr) -> Fr {
        self.0.iter().fold(start, |cur, elem| {
            if elem.is_right {
                H::compress(&elem.sibling, &cur)
            } else {
                H::compress(&cur, &elem.sibling)
            }
        })
    }

    /// Node index encoded by the direction bits (bit i set iff the node is a
    /// right child at level i above the path's starting level).
    pub fn implied_index(&self) -> u64 {
        self.0
            .iter()
            .enumerate()
            .fold(0u64, |ix, (i, elem)| if elem.is_right { ix | (1 << i) } else { ix })
    }
}
