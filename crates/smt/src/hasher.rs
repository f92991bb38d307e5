//! Algebraic node hashing shared between the accumulator and the circuit.
//!
//! The concrete instance is Poseidon (`P128Pow5T3`, t = 3, rate = 2) over
//! the Pallas base field, exposed here through `halo2_gadgets`' off-circuit
//! primitives. The circuit crate folds the identical permutation through its
//! `Pow5Chip` gadget; any divergence between the two would silently break
//! proving, so node hashing is never hand-rolled anywhere else.

use ff::Field;
use halo2_gadgets::poseidon::primitives::{self as poseidon, ConstantLength, P128Pow5T3};

use crate::Fr;

/// Maximum supported tree depth. Bounds constraint counts to something a
/// single proof can realistically carry.
pub const MAX_DEPTH: u32 = 32;

/// Domain tag mixed into leaf preimages so a stored leaf value can never
/// collide with an interior node hash.
pub const DOMAIN_LEAF: u64 = 1;

/// Two-to-one algebraic hash at the accumulator's seam.
///
/// Implementations must be pure and total over the field: no runtime
/// failures for valid field elements.
pub trait Hasher {
    /// Interior node hash of two child hashes.
    fn compress(left: &Fr, right: &Fr) -> Fr;

    /// Leaf-domain hash of a stored value.
    fn hash_leaf(value: &Fr) -> Fr;

    /// Canonical empty leaf value.
    fn empty_leaf() -> Fr {
        Fr::ZERO
    }
}

/// Poseidon instance matching the in-circuit gadget.
#[derive(Clone, Copy, Debug, Default)]
pub struct PoseidonHasher;

impl Hasher for PoseidonHasher {
    fn compress(left: &Fr, right: &Fr) -> Fr {
        poseidon::Hash::<Fr, P128Pow5T3, ConstantLength<2>, 3, 2>::init().hash([*left, *right])
    }

    fn hash_leaf(value: &Fr) -> Fr {
        Self::compress(&Fr::from(DOMAIN_LEAF), value)
    }
}

/// Table of empty-subtree hashes: entry `h` is the hash of a fully empty
/// subtree of height `h`, for `0 <= h <= depth`.
pub fn empty_subtree_hashes<H: Hasher>(depth: u32) -> Vec<Fr> {
    let mut table = Vec::with_capacity(depth as usize + 1);
    table.push(H::hash_leaf(&H::empty_leaf()));
    for h in 0..depth as usize {
        let prev = table[h];
        table.push(H::compress(&prev, &prev));
    }
    table
}

/// Hash of a fully empty subtree of the given height.
pub fn empty_subtree_root<H: Hasher>(height: u32) -> Fr {
    empty_subtree_hashes::<H>(height)[height as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_is_deterministic_and_asymmetric() {
        let a = Fr::from(7u64);
        let b = Fr::from(11u64);
        assert_eq!(PoseidonHasher::compress(&a, &b), PoseidonHasher::compress(&a, &b));
        assert_ne!(PoseidonHasher::compress(&a, &b), PoseidonHasher::compress(&b, &a));
    }

    #[test]
    fn leaf_domain_is_separated_from_nodes() {
        let v = Fr::from(42u64);
        assert_ne!(PoseidonHasher::hash_leaf(&v), PoseidonHasher::compress(&v, &v));
    }

    #[test]
    fn empty_table_chains_by_self_compression() {
        let table = empty_subtree_hashes::<PoseidonHasher>(8);
        assert_eq!(table.len(), 9);
        assert_eq!(table[0], PoseidonHasher::hash_leaf(&Fr::ZERO));
        for h in 0..8 {
            assert_eq!(table[h + 1], PoseidonHasher::compress(&table[h], &table[h]));
        }
        assert_eq!(empty_subtree_root::<PoseidonHasher>(8), table[8]);
    }
}
