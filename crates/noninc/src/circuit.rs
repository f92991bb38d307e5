//! Halo2 circuit for the non-inclusion predicate.
//!
//! For each block in a fixed-size window the circuit folds the canonical
//! empty-subtree hash through `depth - level` Poseidon steps and pins the
//! result to the block's public root. Direction bits are derived from the
//! (public) leaf index and baked into the gate layout as hash operand order;
//! only the sibling values are witnessed. Constraint count is therefore a
//! function of the shape alone, never of tree contents.

use halo2_gadgets::poseidon::{
    primitives::{ConstantLength, P128Pow5T3},
    Hash as PoseidonHash, Pow5Chip, Pow5Config,
};
use halo2_proofs::{
    circuit::{Layouter, SimpleFloorPlanner, Value},
    plonk::{Advice, Circuit, Column, ConstraintSystem, Error, Instance},
};
use smt::{empty_subtree_root, Fr, PoseidonHasher, MAX_DEPTH};

use crate::errors::{ProofError, WitnessError};
use crate::witness::NonInclusionWitness;

/// Estimated region rows per Poseidon invocation, padded for sponge
/// bookkeeping. Used to size the evaluation domain.
const ROWS_PER_HASH: u64 = 96;
/// Fixed row overhead: constants, blinding, per-block assignments.
const FIXED_ROWS: u64 = 128;
/// Smallest domain the prover will use.
const MIN_K: u32 = 8;

/// Parameters that determine the circuit's gate layout and key shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircuitShape {
    pub tree_depth: u32,
    pub num_blocks: u32,
    /// Height of the subtree asserted empty; covers `2^level` leaves.
    pub level: u32,
    pub leaf_index: u64,
}

impl CircuitShape {
    pub fn new(
        tree_depth: u32,
        num_blocks: u32,
        level: u32,
        leaf_index: u64,
    ) -> Result<Self, WitnessError> {
        let shape = Self { tree_depth, num_blocks, level, leaf_index };
        shape.validate()?;
        Ok(shape)
    }

    pub fn validate(&self) -> Result<(), WitnessError> {
        if self.tree_depth == 0 || self.tree_depth > MAX_DEPTH {
            return Err(WitnessError::InvalidParameters(format!(
                "tree depth {} is outside [1, {MAX_DEPTH}]",
                self.tree_depth
            )));
        }
        if self.num_blocks == 0 {
            return Err(WitnessError::InvalidParameters("zero blocks".into()));
        }
        if self.level == 0 || self.level > self.tree_depth {
            return Err(WitnessError::InvalidParameters(format!(
                "non-inclusion level {} is outside [1, {}]",
                self.level, self.tree_depth
            )));
        }
        if self.leaf_index >= (1u64 << self.tree_depth) {
            return Err(WitnessError::InvalidIndex {
                index: self.leaf_index,
                depth: self.tree_depth,
            });
        }
        Ok(())
    }

    /// Hash steps per block.
    pub fn steps(&self) -> u32 {
        self.tree_depth - self.level
    }

    /// Total Poseidon invocations; the proving cost driver.
    pub fn hash_invocations(&self) -> u64 {
        self.num_blocks as u64 * self.steps() as u64
    }

    /// Operand order per step: `true` means the running hash is the right
    /// child at that level.
    pub fn direction_bits(&self) -> Vec<bool> {
        (self.level..self.tree_depth)
            .map(|h| (self.leaf_index >> h) & 1 == 1)
            .collect()
    }

    /// Folding start value: the empty-subtree hash at `level`.
    pub fn empty_start(&self) -> Fr {
        empty_subtree_root::<PoseidonHasher>(self.level)
    }

    /// Log2 of the row count the shape needs.
    pub fn min_k(&self) -> u32 {
        let rows = self.hash_invocations() * ROWS_PER_HASH + FIXED_ROWS;
        let k = rows.next_power_of_two().trailing_zeros();
        k.max(MIN_K)
    }
}

#[derive(Clone, Debug)]
pub struct NonInclusionConfig {
    poseidon: Pow5Config<Fr, 3, 2>,
    sibling: Column<Advice>,
    start: Column<Advice>,
    instance: Column<Instance>,
}

/// Circuit instance: shape plus one sibling column per block. Public inputs
/// are the block roots, one instance row per block.
#[derive(Clone, Debug)]
pub struct NonInclusionCircuit {
    shape: CircuitShape,
    empty_start: Fr,
    paths: Vec<Vec<Value<Fr>>>,
}

impl NonInclusionCircuit {
    /// Witness-free instance for key generation.
    pub fn keygen(shape: CircuitShape) -> Self {
        let blank = vec![vec![Value::unknown(); shape.steps() as usize]; shape.num_blocks as usize];
        Self { shape, empty_start: shape.empty_start(), paths: blank }
    }

    /// Instance carrying a concrete witness. Fails with `SetupMismatch` if
    /// the witness was built for a different shape.
    pub fn from_witness(
        shape: CircuitShape,
        witness: &NonInclusionWitness,
    ) -> Result<Self, ProofError> {
        if witness.tree_depth() != shape.tree_depth
            || witness.level() != shape.level
            || witness.leaf_index() != shape.leaf_index
            || witness.num_blocks() != shape.num_blocks
        {
            return Err(ProofError::SetupMismatch(format!(
                "witness built for (depth {}, blocks {}, level {}, leaf {}) but keys expect \
                 (depth {}, blocks {}, level {}, leaf {})",
                witness.tree_depth(),
                witness.num_blocks(),
                witness.level(),
                witness.leaf_index(),
                shape.tree_depth,
                shape.num_blocks,
                shape.level,
                shape.leaf_index,
            )));
        }
        let dirs = shape.direction_bits();
        let mut paths = Vec::with_capacity(witness.paths().len());
        for path in witness.paths() {
            if path.len() != shape.steps() as usize
                || path.0.iter().zip(&dirs).any(|(e, d)| e.is_right != *d)
            {
                return Err(ProofError::SetupMismatch(
                    "witness path disagrees with the shape's direction bits".into(),
                ));
            }
            paths.push(path.0.iter().map(|e| Value::known(e.sibling)).collect());
        }
        Ok(Self { shape, empty_start: shape.empty_start(), paths })
    }

    pub fn shape(&self) -> &CircuitShape {
        &self.shape
    }
}

impl Circuit<Fr> for NonInclusionCircuit {
    type Config = NonInclusionConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::keygen(self.shape)
    }

    fn configure(meta: &mut ConstraintSystem<Fr>) -> Self::Config {
        let state = [meta.advice_column(), meta.advice_column(), meta.advice_column()];
        let partial_sbox = meta.advice_column();
        let sibling = meta.advice_column();
        let start = meta.advice_column();
        let rc_a = [meta.fixed_column(), meta.fixed_column(), meta.fixed_column()];
        let rc_b = [meta.fixed_column(), meta.fixed_column(), meta.fixed_column()];
        meta.enable_constant(rc_b[0]);
        for column in [sibling, start] {
            meta.enable_equality(column);
        }
        let instance = meta.instance_column();
        meta.enable_equality(instance);

        let poseidon =
            Pow5Chip::<Fr, 3, 2>::configure::<P128Pow5T3>(meta, state, partial_sbox, rc_a, rc_b);
        NonInclusionConfig { poseidon, sibling, start, instance }
    }

    fn synthesize(
        &self,
        config: Self::Config,
        mut layouter: impl Layouter<Fr>,
    ) -> Result<(), Error> {
        let dirs = self.shape.direction_bits();
        for (b, path) in self.paths.iter().enumerate() {
            // The fold starts at the empty-subtree hash, pinned as a circuit
            // constant so the claim cannot be re-rooted by the witness.
            let mut cur = layouter.assign_region(
                || format!("block {b} start"),
                |mut region| {
                    let cell = region.assign_advice(
                        || "empty subtree hash",
                        config.start,
                        0,
                        || Value::known(self.empty_start),
                    )?;
                    region.constrain_constant(cell.cell(), self.empty_start)?;
                    Ok(cell)
                },
            )?;

            for (i, sibling) in path.iter().enumerate() {
                let sibling_cell = layouter.assign_region(
                    || format!("block {b} sibling {i}"),
                    |mut region| {
                        region.assign_advice(|| "sibling", config.sibling, 0, || *sibling)
                    },
                )?;
                let chip = Pow5Chip::construct(config.poseidon.clone());
                let hasher =
                    PoseidonHash::<Fr, Pow5Chip<Fr, 3, 2>, P128Pow5T3, ConstantLength<2>, 3, 2>::init(
                        chip,
                        layouter.namespace(|| format!("block {b} poseidon {i}")),
                    )?;
                let (left, right) = if dirs[i] {
                    (sibling_cell, cur)
                } else {
                    (cur, sibling_cell)
                };
                cur = hasher
                    .hash(layouter.namespace(|| format!("block {b} hash {i}")), [left, right])?;
            }

            layouter.constrain_instance(cur.cell(), config.instance, b)?;
        }
        Ok(())
    }
}
