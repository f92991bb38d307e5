//! Typed failures for witness construction and proving.

use thiserror::Error;

/// Witness construction failures. All are caller errors except where noted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WitnessError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("leaf index {index} does not fit in {depth} bits")]
    InvalidIndex { index: u64, depth: u32 },

    /// The caller asked to prove a false statement: some block's tree holds
    /// a value inside the subtree claimed empty.
    #[error(
        "subtree of height {level} covering leaf {leaf_index} is not empty in block {sequence_number}"
    )]
    NotActuallyEmpty {
        sequence_number: u64,
        leaf_index: u64,
        level: u32,
    },
}

/// Proof generation and verification failures.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Key shape does not match the witness or public inputs.
    #[error("setup mismatch: {0}")]
    SetupMismatch(String),

    /// The witness does not satisfy the circuit. Witness construction
    /// validates the same predicate, so hitting this indicates an internal
    /// inconsistency between the tree, witness, and circuit encodings.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("proof backend failure: {0}")]
    Backend(#[from] halo2_proofs::plonk::Error),
}
