//! Non-inclusion proofs over a sparse Merkle commit-chain history.
//!
//! Given a leaf index, a non-inclusion level, and a sequence of historical
//! block roots, this crate builds a witness showing the subtree covering the
//! leaf is empty in every block, encodes the statement as a Halo2 circuit
//! over the Pasta cycle, and produces/verifies succinct proofs with the IPA
//! commitment scheme. One proof amortizes the whole historical window.

pub mod circuit;
pub mod errors;
pub mod prover;
pub mod witness;

pub use circuit::{CircuitShape, NonInclusionCircuit};
pub use errors::{ProofError, WitnessError};
pub use prover::{prove, setup, verify, NonInclusionKeys, Proof};
pub use witness::{Block, NonInclusionWitness};
