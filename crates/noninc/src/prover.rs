//! Key generation, proving, and verification over the Pasta IPA backend.
//!
//! There is no trusted setup: `setup` derives the commitment parameters and
//! keys deterministically from the circuit shape. Proof creation takes an
//! injected randomness source. Keys are immutable after setup and safe to
//! share across concurrent prove/verify calls.

use halo2_proofs::{
    plonk::{self, keygen_pk, keygen_vk, ProvingKey, SingleVerifier, VerifyingKey},
    poly::commitment::Params,
    transcript::{Blake2bRead, Blake2bWrite, Challenge255},
};
use pasta_curves::EqAffine;
use rand_core::RngCore;
use smt::{Fr, PoseidonHasher};

use crate::circuit::{CircuitShape, NonInclusionCircuit};
use crate::errors::ProofError;
use crate::witness::NonInclusionWitness;

/// Proving and verifying key material for one circuit shape. Expensive to
/// create; cache per shape and reuse.
pub struct NonInclusionKeys {
    shape: CircuitShape,
    k: u32,
    params: Params<EqAffine>,
    pk: ProvingKey<EqAffine>,
}

impl NonInclusionKeys {
    pub fn shape(&self) -> &CircuitShape {
        &self.shape
    }

    /// Log2 row count of the evaluation domain.
    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn verifying_key(&self) -> &VerifyingKey<EqAffine> {
        self.pk.get_vk()
    }
}

/// Opaque succinct proof bound to a key shape and a set of public roots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof(Vec<u8>);

impl Proof {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One-time key generation for a circuit shape.
pub fn setup(shape: CircuitShape) -> Result<NonInclusionKeys, ProofError> {
    shape
        .validate()
        .map_err(|e| ProofError::InvalidParameters(e.to_string()))?;
    let k = shape.min_k();
    let params = Params::new(k);
    let circuit = NonInclusionCircuit::keygen(shape);
    let vk = keygen_vk(&params, &circuit)?;
    let pk = keygen_pk(&params, vk, &circuit)?;
    Ok(NonInclusionKeys { shape, k, params, pk })
}

/// Produce a proof for the witness under the given keys.
///
/// The witness is folded off-circuit against its public roots before the
/// backend runs: the backend prover does not check satisfiability, and an
/// inconsistent witness must fail loudly here rather than yield a proof
/// that verifies false.
pub fn prove(
    keys: &NonInclusionKeys,
    witness: &NonInclusionWitness,
    mut rng: impl RngCore,
) -> Result<Proof, ProofError> {
    let circuit = NonInclusionCircuit::from_witness(keys.shape, witness)?;
    let start = keys.shape.empty_start();
    for (block, path) in witness.blocks().iter().zip(witness.paths()) {
        if path.fold::<PoseidonHasher>(start) != block.root {
            return Err(ProofError::ConstraintViolation(format!(
                "path for block {} does not fold to its public root",
                block.sequence_number
            )));
        }
    }

    let roots = witness.roots();
    let mut transcript = Blake2bWrite::<_, EqAffine, Challenge255<_>>::init(vec![]);
    plonk::create_proof(
        &keys.params,
        &keys.pk,
        &[circuit],
        &[&[roots.as_slice()]],
        &mut rng,
        &mut transcript,
    )
    .map_err(|e| match e {
        plonk::Error::Synthesis => {
            ProofError::ConstraintViolation("circuit synthesis failed".into())
        }
        e => ProofError::Backend(e),
    })?;
    Ok(Proof(transcript.finalize()))
}

/// Check a proof against the public roots. Returns `Ok(false)` for any
/// tampered root, proof, or transcript; errors are reserved for inputs that
/// do not even match the key shape.
pub fn verify(
    keys: &NonInclusionKeys,
    roots: &[Fr],
    proof: &Proof,
) -> Result<bool, ProofError> {
    if roots.len() != keys.shape.num_blocks as usize {
        return Err(ProofError::SetupMismatch(format!(
            "{} public roots supplied but keys expect {}",
            roots.len(),
            keys.shape.num_blocks
        )));
    }
    let strategy = SingleVerifier::new(&keys.params);
    let mut transcript = Blake2bRead::<_, EqAffine, Challenge255<_>>::init(proof.as_bytes());
    Ok(plonk::verify_proof(
        &keys.params,
        keys.pk.get_vk(),
        strategy,
        &[&[roots]],
        &mut transcript,
    )
    .is_ok())
}
