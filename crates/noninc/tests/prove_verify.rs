use noninc::{prove, setup, verify, Block, CircuitShape, NonInclusionWitness, Proof, ProofError};
use rand_core::OsRng;
use smt::{Fr, SparseMerkleTree};

/// Two block states over a depth-4 tree, both leaving the height-2 subtree
/// covering leaf 0b0101 empty.
fn window() -> (CircuitShape, NonInclusionWitness) {
    let shape = CircuitShape::new(4, 2, 2, 0b0101).unwrap();
    let mut tree = SparseMerkleTree::new(4).unwrap();
    let mut blocks = Vec::new();
    let mut trees = Vec::new();
    for b in 0u64..2 {
        tree.set(0b1000 + b, Fr::from(b + 7)).unwrap();
        blocks.push(Block { sequence_number: b, root: tree.root() });
        trees.push(tree.clone());
    }
    let witness = NonInclusionWitness::build(0b0101, 2, &blocks, &trees).unwrap();
    (shape, witness)
}

#[test]
fn round_trip_verifies() {
    let (shape, witness) = window();
    let keys = setup(shape).unwrap();
    let proof = prove(&keys, &witness, OsRng).unwrap();
    assert!(!proof.is_empty());
    assert!(verify(&keys, &witness.roots(), &proof).unwrap());
}

#[test]
fn tampered_root_verifies_false() {
    let (shape, witness) = window();
    let keys = setup(shape).unwrap();
    let proof = prove(&keys, &witness, OsRng).unwrap();
    for b in 0..2 {
        let mut roots = witness.roots();
        roots[b] += Fr::from(1u64);
        assert!(!verify(&keys, &roots, &proof).unwrap());
    }
}

#[test]
fn tampered_proof_bytes_verify_false() {
    let (shape, witness) = window();
    let keys = setup(shape).unwrap();
    let proof = prove(&keys, &witness, OsRng).unwrap();
    let mut bytes = proof.as_bytes().to_vec();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x01;
    assert!(!verify(&keys, &witness.roots(), &Proof::from_bytes(bytes)).unwrap());
}

#[test]
fn truncated_proof_verifies_false() {
    let (shape, witness) = window();
    let keys = setup(shape).unwrap();
    let proof = prove(&keys, &witness, OsRng).unwrap();
    let bytes = proof.as_bytes()[..proof.len() - 8].to_vec();
    assert!(!verify(&keys, &witness.roots(), &Proof::from_bytes(bytes)).unwrap());
}

#[test]
fn proving_with_foreign_keys_is_a_setup_mismatch() {
    let (_, witness) = window();
    let other = setup(CircuitShape::new(4, 1, 2, 0b0101).unwrap()).unwrap();
    assert!(matches!(
        prove(&other, &witness, OsRng),
        Err(ProofError::SetupMismatch(_))
    ));
}

#[test]
fn wrong_root_count_is_a_setup_mismatch() {
    let (shape, witness) = window();
    let keys = setup(shape).unwrap();
    let proof = prove(&keys, &witness, OsRng).unwrap();
    let roots = witness.roots();
    assert!(matches!(
        verify(&keys, &roots[..1], &proof),
        Err(ProofError::SetupMismatch(_))
    ));
}

#[test]
fn whole_tree_emptiness_has_a_zero_step_circuit() {
    // level == depth: the public root must be the empty root itself.
    let shape = CircuitShape::new(3, 1, 3, 0).unwrap();
    let tree = SparseMerkleTree::new(3).unwrap();
    let blocks = [Block { sequence_number: 0, root: tree.root() }];
    let witness = NonInclusionWitness::build(0, 3, &blocks, std::slice::from_ref(&tree)).unwrap();
    let keys = setup(shape).unwrap();
    let proof = prove(&keys, &witness, OsRng).unwrap();
    assert!(verify(&keys, &witness.roots(), &proof).unwrap());
}
