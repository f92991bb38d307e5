//! Benchmark harness for the non-inclusion prover.
//!
//! Synthesizes a block history over a fresh tree, builds the witness, runs
//! key generation and proving, verifies the result, and reports per-stage
//! wall-clock timings through an injected sink. Underlying errors propagate
//! untouched: benchmark correctness is part of the measurement.

use std::fmt;
use std::time::{Duration, Instant};

use rand_core::OsRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use noninc::{prover, Block, CircuitShape, NonInclusionWitness, ProofError, WitnessError};
use smt::{Fr, SparseMerkleTree, TreeError};

/// Benchmark configuration. The proven claim is always anchored at leaf 0,
/// matching the prover's historical default workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchParams {
    pub tree_depth: u32,
    pub num_blocks: u32,
    pub non_inclusion_level: u32,
}

impl BenchParams {
    pub fn new(tree_depth: u32, num_blocks: u32, non_inclusion_level: u32) -> Self {
        Self { tree_depth, num_blocks, non_inclusion_level }
    }

    fn shape(&self) -> Result<CircuitShape, WitnessError> {
        CircuitShape::new(self.tree_depth, self.num_blocks, self.non_inclusion_level, 0)
    }
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Witness(#[from] WitnessError),
    #[error(transparent)]
    Proof(#[from] ProofError),
    /// A freshly produced proof failed verification; a defect, not a
    /// measurement.
    #[error("proof failed verification for {0:?}")]
    VerificationFailed(BenchParams),
}

/// Benchmark stage whose duration is reported separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Witness,
    Setup,
    Prove,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Witness => "witness",
            Stage::Setup => "setup",
            Stage::Prove => "prove",
            Stage::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Timing sink supplied by the caller. The harness never writes to a
/// console of its own accord.
pub trait Reporter: Sync {
    fn stage(&self, stage: Stage, elapsed: Duration);
}

/// Reporter that emits `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn stage(&self, stage: Stage, elapsed: Duration) {
        tracing::info!(stage = %stage, elapsed_ms = elapsed.as_secs_f64() * 1e3, "stage complete");
    }
}

/// Timings and shape data from one benchmark run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchReport {
    pub params: BenchParams,
    /// Log2 row count of the proving domain.
    pub k: u32,
    pub hash_invocations: u64,
    pub proof_len: usize,
    pub witness_secs: f64,
    pub setup_secs: f64,
    pub prove_secs: f64,
    pub verify_secs: f64,
}

/// Run one benchmark: block synthesis + witness, setup, prove, verify.
pub fn run(params: &BenchParams, reporter: &dyn Reporter) -> Result<BenchReport, BenchError> {
    let shape = params.shape()?;

    // Simulate block progression: each block stores one more value outside
    // the proven subtree, so every root is distinct and the claim stays
    // true across the whole window. At level == depth the claim covers the
    // entire tree and no value may be stored at all.
    let witness_start = Instant::now();
    let mut tree = SparseMerkleTree::new(params.tree_depth)?;
    let mut blocks = Vec::with_capacity(params.num_blocks as usize);
    let mut states = Vec::with_capacity(params.num_blocks as usize);
    for b in 0..params.num_blocks as u64 {
        if params.non_inclusion_level < params.tree_depth {
            let slice = 1u64 << params.non_inclusion_level;
            tree.set(slice + (b % slice), Fr::from(b + 1))?;
        }
        blocks.push(Block { sequence_number: b, root: tree.root() });
        states.push(tree.clone());
    }
    let witness =
        NonInclusionWitness::build(0, params.non_inclusion_level, &blocks, &states)?;
    let witness_elapsed = witness_start.elapsed();
    reporter.stage(Stage::Witness, witness_elapsed);

    let setup_start = Instant::now();
    let keys = prover::setup(shape)?;
    let setup_elapsed = setup_start.elapsed();
    reporter.stage(Stage::Setup, setup_elapsed);

    let prove_start = Instant::now();
    let proof = prover::prove(&keys, &witness, OsRng)?;
    let prove_elapsed = prove_start.elapsed();
    reporter.stage(Stage::Prove, prove_elapsed);

    let roots = witness.roots();
    let verify_start = Instant::now();
    let ok = prover::verify(&keys, &roots, &proof)?;
    let verify_elapsed = verify_start.elapsed();
    reporter.stage(Stage::Verify, verify_elapsed);
    if !ok {
        return Err(BenchError::VerificationFailed(*params));
    }

    Ok(BenchReport {
        params: *params,
        k: keys.k(),
        hash_invocations: shape.hash_invocations(),
        proof_len: proof.len(),
        witness_secs: witness_elapsed.as_secs_f64(),
        setup_secs: setup_elapsed.as_secs_f64(),
        prove_secs: prove_elapsed.as_secs_f64(),
        verify_secs: verify_elapsed.as_secs_f64(),
    })
}

/// Run several configurations in parallel. Each run owns its tree and key
/// pair, so runs only share the reporter.
pub fn run_many(
    params: &[BenchParams],
    reporter: &dyn Reporter,
) -> Result<Vec<BenchReport>, BenchError> {
    params.par_iter().map(|p| run(p, reporter)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingReporter(Mutex<Vec<(Stage, Duration)>>);

    impl Reporter for CollectingReporter {
        fn stage(&self, stage: Stage, elapsed: Duration) {
            self.0.lock().unwrap().push((stage, elapsed));
        }
    }

    #[test]
    fn small_run_reports_every_stage() {
        let reporter = CollectingReporter::default();
        let params = BenchParams::new(4, 2, 2);
        let report = run(&params, &reporter).expect("benchmark run");
        assert_eq!(report.hash_invocations, 4);
        assert!(report.proof_len > 0);
        assert!(report.prove_secs > 0.0);
        let stages: Vec<Stage> = reporter.0.lock().unwrap().iter().map(|(s, _)| *s).collect();
        assert_eq!(stages, vec![Stage::Witness, Stage::Setup, Stage::Prove, Stage::Verify]);
    }

    #[test]
    fn invalid_parameters_surface_as_typed_errors() {
        let reporter = CollectingReporter::default();
        for params in [
            BenchParams::new(0, 1, 1),
            BenchParams::new(4, 0, 1),
            BenchParams::new(4, 1, 0),
            BenchParams::new(4, 1, 5),
        ] {
            assert!(matches!(run(&params, &reporter), Err(BenchError::Witness(_))));
        }
    }

    #[test]
    fn whole_tree_level_runs_without_inserts() {
        let reporter = CollectingReporter::default();
        let report = run(&BenchParams::new(3, 2, 3), &reporter).expect("degenerate window");
        assert_eq!(report.hash_invocations, 0);
    }
}
