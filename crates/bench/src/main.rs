//! CLI entry point for the non-inclusion proving benchmark.

use anyhow::Result;
use bench::{run, BenchParams, TracingReporter};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "noninc-bench", about = "Benchmark non-inclusion proof generation")]
struct Cli {
    /// Accumulator tree depth.
    #[arg(long, default_value_t = 24)]
    tree_depth: u32,

    /// Number of historical blocks covered by one proof.
    #[arg(long, default_value_t = 1)]
    num_blocks: u32,

    /// Height of the subtree asserted empty (covers 2^level leaves).
    #[arg(long, default_value_t = 2)]
    non_inclusion_level: u32,

    /// Print the full report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let params = BenchParams::new(cli.tree_depth, cli.num_blocks, cli.non_inclusion_level);
    tracing::info!(?params, "starting benchmark");

    let report = run(&params, &TracingReporter)?;
    tracing::info!(
        k = report.k,
        hash_invocations = report.hash_invocations,
        proof_len = report.proof_len,
        "benchmark complete"
    );
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
