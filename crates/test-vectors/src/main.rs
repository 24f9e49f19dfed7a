//! Test Vector Generator
//!
//! Generates JSON test vectors for blob sidecar inclusion proofs, for
//! consumers that verify proofs in another implementation.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use sidecar_gen::{
    commitments_root, BeaconBlock, Blob, BlobsBundle, ChainConfig, ChainSpec, FieldRootsBody,
    GindexCalculator, KzgCommitment, KzgProof, Root, SidecarFactory, SszLeafifier,
};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Mainnet,
    Minimal,
}

impl Preset {
    fn chain_config(self) -> ChainConfig {
        match self {
            Self::Mainnet => ChainConfig::mainnet(),
            Self::Minimal => ChainConfig::minimal(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Minimal => "minimal",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "generate-test-vectors")]
#[command(about = "Generate blob sidecar inclusion proof test vectors")]
struct Args {
    /// Output directory for test vectors
    #[arg(short, long, default_value = "test-vectors")]
    output: PathBuf,

    /// Chain preset
    #[arg(long, value_enum, default_value = "minimal")]
    preset: Preset,

    /// Number of blobs in the generated block
    #[arg(long, default_value = "4")]
    num_blobs: usize,

    /// Slot of the generated block
    #[arg(long, default_value = "1000")]
    slot: u64,
}

/// Test vector file format
#[derive(Debug, Serialize)]
struct TestVectorFile {
    /// Preset used (minimal or mainnet)
    preset: String,
    chain: ChainConfig,
    /// Body root every proof folds up to
    body_root: String,
    /// Root of the block header
    block_root: String,
    inclusion_proof_depth: u32,
    sidecars: Vec<TestSidecar>,
}

#[derive(Debug, Serialize)]
struct TestSidecar {
    index: u64,
    gindex: u64,
    commitment: String,
    inclusion_proof: Vec<String>,
}

fn hex_root(root: &Root) -> String {
    format!("0x{}", hex::encode(root))
}

/// Deterministic pseudo-random bytes derived from a label.
fn derive_bytes<const N: usize>(label: &str, index: usize) -> [u8; N] {
    let mut out = [0u8; N];
    for (i, chunk) in out.chunks_mut(32).enumerate() {
        let digest = Sha256::new()
            .chain_update(label.as_bytes())
            .chain_update((index as u64).to_le_bytes())
            .chain_update((i as u64).to_le_bytes())
            .finalize();
        chunk.copy_from_slice(&digest[..chunk.len()]);
    }
    out
}

fn build_vectors(args: &Args) -> Result<TestVectorFile> {
    let chain = args.preset.chain_config();
    chain.validate().context("Invalid chain config")?;

    let commitments: Vec<KzgCommitment> = (0..args.num_blobs)
        .map(|i| KzgCommitment::new(derive_bytes("commitment", i)))
        .collect();
    let bundle = BlobsBundle::new(
        (0..args.num_blobs)
            .map(|i| Blob::new(derive_bytes::<64>("blob", i).to_vec()))
            .collect(),
        commitments.clone(),
        (0..args.num_blobs)
            .map(|i| KzgProof::new(derive_bytes("proof", i)))
            .collect(),
    );

    let mut field_roots: Vec<Root> = (0..chain.body_length())
        .map(|i| derive_bytes("field", i as usize))
        .collect();
    let position = usize::try_from(chain.kzg_commitment_field_position())?;
    field_roots[position] = commitments_root(&commitments, &chain, &SszLeafifier)?;

    let block = BeaconBlock {
        slot: args.slot,
        proposer_index: 42,
        parent_root: derive_bytes("parent", 0),
        state_root: derive_bytes("state", 0),
        body: FieldRootsBody::assemble(field_roots, commitments, &chain, &SszLeafifier)?,
    };

    let header = block.header(&chain)?;
    let block_root = header
        .block_root()
        .map_err(|e| anyhow::anyhow!("Failed to hash header: {e:?}"))?;

    let sidecars = SidecarFactory::new(chain).build_sidecars(&block, &bundle)?;
    let sidecars = sidecars
        .iter()
        .map(|s| {
            let gindex = GindexCalculator::kzg_commitment_gindex(&chain, s.index())
                .context("Commitment gindex does not fit in a u64")?;
            Ok(TestSidecar {
                index: s.index(),
                gindex,
                commitment: format!("0x{}", hex::encode(s.commitment().as_bytes())),
                inclusion_proof: s.inclusion_proof().iter().map(hex_root).collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TestVectorFile {
        preset: args.preset.name().to_string(),
        chain,
        body_root: hex_root(&header.body_root),
        block_root: hex_root(&block_root),
        inclusion_proof_depth: chain.inclusion_proof_depth(),
        sidecars,
    })
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    tracing::info!(
        output = %args.output.display(),
        preset = args.preset.name(),
        blobs = args.num_blobs,
        "Generating test vectors"
    );

    // Ensure output directory exists
    std::fs::create_dir_all(&args.output)?;

    let vectors = build_vectors(&args)?;

    let output_path = args
        .output
        .join(format!("blob_sidecars_{}.json", args.preset.name()));
    let json = serde_json::to_string_pretty(&vectors)?;
    std::fs::write(&output_path, json)?;

    tracing::info!(
        path = %output_path.display(),
        sidecars = vectors.sidecars.len(),
        "Wrote test vectors"
    );

    Ok(())
}
