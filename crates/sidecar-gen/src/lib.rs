//! # Sidecar Generation Library
//!
//! Builds blob sidecars for a beacon block. Each sidecar carries a Merkle
//! branch proving its KZG commitment is part of the block body:
//! - commitment → `blob_kzg_commitments` list root (with length mix-in)
//! - `blob_kzg_commitments` → block body root
//!
//! The block body is only seen through [`BlockBody`]; KZG math is out of
//! scope, commitments and proofs are passed through untouched.

pub mod body;
pub mod chain_spec;
pub mod factory;
pub mod gindex;
pub mod merkle;
pub mod serde_hex;
pub mod sidecar;
pub mod telemetry;
pub mod types;
pub mod verify;

pub use body::{
    body_root, commitments_root, BeaconBlock, BlockBody, BodyAssemblyError, CommitmentLeafifier,
    FieldRootsBody, SszLeafifier,
};
pub use chain_spec::{preset, ChainConfig, ChainConfigError, ChainSpec};
pub use factory::{SidecarError, SidecarFactory};
pub use gindex::GindexCalculator;
pub use merkle::{MerkleError, MerkleTree, MixinTree};
pub use sidecar::{BlobSidecar, BlobSidecars, BlobsBundle};
pub use types::*;
pub use verify::{is_valid_merkle_branch, merkle_root_from_branch, verify_blob_sidecar_inclusion_proof};
