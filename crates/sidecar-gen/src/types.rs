//! Blob and Header Types
//!
//! Opaque data-availability values handed over by the execution payload
//! producer, and the SSZ block header attached to every sidecar. Nothing in
//! this module interprets blob contents or KZG math.

use ssz_rs::prelude::*;

use crate::serde_hex;

/// A 32-byte Merkle node.
pub type Root = [u8; 32];

/// Size of a compressed KZG commitment.
pub const BYTES_PER_COMMITMENT: usize = 48;

/// Size of a compressed KZG opening proof.
pub const BYTES_PER_PROOF: usize = 48;

/// Size of a full blob (4096 field elements of 32 bytes).
pub const BYTES_PER_BLOB: usize = 131_072;

/// KZG commitment to a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct KzgCommitment(#[serde(with = "serde_hex::fixed")] [u8; BYTES_PER_COMMITMENT]);

impl KzgCommitment {
    #[must_use]
    pub const fn new(bytes: [u8; BYTES_PER_COMMITMENT]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BYTES_PER_COMMITMENT] {
        &self.0
    }
}

impl From<[u8; BYTES_PER_COMMITMENT]> for KzgCommitment {
    fn from(bytes: [u8; BYTES_PER_COMMITMENT]) -> Self {
        Self(bytes)
    }
}

/// KZG opening proof, passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct KzgProof(#[serde(with = "serde_hex::fixed")] [u8; BYTES_PER_PROOF]);

impl KzgProof {
    #[must_use]
    pub const fn new(bytes: [u8; BYTES_PER_PROOF]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BYTES_PER_PROOF] {
        &self.0
    }
}

impl From<[u8; BYTES_PER_PROOF]> for KzgProof {
    fn from(bytes: [u8; BYTES_PER_PROOF]) -> Self {
        Self(bytes)
    }
}

/// Blob payload. Never parsed; the length is not enforced here.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Blob(#[serde(with = "serde_hex::bytes")] Vec<u8>);

impl Blob {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Beacon block header
#[derive(
    Debug, Clone, Default, PartialEq, Eq, SimpleSerialize, serde::Serialize, serde::Deserialize,
)]
pub struct BeaconBlockHeader {
    /// Slot number
    pub slot: u64,
    /// Proposer validator index
    pub proposer_index: u64,
    /// Root of the parent block
    #[serde(with = "serde_hex::fixed")]
    pub parent_root: [u8; 32],
    /// Root of the beacon state
    #[serde(with = "serde_hex::fixed")]
    pub state_root: [u8; 32],
    /// Root of the block body
    #[serde(with = "serde_hex::fixed")]
    pub body_root: [u8; 32],
}

impl BeaconBlockHeader {
    /// SSZ hash tree root of the header, i.e. the block root.
    ///
    /// # Errors
    /// Returns the merkleization error reported by `ssz_rs`.
    pub fn block_root(&self) -> Result<Root, MerkleizationError> {
        Ok(self.hash_tree_root()?.into())
    }
}
