//! Blob sidecar records and the execution bundle they are built from.

use crate::serde_hex;
use crate::types::{BeaconBlockHeader, Blob, KzgCommitment, KzgProof, Root};
use crate::SidecarError;

/// Blobs, commitments and KZG proofs produced alongside an execution payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlobsBundle {
    pub blobs: Vec<Blob>,
    pub commitments: Vec<KzgCommitment>,
    pub proofs: Vec<KzgProof>,
}

impl BlobsBundle {
    #[must_use]
    pub fn new(blobs: Vec<Blob>, commitments: Vec<KzgCommitment>, proofs: Vec<KzgProof>) -> Self {
        Self {
            blobs,
            commitments,
            proofs,
        }
    }

    /// Number of blobs in the bundle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Check the three lists line up.
    ///
    /// # Errors
    /// Returns [`SidecarError::BundleLengthMismatch`] if the counts differ.
    pub fn validate(&self) -> Result<(), SidecarError> {
        let blobs = self.blobs.len();
        if blobs != self.commitments.len() || blobs != self.proofs.len() {
            return Err(SidecarError::BundleLengthMismatch {
                blobs,
                commitments: self.commitments.len(),
                proofs: self.proofs.len(),
            });
        }
        Ok(())
    }
}

/// One blob with its commitment, KZG proof and the branch tying the
/// commitment to the block body root.
///
/// Only the factory creates sidecars, so every instance carries an
/// inclusion proof of the configured depth.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlobSidecar {
    index: u64,
    blob: Blob,
    #[serde(rename = "kzg_commitment")]
    commitment: KzgCommitment,
    #[serde(rename = "kzg_proof")]
    proof: KzgProof,
    #[serde(rename = "block_header")]
    header: BeaconBlockHeader,
    #[serde(rename = "kzg_commitment_inclusion_proof", with = "serde_hex::roots")]
    inclusion_proof: Vec<Root>,
}

impl BlobSidecar {
    pub(crate) fn new(
        index: u64,
        blob: Blob,
        commitment: KzgCommitment,
        proof: KzgProof,
        header: BeaconBlockHeader,
        inclusion_proof: Vec<Root>,
    ) -> Self {
        Self {
            index,
            blob,
            commitment,
            proof,
            header,
            inclusion_proof,
        }
    }

    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    #[must_use]
    pub const fn blob(&self) -> &Blob {
        &self.blob
    }

    #[must_use]
    pub const fn commitment(&self) -> &KzgCommitment {
        &self.commitment
    }

    #[must_use]
    pub const fn proof(&self) -> &KzgProof {
        &self.proof
    }

    #[must_use]
    pub const fn header(&self) -> &BeaconBlockHeader {
        &self.header
    }

    /// Commitment-subtree siblings followed by body-subtree siblings.
    #[must_use]
    pub fn inclusion_proof(&self) -> &[Root] {
        &self.inclusion_proof
    }
}

/// Sidecars of one block, ordered by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct BlobSidecars(Vec<BlobSidecar>);

impl BlobSidecars {
    pub(crate) fn new(sidecars: Vec<BlobSidecar>) -> Self {
        Self(sidecars)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&BlobSidecar> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BlobSidecar> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<BlobSidecar> {
        self.0
    }
}

impl IntoIterator for BlobSidecars {
    type Item = BlobSidecar;
    type IntoIter = std::vec::IntoIter<BlobSidecar>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a BlobSidecars {
    type Item = &'a BlobSidecar;
    type IntoIter = std::slice::Iter<'a, BlobSidecar>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
