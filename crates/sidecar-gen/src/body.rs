//! Block Body Access
//!
//! The factory never looks inside a block body. It only needs the ordered
//! top-level field roots and the commitment list, which any body type can
//! expose through [`BlockBody`].

use std::convert::Infallible;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::chain_spec::ChainSpec;
use crate::merkle::{MerkleError, MerkleTree, MixinTree};
use crate::serde_hex;
use crate::types::{BeaconBlockHeader, KzgCommitment, Root};

/// Read access to the parts of a block body a sidecar commits to.
pub trait BlockBody {
    /// Failure to root-hash one of the body's fields.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Hash tree roots of the body's top-level fields, in schema order.
    ///
    /// # Errors
    /// Returns the implementation's error if any field cannot be hashed.
    fn top_level_field_roots(&self) -> Result<Vec<Root>, Self::Error>;

    /// The `blob_kzg_commitments` list.
    fn blob_kzg_commitments(&self) -> &[KzgCommitment];
}

impl<B: BlockBody + ?Sized> BlockBody for &B {
    type Error = B::Error;

    fn top_level_field_roots(&self) -> Result<Vec<Root>, Self::Error> {
        (**self).top_level_field_roots()
    }

    fn blob_kzg_commitments(&self) -> &[KzgCommitment] {
        (**self).blob_kzg_commitments()
    }
}

/// Reduces a commitment to the 32-byte leaf stored in the commitments tree.
pub trait CommitmentLeafifier {
    fn leaf(&self, commitment: &KzgCommitment) -> Root;
}

impl<F> CommitmentLeafifier for F
where
    F: Fn(&KzgCommitment) -> Root,
{
    fn leaf(&self, commitment: &KzgCommitment) -> Root {
        self(commitment)
    }
}

/// SSZ `hash_tree_root` of a `Bytes48`: the two 32-byte chunks of the
/// zero-padded commitment hashed together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SszLeafifier;

impl CommitmentLeafifier for SszLeafifier {
    fn leaf(&self, commitment: &KzgCommitment) -> Root {
        let bytes = commitment.as_bytes();
        let mut hasher = Sha256::new();
        hasher.update(&bytes[..32]);
        hasher.update(&bytes[32..]);
        hasher.update([0u8; 16]);
        hasher.finalize().into()
    }
}

/// Leaf encoding of every commitment, in list order.
pub fn leafify_commitments<L>(commitments: &[KzgCommitment], leafifier: &L) -> Vec<Root>
where
    L: CommitmentLeafifier + ?Sized,
{
    commitments.iter().map(|c| leafifier.leaf(c)).collect()
}

/// Hash tree root of the `blob_kzg_commitments` list.
///
/// # Errors
/// Returns [`MerkleError::CapacityExceeded`] if there are more commitments
/// than the chain allows.
pub fn commitments_root<S, L>(
    commitments: &[KzgCommitment],
    spec: &S,
    leafifier: &L,
) -> Result<Root, MerkleError>
where
    S: ChainSpec + ?Sized,
    L: CommitmentLeafifier + ?Sized,
{
    let leaves = leafify_commitments(commitments, leafifier);
    Ok(MixinTree::build(leaves, spec.max_blob_commitments_per_block())?.root())
}

/// Body root over the top-level field roots, using the same tree shape the
/// inclusion proof is built against.
///
/// # Errors
/// Returns [`MerkleError::CapacityExceeded`] if there are more field roots
/// than the body tree holds.
pub fn body_root<S>(field_roots: &[Root], spec: &S) -> Result<Root, MerkleError>
where
    S: ChainSpec + ?Sized,
{
    let tree = MerkleTree::build(field_roots.to_vec(), spec.body_length().saturating_sub(1))?;
    Ok(tree.root())
}

/// Failure to assemble a [`FieldRootsBody`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BodyAssemblyError {
    #[error("Body has {actual} field roots, expected {expected}")]
    FieldCount { expected: u64, actual: usize },

    #[error("Commitments root does not match body field {position}")]
    CommitmentsRootMismatch { position: u64 },

    #[error(transparent)]
    Merkle(#[from] MerkleError),
}

/// A body reduced to what sidecars need: its field roots and commitments.
///
/// This is the shape a remote builder or the JSON API hands over when the
/// full body type is not available.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldRootsBody {
    #[serde(with = "serde_hex::roots")]
    field_roots: Vec<Root>,
    blob_kzg_commitments: Vec<KzgCommitment>,
}

impl FieldRootsBody {
    /// Wrap field roots and commitments without checking them.
    #[must_use]
    pub fn new(field_roots: Vec<Root>, blob_kzg_commitments: Vec<KzgCommitment>) -> Self {
        Self {
            field_roots,
            blob_kzg_commitments,
        }
    }

    /// Wrap field roots and commitments, checking them with [`Self::check`].
    ///
    /// # Errors
    /// Same as [`Self::check`].
    pub fn assemble<S, L>(
        field_roots: Vec<Root>,
        blob_kzg_commitments: Vec<KzgCommitment>,
        spec: &S,
        leafifier: &L,
    ) -> Result<Self, BodyAssemblyError>
    where
        S: ChainSpec + ?Sized,
        L: CommitmentLeafifier + ?Sized,
    {
        let body = Self::new(field_roots, blob_kzg_commitments);
        body.check(spec, leafifier)?;
        Ok(body)
    }

    /// Check the field count and that the commitments hash to the root
    /// stored at the commitments position.
    ///
    /// # Errors
    /// Returns an error if the body does not match `spec`, or the
    /// commitments do not hash to the stored field root.
    pub fn check<S, L>(&self, spec: &S, leafifier: &L) -> Result<(), BodyAssemblyError>
    where
        S: ChainSpec + ?Sized,
        L: CommitmentLeafifier + ?Sized,
    {
        if self.field_roots.len() as u64 != spec.body_length() {
            return Err(BodyAssemblyError::FieldCount {
                expected: spec.body_length(),
                actual: self.field_roots.len(),
            });
        }

        let position = spec.kzg_commitment_field_position();
        let expected = commitments_root(&self.blob_kzg_commitments, spec, leafifier)?;
        let stored = usize::try_from(position)
            .ok()
            .and_then(|p| self.field_roots.get(p));
        if stored != Some(&expected) {
            return Err(BodyAssemblyError::CommitmentsRootMismatch { position });
        }
        Ok(())
    }

    #[must_use]
    pub fn field_roots(&self) -> &[Root] {
        &self.field_roots
    }
}

impl BlockBody for FieldRootsBody {
    type Error = Infallible;

    fn top_level_field_roots(&self) -> Result<Vec<Root>, Self::Error> {
        Ok(self.field_roots.clone())
    }

    fn blob_kzg_commitments(&self) -> &[KzgCommitment] {
        &self.blob_kzg_commitments
    }
}

/// A beacon block: header fields plus a body.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BeaconBlock<B> {
    pub slot: u64,
    pub proposer_index: u64,
    #[serde(with = "serde_hex::fixed")]
    pub parent_root: Root,
    #[serde(with = "serde_hex::fixed")]
    pub state_root: Root,
    pub body: B,
}

impl<B> BeaconBlock<B> {
    /// The block header for an already computed body root.
    #[must_use]
    pub fn header_with_body_root(&self, body_root: Root) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root,
        }
    }
}

impl<B: BlockBody> BeaconBlock<B> {
    /// The block header, hashing the body's field roots.
    ///
    /// # Errors
    /// Returns an error if the body cannot produce its field roots.
    pub fn header<S>(&self, spec: &S) -> Result<BeaconBlockHeader, crate::SidecarError>
    where
        S: ChainSpec + ?Sized,
    {
        let field_roots = self
            .body
            .top_level_field_roots()
            .map_err(crate::SidecarError::field_root_unavailable)?;
        Ok(self.header_with_body_root(body_root(&field_roots, spec)?))
    }
}
