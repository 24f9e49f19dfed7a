//! Sidecar Factory
//!
//! Builds one [`BlobSidecar`] per blob. Every sidecar's inclusion proof is
//! composed in two stages:
//! 1. Commitment leaf → `blob_kzg_commitments` list root (data subtree plus
//!    the length mix-in)
//! 2. `blob_kzg_commitments` field root → block body root
//!
//! The stage 1 branch comes first. Its output root is the stage 2 leaf, so
//! the concatenation folds straight from the commitment to the body root.

use std::time::Instant;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::body::{
    body_root, leafify_commitments, BeaconBlock, BlockBody, CommitmentLeafifier, SszLeafifier,
};
use crate::chain_spec::ChainSpec;
use crate::merkle::{MerkleError, MerkleTree, MixinTree};
use crate::sidecar::{BlobSidecar, BlobSidecars, BlobsBundle};
use crate::telemetry;
use crate::types::{KzgCommitment, Root};

/// Errors that can occur while building sidecars.
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Bundle length mismatch: {blobs} blobs, {commitments} commitments, {proofs} proofs")]
    BundleLengthMismatch {
        blobs: usize,
        commitments: usize,
        proofs: usize,
    },

    #[error("Bundle commitment {index} does not match the block body")]
    CommitmentMismatch { index: usize },

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error("Block body field roots unavailable: {0}")]
    FieldRootUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SidecarError {
    pub(crate) fn field_root_unavailable<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::FieldRootUnavailable(Box::new(err))
    }

    /// Short label for logs and the `reason` metric label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BundleLengthMismatch { .. } => "bundle_length_mismatch",
            Self::CommitmentMismatch { .. } => "commitment_mismatch",
            Self::Merkle(MerkleError::CapacityExceeded { .. }) => "capacity_exceeded",
            Self::Merkle(MerkleError::IndexOutOfRange { .. }) => "index_out_of_range",
            Self::FieldRootUnavailable(_) => "field_root_unavailable",
        }
    }
}

/// Body data read once per build and shared read-only by every task.
struct ProofInputs {
    field_roots: Vec<Root>,
    commitment_leaves: Vec<Root>,
}

impl ProofInputs {
    fn read<B, L>(body: &B, leafifier: &L) -> Result<Self, SidecarError>
    where
        B: BlockBody + ?Sized,
        L: CommitmentLeafifier + ?Sized,
    {
        let field_roots = body
            .top_level_field_roots()
            .map_err(SidecarError::field_root_unavailable)?;
        let commitment_leaves = leafify_commitments(body.blob_kzg_commitments(), leafifier);
        Ok(Self {
            field_roots,
            commitment_leaves,
        })
    }
}

/// Builds blob sidecars for a chain configuration.
#[derive(Debug, Clone)]
pub struct SidecarFactory<C, L = SszLeafifier> {
    spec: C,
    leafifier: L,
}

impl<C: ChainSpec> SidecarFactory<C> {
    /// Factory using the SSZ commitment leaf encoding.
    #[must_use]
    pub const fn new(spec: C) -> Self {
        Self {
            spec,
            leafifier: SszLeafifier,
        }
    }
}

impl<C, L> SidecarFactory<C, L>
where
    C: ChainSpec,
    L: CommitmentLeafifier,
{
    /// Factory with a custom commitment leaf encoding.
    pub const fn with_leafifier(spec: C, leafifier: L) -> Self {
        Self { spec, leafifier }
    }

    pub const fn chain_spec(&self) -> &C {
        &self.spec
    }

    pub const fn leafifier(&self) -> &L {
        &self.leafifier
    }

    /// Build the sidecars for every blob in `bundle`.
    ///
    /// Proofs are built in parallel, one task per blob. Output is ordered by
    /// blob index. Any failure aborts the whole build; no partial result is
    /// returned.
    ///
    /// # Errors
    /// - [`SidecarError::BundleLengthMismatch`] if the bundle lists disagree
    /// - [`SidecarError::CommitmentMismatch`] if the bundle commitments are
    ///   not the body's commitments
    /// - [`SidecarError::FieldRootUnavailable`] if the body cannot be hashed
    /// - [`SidecarError::Merkle`] if a tree or proof cannot be built
    #[instrument(skip_all, fields(slot = block.slot, blobs = bundle.len()))]
    pub fn build_sidecars<B>(
        &self,
        block: &BeaconBlock<B>,
        bundle: &BlobsBundle,
    ) -> Result<BlobSidecars, SidecarError>
    where
        B: BlockBody,
        C: Sync,
        L: Sync,
    {
        telemetry::record_build_started();
        let start = Instant::now();

        match self.try_build_sidecars(block, bundle) {
            Ok(sidecars) => {
                let elapsed = start.elapsed();
                telemetry::record_build_succeeded(sidecars.len(), elapsed);
                debug!(
                    sidecars = sidecars.len(),
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Built blob sidecars"
                );
                Ok(sidecars)
            }
            Err(e) => {
                telemetry::record_build_failed(e.kind());
                warn!(error = %e, kind = e.kind(), "Failed to build blob sidecars");
                Err(e)
            }
        }
    }

    fn try_build_sidecars<B>(
        &self,
        block: &BeaconBlock<B>,
        bundle: &BlobsBundle,
    ) -> Result<BlobSidecars, SidecarError>
    where
        B: BlockBody,
        C: Sync,
        L: Sync,
    {
        bundle.validate()?;
        if bundle.is_empty() {
            return Ok(BlobSidecars::default());
        }
        check_commitments(block.body.blob_kzg_commitments(), &bundle.commitments)?;

        let inputs = ProofInputs::read(&block.body, &self.leafifier)?;
        let header = block.header_with_body_root(body_root(&inputs.field_roots, &self.spec)?);

        let sidecars = bundle
            .blobs
            .par_iter()
            .zip(bundle.commitments.par_iter())
            .zip(bundle.proofs.par_iter())
            .enumerate()
            .map(|(index, ((blob, commitment), proof))| {
                let index = index as u64;
                let inclusion_proof = self.inclusion_proof(&inputs, index)?;
                Ok(BlobSidecar::new(
                    index,
                    blob.clone(),
                    *commitment,
                    *proof,
                    header.clone(),
                    inclusion_proof,
                ))
            })
            .collect::<Result<Vec<_>, SidecarError>>()?;

        Ok(BlobSidecars::new(sidecars))
    }

    /// Full inclusion proof for the commitment at `index` in `body`.
    ///
    /// # Errors
    /// Returns an error if the body cannot be hashed or a proof cannot be
    /// built.
    pub fn build_inclusion_proof<B>(&self, body: &B, index: u64) -> Result<Vec<Root>, SidecarError>
    where
        B: BlockBody + ?Sized,
    {
        let inputs = ProofInputs::read(body, &self.leafifier)?;
        self.inclusion_proof(&inputs, index)
    }

    /// Stage 1: branch from commitment `index` to the commitments list root.
    ///
    /// # Errors
    /// Returns [`MerkleError::CapacityExceeded`] for too many commitments and
    /// [`MerkleError::IndexOutOfRange`] for an index beyond the list limit.
    pub fn build_commitment_proof(
        &self,
        commitments: &[KzgCommitment],
        index: u64,
    ) -> Result<Vec<Root>, MerkleError> {
        let leaves = leafify_commitments(commitments, &self.leafifier);
        self.commitment_proof(leaves, index)
    }

    /// Stage 2: branch from the commitments field root to the body root.
    ///
    /// # Errors
    /// Returns [`MerkleError::CapacityExceeded`] if there are more field
    /// roots than the body tree holds.
    pub fn build_block_body_proof(&self, field_roots: &[Root]) -> Result<Vec<Root>, MerkleError> {
        let tree = MerkleTree::build(field_roots.to_vec(), self.spec.body_length().saturating_sub(1))?;
        tree.proof(self.spec.kzg_commitment_field_position())
    }

    fn commitment_proof(&self, leaves: Vec<Root>, index: u64) -> Result<Vec<Root>, MerkleError> {
        let tree = MixinTree::build(leaves, self.spec.max_blob_commitments_per_block())?;
        tree.proof_with_mixin(index)
    }

    fn inclusion_proof(&self, inputs: &ProofInputs, index: u64) -> Result<Vec<Root>, SidecarError> {
        let mut proof = self.commitment_proof(inputs.commitment_leaves.clone(), index)?;
        proof.extend(self.build_block_body_proof(&inputs.field_roots)?);
        Ok(proof)
    }
}

fn check_commitments(body: &[KzgCommitment], bundle: &[KzgCommitment]) -> Result<(), SidecarError> {
    if let Some(index) = bundle.iter().zip(body).position(|(ours, theirs)| ours != theirs) {
        return Err(SidecarError::CommitmentMismatch { index });
    }
    if body.len() != bundle.len() {
        return Err(SidecarError::CommitmentMismatch {
            index: body.len().min(bundle.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{commitments_root, FieldRootsBody};
    use crate::chain_spec::ChainConfig;
    use crate::types::{Blob, KzgProof};
    use crate::verify::{is_valid_merkle_branch, verify_blob_sidecar_inclusion_proof};
    use proptest::prelude::*;

    fn small_spec() -> ChainConfig {
        ChainConfig {
            max_blob_commitments_per_block: 4,
            body_length: 8,
            kzg_commitment_field_position: 5,
        }
    }

    fn commitment(i: u8) -> KzgCommitment {
        let mut bytes = [i; 48];
        bytes[0] = 0xc0;
        KzgCommitment::new(bytes)
    }

    fn bundle_of(commitments: &[KzgCommitment]) -> BlobsBundle {
        BlobsBundle::new(
            (0..commitments.len()).map(|i| Blob::new(vec![i as u8; 64])).collect(),
            commitments.to_vec(),
            (0..commitments.len()).map(|i| KzgProof::new([i as u8; 48])).collect(),
        )
    }

    fn block_with(spec: &ChainConfig, commitments: &[KzgCommitment]) -> BeaconBlock<FieldRootsBody> {
        let mut field_roots: Vec<Root> = (0..spec.body_length as u8).map(|i| [i + 1; 32]).collect();
        field_roots[spec.kzg_commitment_field_position as usize] =
            commitments_root(commitments, spec, &SszLeafifier).unwrap();

        BeaconBlock {
            slot: 100,
            proposer_index: 7,
            parent_root: [0xaa; 32],
            state_root: [0xbb; 32],
            body: FieldRootsBody::new(field_roots, commitments.to_vec()),
        }
    }

    #[derive(Debug, Error)]
    #[error("field 3 cannot be hashed")]
    struct UnhashableField;

    struct FailingBody(Vec<KzgCommitment>);

    impl BlockBody for FailingBody {
        type Error = UnhashableField;

        fn top_level_field_roots(&self) -> Result<Vec<Root>, Self::Error> {
            Err(UnhashableField)
        }

        fn blob_kzg_commitments(&self) -> &[KzgCommitment] {
            &self.0
        }
    }

    #[test]
    fn test_two_commitments_small_spec() {
        let spec = small_spec();
        let commitments = [commitment(0), commitment(1)];
        let block = block_with(&spec, &commitments);
        let factory = SidecarFactory::new(spec);

        let sidecars = factory.build_sidecars(&block, &bundle_of(&commitments)).unwrap();

        assert_eq!(sidecars.len(), 2);
        for (i, sidecar) in sidecars.iter().enumerate() {
            assert_eq!(sidecar.index(), i as u64);
            assert_eq!(sidecar.inclusion_proof().len(), 6);
            assert_eq!(sidecar.commitment(), &commitments[i]);
            assert_eq!(sidecar.proof(), &KzgProof::new([i as u8; 48]));
            assert_eq!(sidecar.header().slot, 100);
            assert!(verify_blob_sidecar_inclusion_proof(sidecar, &spec, &SszLeafifier));
        }
    }

    #[test]
    fn test_stage_proofs_compose() {
        let spec = small_spec();
        let commitments = [commitment(0), commitment(1), commitment(2)];
        let block = block_with(&spec, &commitments);
        let factory = SidecarFactory::new(spec);

        let stage1 = factory.build_commitment_proof(&commitments, 2).unwrap();
        let stage2 = factory.build_block_body_proof(block.body.field_roots()).unwrap();
        assert_eq!(stage1.len(), 3);
        assert_eq!(stage2.len(), 3);

        // stage 2 alone proves the commitments root in the body
        let list_root = commitments_root(&commitments, &spec, &SszLeafifier).unwrap();
        let body = body_root(block.body.field_roots(), &spec).unwrap();
        assert!(is_valid_merkle_branch(list_root, &stage2, 3, 5, body));

        let full = factory.build_inclusion_proof(&block.body, 2).unwrap();
        assert_eq!(full, [stage1, stage2].concat());
    }

    #[test]
    fn test_empty_bundle_yields_no_sidecars() {
        let spec = small_spec();
        let block = block_with(&spec, &[]);
        let sidecars = SidecarFactory::new(spec)
            .build_sidecars(&block, &BlobsBundle::default())
            .unwrap();
        assert!(sidecars.is_empty());
    }

    #[test]
    fn test_length_mismatch_fails() {
        let spec = small_spec();
        let commitments = [commitment(0), commitment(1)];
        let block = block_with(&spec, &commitments);
        let mut bundle = bundle_of(&commitments);
        bundle.blobs.push(Blob::default());

        let err = SidecarFactory::new(spec).build_sidecars(&block, &bundle).unwrap_err();
        assert!(matches!(
            err,
            SidecarError::BundleLengthMismatch {
                blobs: 3,
                commitments: 2,
                proofs: 2
            }
        ));
        assert_eq!(err.kind(), "bundle_length_mismatch");
    }

    #[test]
    fn test_bundle_commitments_must_match_body() {
        let spec = small_spec();
        let block = block_with(&spec, &[commitment(0), commitment(1)]);
        let factory = SidecarFactory::new(spec);

        let swapped = bundle_of(&[commitment(0), commitment(9)]);
        let err = factory.build_sidecars(&block, &swapped).unwrap_err();
        assert!(matches!(err, SidecarError::CommitmentMismatch { index: 1 }));

        let short = bundle_of(&[commitment(0)]);
        let err = factory.build_sidecars(&block, &short).unwrap_err();
        assert!(matches!(err, SidecarError::CommitmentMismatch { index: 1 }));
    }

    #[test]
    fn test_field_root_failure_propagates() {
        let commitments = vec![commitment(0)];
        let block = BeaconBlock {
            slot: 1,
            proposer_index: 0,
            parent_root: [0; 32],
            state_root: [0; 32],
            body: FailingBody(commitments.clone()),
        };

        let err = SidecarFactory::new(small_spec())
            .build_sidecars(&block, &bundle_of(&commitments))
            .unwrap_err();
        assert_eq!(err.kind(), "field_root_unavailable");
        assert!(err.to_string().contains("field 3 cannot be hashed"));
    }

    #[test]
    fn test_too_many_commitments_fails_whole_build() {
        let spec = small_spec();
        let commitments: Vec<KzgCommitment> = (0..5).map(commitment).collect();
        let block = BeaconBlock {
            slot: 1,
            proposer_index: 0,
            parent_root: [0; 32],
            state_root: [0; 32],
            body: FieldRootsBody::new(vec![[0; 32]; 8], commitments.clone()),
        };

        let err = SidecarFactory::new(spec)
            .build_sidecars(&block, &bundle_of(&commitments))
            .unwrap_err();
        assert!(matches!(
            err,
            SidecarError::Merkle(MerkleError::CapacityExceeded { leaves: 5, max_leaves: 4 })
        ));
        assert_eq!(err.kind(), "capacity_exceeded");
    }

    #[test]
    fn test_list_limit_not_power_of_two() {
        let spec = ChainConfig {
            max_blob_commitments_per_block: 6,
            ..small_spec()
        };
        let commitments: Vec<KzgCommitment> = (0..7).map(commitment).collect();
        let block = BeaconBlock {
            slot: 1,
            proposer_index: 0,
            parent_root: [0; 32],
            state_root: [0; 32],
            body: FieldRootsBody::new(vec![[0; 32]; 8], commitments.clone()),
        };

        // 7 commitments fit the 8 padded slots but not the list limit
        let err = SidecarFactory::new(spec)
            .build_sidecars(&block, &bundle_of(&commitments))
            .unwrap_err();
        assert!(matches!(
            err,
            SidecarError::Merkle(MerkleError::CapacityExceeded { leaves: 7, max_leaves: 6 })
        ));
        assert!(commitments_root(&commitments, &spec, &SszLeafifier).is_err());

        // At the limit every sidecar verifies
        let block = block_with(&spec, &commitments[..6]);
        let sidecars = SidecarFactory::new(spec)
            .build_sidecars(&block, &bundle_of(&commitments[..6]))
            .unwrap();
        assert_eq!(sidecars.len(), 6);
        assert!(sidecars
            .iter()
            .all(|s| verify_blob_sidecar_inclusion_proof(s, &spec, &SszLeafifier)));
    }

    #[test]
    fn test_commitment_index_out_of_range() {
        let factory = SidecarFactory::new(small_spec());
        let err = factory.build_commitment_proof(&[commitment(0)], 4).unwrap_err();
        assert_eq!(err, MerkleError::IndexOutOfRange { index: 4, depth: 2 });
    }

    #[test]
    fn test_custom_leafifier() {
        let spec = small_spec();
        let leafifier = |c: &KzgCommitment| {
            let mut leaf = [0u8; 32];
            leaf.copy_from_slice(&c.as_bytes()[16..]);
            leaf
        };
        let commitments = [commitment(3)];
        let mut block = block_with(&spec, &commitments);
        let mut roots = block.body.field_roots().to_vec();
        roots[5] = commitments_root(&commitments, &spec, &leafifier).unwrap();
        block.body = FieldRootsBody::new(roots, commitments.to_vec());

        let factory = SidecarFactory::with_leafifier(spec, leafifier);
        let sidecars = factory.build_sidecars(&block, &bundle_of(&commitments)).unwrap();

        let sidecar = sidecars.get(0).unwrap();
        assert!(verify_blob_sidecar_inclusion_proof(sidecar, &spec, &leafifier));
        assert!(!verify_blob_sidecar_inclusion_proof(sidecar, &spec, &SszLeafifier));
    }

    #[test]
    fn test_build_is_deterministic() {
        let spec = ChainConfig::minimal();
        let commitments: Vec<KzgCommitment> = (0..32).map(commitment).collect();
        let block = block_with(&spec, &commitments);
        let bundle = bundle_of(&commitments);
        let factory = SidecarFactory::new(spec);

        let first = factory.build_sidecars(&block, &bundle).unwrap();
        for _ in 0..5 {
            assert_eq!(factory.build_sidecars(&block, &bundle).unwrap(), first);
        }
    }

    #[test]
    fn test_mainnet_proof_depth() {
        let spec = ChainConfig::mainnet();
        let commitments: Vec<KzgCommitment> = (0..6).map(commitment).collect();
        let block = block_with(&spec, &commitments);
        let sidecars = SidecarFactory::new(spec)
            .build_sidecars(&block, &bundle_of(&commitments))
            .unwrap();

        assert!(sidecars.iter().all(|s| s.inclusion_proof().len() == 17));
        assert!(sidecars
            .iter()
            .all(|s| verify_blob_sidecar_inclusion_proof(s, &spec, &SszLeafifier)));
    }

    #[test]
    fn test_tampered_proof_fails_verification() {
        let spec = small_spec();
        let commitments = [commitment(0), commitment(1)];
        let block = block_with(&spec, &commitments);
        let sidecars = SidecarFactory::new(spec)
            .build_sidecars(&block, &bundle_of(&commitments))
            .unwrap();

        let sidecar = sidecars.get(1).unwrap();
        let mut proof = sidecar.inclusion_proof().to_vec();
        proof[4] = [0xee; 32];
        let tampered = BlobSidecar::new(
            sidecar.index(),
            sidecar.blob().clone(),
            *sidecar.commitment(),
            *sidecar.proof(),
            sidecar.header().clone(),
            proof,
        );
        assert!(!verify_blob_sidecar_inclusion_proof(&tampered, &spec, &SszLeafifier));
    }

    proptest! {
        #[test]
        fn prop_every_sidecar_verifies(seeds in prop::collection::vec(any::<[u8; 32]>(), 0..=4)) {
            let spec = small_spec();
            let commitments: Vec<KzgCommitment> = seeds
                .iter()
                .map(|seed| {
                    let mut bytes = [0u8; 48];
                    bytes[..32].copy_from_slice(seed);
                    bytes[32..].copy_from_slice(&seed[..16]);
                    KzgCommitment::new(bytes)
                })
                .collect();
            let block = block_with(&spec, &commitments);

            let sidecars = SidecarFactory::new(spec)
                .build_sidecars(&block, &bundle_of(&commitments))
                .unwrap();

            prop_assert_eq!(sidecars.len(), commitments.len());
            for (i, sidecar) in sidecars.iter().enumerate() {
                prop_assert_eq!(sidecar.index(), i as u64);
                prop_assert_eq!(sidecar.inclusion_proof().len(), 6);
                prop_assert!(verify_blob_sidecar_inclusion_proof(sidecar, &spec, &SszLeafifier));
            }
        }
    }
}
