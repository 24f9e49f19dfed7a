//! Merkle branch verification.
//!
//! Folds a leaf up through a leaf-to-root branch, taking the current index
//! bit at each level to decide which side the running hash sits on.

use tracing::debug;

use crate::body::CommitmentLeafifier;
use crate::chain_spec::ChainSpec;
use crate::merkle::hash_pair;
use crate::sidecar::BlobSidecar;
use crate::types::Root;

/// Root obtained by folding `leaf` through `branch` at leaf position `index`.
///
/// Index bits above the branch length are ignored.
#[must_use]
pub fn merkle_root_from_branch(leaf: Root, branch: &[Root], index: u64) -> Root {
    let mut node = leaf;
    let mut index = index;
    for sibling in branch {
        node = if index & 1 == 0 {
            hash_pair(&node, sibling)
        } else {
            hash_pair(sibling, &node)
        };
        index >>= 1;
    }
    node
}

/// Check `branch` proves `leaf` at `index` in a tree of `depth` under `root`.
#[must_use]
pub fn is_valid_merkle_branch(
    leaf: Root,
    branch: &[Root],
    depth: u32,
    index: u64,
    root: Root,
) -> bool {
    if branch.len() != depth as usize {
        return false;
    }
    if depth < 64 && index >> depth != 0 {
        return false;
    }
    merkle_root_from_branch(leaf, branch, index) == root
}

/// Check a sidecar's commitment is included in the body its header names.
///
/// The first part of the branch reconstructs the commitments list root from
/// the commitment leaf; the rest carries that root up to `body_root`.
#[must_use]
pub fn verify_blob_sidecar_inclusion_proof<S, L>(
    sidecar: &BlobSidecar,
    spec: &S,
    leafifier: &L,
) -> bool
where
    S: ChainSpec + ?Sized,
    L: CommitmentLeafifier + ?Sized,
{
    let proof = sidecar.inclusion_proof();
    if proof.len() != spec.inclusion_proof_depth() as usize {
        debug!(
            index = sidecar.index(),
            len = proof.len(),
            "Inclusion proof has wrong length"
        );
        return false;
    }
    if sidecar.index() >= spec.max_blob_commitments_per_block() {
        return false;
    }

    let split = spec.commitment_subtree_depth() as usize;
    let (commitment_branch, body_branch) = proof.split_at(split);

    // the mix-in level always takes the left branch, so the index needs
    // no extra bit
    let leaf = leafifier.leaf(sidecar.commitment());
    let commitments_root = merkle_root_from_branch(leaf, commitment_branch, sidecar.index());

    is_valid_merkle_branch(
        commitments_root,
        body_branch,
        spec.body_subtree_depth(),
        spec.kzg_commitment_field_position(),
        sidecar.header().body_root,
    )
}
