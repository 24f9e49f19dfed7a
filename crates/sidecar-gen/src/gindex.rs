//! Generalized Index Computation
//!
//! Computes generalized indices (gindices) for the commitment inclusion
//! proof. A sidecar's proof is a plain Merkle branch for the gindex
//! returned by [`GindexCalculator::kzg_commitment_gindex`], rooted at the
//! block body.

use crate::chain_spec::ChainSpec;
use crate::merkle::depth_for;

/// Calculator for generalized indices in the block body tree
#[derive(Debug, Clone, Copy)]
pub struct GindexCalculator;

impl GindexCalculator {
    /// For a `List`, the data root is the left child of the list root
    /// (gindex 2) and the length mix-in the right child (gindex 3).
    const LIST_DATA_GINDEX: u64 = 2;

    /// Compute gindex for `body.blob_kzg_commitments[index]` from the body root
    ///
    /// Path: body → blob_kzg_commitments → data root → [index]
    ///
    /// Returns `None` if the gindex does not fit in a `u64`.
    #[must_use]
    pub fn kzg_commitment_gindex<S: ChainSpec + ?Sized>(spec: &S, index: u64) -> Option<u64> {
        let commitments_in_body = 1_u64
            .checked_shl(spec.body_subtree_depth())?
            .checked_add(spec.kzg_commitment_field_position())?;

        let element_in_data = 1_u64
            .checked_shl(depth_for(spec.max_blob_commitments_per_block()))?
            .checked_add(index)?;

        Self::concat_gindices(&[commitments_in_body, Self::LIST_DATA_GINDEX, element_in_data])
    }

    /// Concatenate generalized indices along a path
    ///
    /// Given a sequence of gindices representing a path through nested structures,
    /// compute the final gindex from the outermost root. Returns `None` if the
    /// result does not fit in a `u64`.
    #[must_use]
    pub fn concat_gindices(gindices: &[u64]) -> Option<u64> {
        let mut result = 1_u64; // Start at root

        for &gindex in gindices {
            let depth = Self::gindex_depth(gindex);
            let anchor = 1_u64 << depth;
            result = result.checked_mul(anchor)? | (gindex ^ anchor);
        }

        Some(result)
    }

    /// Compute the depth (number of proof elements) for a given gindex
    #[must_use]
    pub const fn gindex_depth(gindex: u64) -> u32 {
        match gindex.checked_ilog2() {
            Some(depth) => depth,
            None => 0,
        }
    }

    /// Expected inclusion proof length under `spec`
    #[must_use]
    pub fn inclusion_proof_depth<S: ChainSpec + ?Sized>(spec: &S) -> Option<u32> {
        Self::kzg_commitment_gindex(spec, 0).map(Self::gindex_depth)
    }
}
