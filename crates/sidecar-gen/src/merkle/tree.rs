//! Fixed-Capacity Binary Merkle Tree
//!
//! Builds a SHA-256 hash tree over an ordered list of 32-byte leaves whose
//! capacity is dictated by a configured maximum, not by the leaf count.
//!
//! # Approach
//! Only nodes that cover at least one real leaf are materialised. Every
//! other node is an empty subtree whose value is a precomputed "zero hash"
//! for its level, so a `2^12` capacity list with two commitments costs a
//! handful of hashes instead of 4096.
//!
//! This is the same layout used by Ethereum consensus clients for SSZ
//! list and container merkleization.

use std::sync::LazyLock;

use sha2::{Digest, Sha256};

use super::MerkleError;
use crate::types::Root;

/// Maximum supported tree depth
pub const MAX_TREE_DEPTH: u32 = 64;

/// Precomputed zero hashes for each depth level.
/// `ZERO_HASHES[0]` = all-zeros (the zero leaf).
/// `ZERO_HASHES[i]` = hash(ZERO_HASHES[i-1], ZERO_HASHES[i-1])
static ZERO_HASHES: LazyLock<Vec<Root>> = LazyLock::new(|| {
    let mut hashes = vec![[0u8; 32]; MAX_TREE_DEPTH as usize + 1];
    let mut hasher = Sha256::new();
    for i in 1..hashes.len() {
        hasher.update(hashes[i - 1]);
        hasher.update(hashes[i - 1]);
        hashes[i] = hasher.finalize_reset().into();
    }
    hashes
});

/// Root of an empty subtree of the given depth.
///
/// # Panics
/// Panics if `level > MAX_TREE_DEPTH`.
#[must_use]
pub fn zero_hash(level: u32) -> Root {
    ZERO_HASHES[level as usize]
}

/// SHA-256 hash of two 32-byte nodes
#[must_use]
pub fn hash_pair(left: &Root, right: &Root) -> Root {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Depth of a tree able to hold `max_leaves` leaves: `ceil(log2(max_leaves))`,
/// with `0` for zero or one leaf.
#[must_use]
pub const fn depth_for(max_leaves: u64) -> u32 {
    if max_leaves <= 1 {
        return 0;
    }
    match max_leaves.checked_next_power_of_two() {
        Some(slots) => slots.trailing_zeros(),
        None => MAX_TREE_DEPTH,
    }
}

/// A Merkle tree over at most `2^depth` leaves, padded with zero hashes.
///
/// Trees are built per proof request and dropped afterwards; nothing is
/// shared between instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    depth: u32,
    /// `layers[0]` holds the leaves, `layers[depth]` at most the root. Each
    /// layer only stores the nodes that cover at least one real leaf.
    layers: Vec<Vec<Root>>,
}

impl MerkleTree {
    /// Build a tree sized for `max_leaves`.
    ///
    /// The depth is `ceil(log2(max_leaves))` and the tree has `2^depth` leaf
    /// slots; slots past `leaves.len()` hold the zero hash. A tree built
    /// with `max_leaves == 0` has no slots at all.
    ///
    /// # Errors
    /// Returns [`MerkleError::CapacityExceeded`] if the leaves do not fit in
    /// the tree's slots.
    pub fn build(leaves: Vec<Root>, max_leaves: u64) -> Result<Self, MerkleError> {
        let depth = depth_for(max_leaves);

        let fits = match max_leaves {
            0 => leaves.is_empty(),
            _ => 1u64
                .checked_shl(depth)
                .map_or(true, |slots| leaves.len() as u64 <= slots),
        };
        if !fits {
            return Err(MerkleError::CapacityExceeded {
                leaves: leaves.len(),
                max_leaves,
            });
        }

        let mut layers = Vec::with_capacity(depth as usize + 1);
        layers.push(leaves);
        for level in 0..depth {
            let next = hash_layer(&layers[level as usize], level);
            layers.push(next);
        }

        Ok(Self { depth, layers })
    }

    /// Tree depth, i.e. the length of every proof this tree produces.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of real (non-padding) leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    /// Root of the tree. An empty tree has the zero hash of its depth as
    /// root; with depth 0 that is all zeros.
    #[must_use]
    pub fn root(&self) -> Root {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or_else(|| zero_hash(self.depth))
    }

    /// Sibling hashes from the leaf at `index` up to the root.
    ///
    /// The first element is the immediate sibling leaf, the last one the
    /// sibling just below the root.
    ///
    /// # Errors
    /// Returns [`MerkleError::IndexOutOfRange`] if `index >= 2^depth`.
    pub fn proof(&self, index: u64) -> Result<Vec<Root>, MerkleError> {
        if 1u64.checked_shl(self.depth).is_some_and(|slots| index >= slots) {
            return Err(MerkleError::IndexOutOfRange {
                index,
                depth: self.depth,
            });
        }

        let mut proof = Vec::with_capacity(self.depth as usize);
        let mut position = index;
        for (level, layer) in (0..self.depth).zip(&self.layers) {
            let sibling = usize::try_from(position ^ 1)
                .ok()
                .and_then(|sibling| layer.get(sibling))
                .copied()
                .unwrap_or_else(|| zero_hash(level));
            proof.push(sibling);
            position >>= 1;
        }

        Ok(proof)
    }
}

/// Hash one layer into its parent layer. A trailing odd node is paired
/// with the empty subtree of its level.
fn hash_layer(layer: &[Root], level: u32) -> Vec<Root> {
    layer
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            [left] => hash_pair(left, &zero_hash(level)),
            _ => unreachable!("chunks(2) yields one or two nodes"),
        })
        .collect()
}
