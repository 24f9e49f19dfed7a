//! Merkle Tree Engine
//!
//! Binary SHA-256 trees with zero-hash padding, and the SSZ length mix-in
//! used to commit to variable-length lists.

mod mixin;
mod tree;

pub use mixin::{length_chunk, mix_in_length, MixinTree};
pub use tree::{depth_for, hash_pair, zero_hash, MerkleTree, MAX_TREE_DEPTH};

use thiserror::Error;

/// Errors raised while building trees or proofs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("{leaves} leaves exceed tree capacity (max_leaves {max_leaves})")]
    CapacityExceeded { leaves: usize, max_leaves: u64 },

    #[error("Leaf index {index} out of range for tree of depth {depth}")]
    IndexOutOfRange { index: u64, depth: u32 },
}
