//! SSZ length mix-in for list commitments.
//!
//! A `List[T, N]` root is `hash(data_root, length_chunk)`: the data subtree
//! is always the left child and the length the right child, so the mix-in
//! adds exactly one level and one proof element. Unlike a container tree,
//! a list holds at most `N` elements even when `N` is not a power of two.

use super::{hash_pair, MerkleError, MerkleTree};
use crate::types::Root;

/// The list length as a 32-byte chunk: little-endian `u64` padded with zeros.
#[must_use]
pub fn length_chunk(length: usize) -> Root {
    let mut chunk = [0u8; 32];
    chunk[..8].copy_from_slice(&(length as u64).to_le_bytes());
    chunk
}

/// Mix in the length for a List's Merkle root.
/// `list_root = hash(data_root, length_as_le_bytes32)`
#[must_use]
pub fn mix_in_length(data_root: Root, length: usize) -> Root {
    hash_pair(&data_root, &length_chunk(length))
}

/// A list commitment: a data tree plus its length leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinTree {
    data: MerkleTree,
    length: usize,
    limit: u64,
}

impl MixinTree {
    /// Build the data subtree over `leaves` sized for `max_leaves`, and
    /// record `leaves.len()` as the list length.
    ///
    /// # Errors
    /// Returns [`MerkleError::CapacityExceeded`] if there are more than
    /// `max_leaves` leaves.
    pub fn build(leaves: Vec<Root>, max_leaves: u64) -> Result<Self, MerkleError> {
        let length = leaves.len();
        if length as u64 > max_leaves {
            return Err(MerkleError::CapacityExceeded {
                leaves: length,
                max_leaves,
            });
        }
        let data = MerkleTree::build(leaves, max_leaves)?;
        Ok(Self {
            data,
            length,
            limit: max_leaves,
        })
    }

    /// Number of elements in the list.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Root of the data subtree, before the mix-in.
    #[must_use]
    pub fn data_root(&self) -> Root {
        self.data.root()
    }

    /// The list root: `hash(data_root, length_chunk)`.
    #[must_use]
    pub fn root(&self) -> Root {
        mix_in_length(self.data.root(), self.length)
    }

    /// Proof length: data depth plus the mix-in level.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.data.depth() + 1
    }

    /// Data-subtree proof for `index` followed by the length chunk.
    ///
    /// # Errors
    /// Returns [`MerkleError::IndexOutOfRange`] if `index` is not below the
    /// list limit.
    pub fn proof_with_mixin(&self, index: u64) -> Result<Vec<Root>, MerkleError> {
        if index >= self.limit {
            return Err(MerkleError::IndexOutOfRange {
                index,
                depth: self.data.depth(),
            });
        }
        let mut proof = self.data.proof(index)?;
        proof.push(length_chunk(self.length));
        Ok(proof)
    }
}

impl MerkleTree {
    /// Build a list commitment over `leaves`, see [`MixinTree::build`].
    ///
    /// # Errors
    /// Same as [`MerkleTree::build`].
    pub fn build_with_mixin(leaves: Vec<Root>, max_leaves: u64) -> Result<MixinTree, MerkleError> {
        MixinTree::build(leaves, max_leaves)
    }
}
