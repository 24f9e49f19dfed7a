//! Chain Configuration
//!
//! The handful of chain constants the sidecar factory needs: the commitment
//! list limit and the position of that list in the block body.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::merkle::depth_for;

/// Preset constants - only one feature should be active
#[cfg(all(feature = "mainnet", not(feature = "minimal")))]
pub mod preset {
    /// Maximum blob commitments per block (2^12)
    pub const MAX_BLOB_COMMITMENTS_PER_BLOCK: u64 = 4096;
    /// Number of top-level fields in the Deneb `BeaconBlockBody`
    pub const BODY_LENGTH: u64 = 12;
    /// Index of `blob_kzg_commitments` in the body
    pub const KZG_COMMITMENT_FIELD_POSITION: u64 = 11;
    /// Inclusion proof depth: 12 (data) + 1 (length) + 4 (body)
    pub const KZG_COMMITMENT_INCLUSION_PROOF_DEPTH: u32 = 17;
}

#[cfg(feature = "minimal")]
pub mod preset {
    /// Maximum blob commitments per block in the minimal preset (2^5)
    pub const MAX_BLOB_COMMITMENTS_PER_BLOCK: u64 = 32;
    /// Number of top-level fields in the Deneb `BeaconBlockBody`
    pub const BODY_LENGTH: u64 = 12;
    /// Index of `blob_kzg_commitments` in the body
    pub const KZG_COMMITMENT_FIELD_POSITION: u64 = 11;
    /// Inclusion proof depth: 5 (data) + 1 (length) + 4 (body)
    pub const KZG_COMMITMENT_INCLUSION_PROOF_DEPTH: u32 = 10;
}

#[cfg(not(any(feature = "mainnet", feature = "minimal")))]
pub mod preset {
    /// Maximum blob commitments per block (2^12)
    pub const MAX_BLOB_COMMITMENTS_PER_BLOCK: u64 = 4096;
    /// Number of top-level fields in the Deneb `BeaconBlockBody`
    pub const BODY_LENGTH: u64 = 12;
    /// Index of `blob_kzg_commitments` in the body
    pub const KZG_COMMITMENT_FIELD_POSITION: u64 = 11;
    /// Inclusion proof depth: 12 (data) + 1 (length) + 4 (body)
    pub const KZG_COMMITMENT_INCLUSION_PROOF_DEPTH: u32 = 17;
}

/// Generalized indices are `u64`, so a proof path has at most 63 levels.
pub const MAX_INCLUSION_PROOF_DEPTH: u32 = 63;

/// Chain constants consumed by the sidecar factory.
pub trait ChainSpec {
    /// Limit of the `blob_kzg_commitments` list.
    fn max_blob_commitments_per_block(&self) -> u64;

    /// Schema length of the block body container. The body tree is sized
    /// for `body_length - 1` leaves, which pads to the same depth.
    fn body_length(&self) -> u64;

    /// Position of `blob_kzg_commitments` among the body's top-level fields.
    fn kzg_commitment_field_position(&self) -> u64;

    /// Proof elements from a commitment to the commitments list root,
    /// including the length mix-in.
    fn commitment_subtree_depth(&self) -> u32 {
        depth_for(self.max_blob_commitments_per_block()) + 1
    }

    /// Proof elements from the commitments list root to the body root.
    fn body_subtree_depth(&self) -> u32 {
        depth_for(self.body_length().saturating_sub(1))
    }

    /// Total length of every sidecar's inclusion proof.
    fn inclusion_proof_depth(&self) -> u32 {
        self.commitment_subtree_depth() + self.body_subtree_depth()
    }
}

/// Invalid chain configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainConfigError {
    #[error("Block body must have at least one field")]
    EmptyBody,

    #[error("KZG commitment field position {position} out of range for body length {body_length}")]
    KzgPositionOutOfRange { position: u64, body_length: u64 },

    #[error("Body length {body_length} does not fit a body tree sized for {slots} fields")]
    BodyTooLong { body_length: u64, slots: u64 },

    #[error("Inclusion proof depth {depth} exceeds the maximum of {max}")]
    ProofTooDeep { depth: u32, max: u32 },
}

/// Concrete, serde-loadable chain configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub max_blob_commitments_per_block: u64,
    pub body_length: u64,
    pub kzg_commitment_field_position: u64,
}

impl ChainConfig {
    /// Ethereum mainnet (Deneb) values.
    #[must_use]
    pub const fn mainnet() -> Self {
        Self {
            max_blob_commitments_per_block: 4096,
            body_length: 12,
            kzg_commitment_field_position: 11,
        }
    }

    /// Minimal preset values used by test networks.
    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            max_blob_commitments_per_block: 32,
            body_length: 12,
            kzg_commitment_field_position: 11,
        }
    }

    /// Values of the compiled-in preset.
    #[must_use]
    pub const fn from_preset() -> Self {
        Self {
            max_blob_commitments_per_block: preset::MAX_BLOB_COMMITMENTS_PER_BLOCK,
            body_length: preset::BODY_LENGTH,
            kzg_commitment_field_position: preset::KZG_COMMITMENT_FIELD_POSITION,
        }
    }

    /// Check the body layout is self-consistent.
    ///
    /// The body tree is sized for `body_length - 1` fields, so it only has
    /// room for every field when `body_length - 1` is not a power of two.
    /// The combined proof depth must leave the generalized index inside a
    /// `u64`.
    ///
    /// # Errors
    /// Returns an error if the body is empty, the commitments field lies
    /// outside of it, the body tree cannot hold every field, or the proof is
    /// too deep.
    pub fn validate(&self) -> Result<(), ChainConfigError> {
        if self.body_length == 0 {
            return Err(ChainConfigError::EmptyBody);
        }
        if self.kzg_commitment_field_position >= self.body_length {
            return Err(ChainConfigError::KzgPositionOutOfRange {
                position: self.kzg_commitment_field_position,
                body_length: self.body_length,
            });
        }

        let depth = self.inclusion_proof_depth();
        if depth > MAX_INCLUSION_PROOF_DEPTH {
            return Err(ChainConfigError::ProofTooDeep {
                depth,
                max: MAX_INCLUSION_PROOF_DEPTH,
            });
        }

        let slots = match self.body_length - 1 {
            0 => 0,
            fields => 1_u64 << depth_for(fields),
        };
        if self.body_length > slots {
            return Err(ChainConfigError::BodyTooLong {
                body_length: self.body_length,
                slots,
            });
        }
        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::from_preset()
    }
}

impl ChainSpec for ChainConfig {
    fn max_blob_commitments_per_block(&self) -> u64 {
        self.max_blob_commitments_per_block
    }

    fn body_length(&self) -> u64 {
        self.body_length
    }

    fn kzg_commitment_field_position(&self) -> u64 {
        self.kzg_commitment_field_position
    }
}

impl<T: ChainSpec + ?Sized> ChainSpec for &T {
    fn max_blob_commitments_per_block(&self) -> u64 {
        (**self).max_blob_commitments_per_block()
    }

    fn body_length(&self) -> u64 {
        (**self).body_length()
    }

    fn kzg_commitment_field_position(&self) -> u64 {
        (**self).kzg_commitment_field_position()
    }
}
