//! SSZ Fixtures
//!
//! A Deneb-shaped block body as a real `ssz_rs` container, so sidecar
//! proofs can be checked against an independent merkleization. Operation
//! lists are kept as lists of 32-byte roots; only their shape matters for
//! the body tree.

use ssz_rs::prelude::*;
use thiserror::Error;

use sidecar_gen::{BeaconBlock, BlockBody, KzgCommitment, Root};

/// Commitment list limit of the minimal preset.
pub const MINIMAL_MAX_BLOB_COMMITMENTS: usize = 32;

/// Eth1 deposit data
#[derive(Debug, Clone, Default, PartialEq, Eq, SimpleSerialize)]
pub struct Eth1Data {
    pub deposit_root: [u8; 32],
    pub deposit_count: u64,
    pub block_hash: [u8; 32],
}

/// Sync committee aggregate (minimal committee size)
#[derive(Debug, Clone, Default, PartialEq, Eq, SimpleSerialize)]
pub struct SyncAggregate {
    pub sync_committee_bits: Bitvector<32>,
    pub sync_committee_signature: Vector<u8, 96>,
}

/// Execution payload, reduced to fixed-size fields
#[derive(Debug, Clone, Default, PartialEq, Eq, SimpleSerialize)]
pub struct ExecutionPayloadHeader {
    pub parent_hash: [u8; 32],
    pub state_root: [u8; 32],
    pub block_number: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub block_hash: [u8; 32],
    pub blob_gas_used: u64,
    pub excess_blob_gas: u64,
}

/// Deneb `BeaconBlockBody`: 12 fields, `blob_kzg_commitments` last.
#[derive(Debug, Clone, Default, PartialEq, Eq, SimpleSerialize)]
pub struct DenebBlockBody {
    pub randao_reveal: Vector<u8, 96>,
    pub eth1_data: Eth1Data,
    pub graffiti: [u8; 32],
    pub proposer_slashings: List<[u8; 32], 16>,
    pub attester_slashings: List<[u8; 32], 2>,
    pub attestations: List<[u8; 32], 128>,
    pub deposits: List<[u8; 32], 16>,
    pub voluntary_exits: List<[u8; 32], 16>,
    pub sync_aggregate: SyncAggregate,
    pub execution_payload: ExecutionPayloadHeader,
    pub bls_to_execution_changes: List<[u8; 32], 16>,
    pub blob_kzg_commitments: List<Vector<u8, 48>, MINIMAL_MAX_BLOB_COMMITMENTS>,
}

/// Fixture construction or hashing failure.
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to hash body field {field}: {reason}")]
    FieldHash { field: &'static str, reason: String },

    #[error("Too many commitments for the body: {0}")]
    TooManyCommitments(usize),
}

/// A [`DenebBlockBody`] paired with its commitments in the factory's type.
#[derive(Debug, Clone)]
pub struct SszBlockBody {
    pub body: DenebBlockBody,
    commitments: Vec<KzgCommitment>,
}

impl SszBlockBody {
    /// Fill the non-blob fields with recognisable values and set
    /// `blob_kzg_commitments` to `commitments`.
    pub fn with_commitments(commitments: Vec<KzgCommitment>) -> Result<Self, FixtureError> {
        if commitments.len() > MINIMAL_MAX_BLOB_COMMITMENTS {
            return Err(FixtureError::TooManyCommitments(commitments.len()));
        }

        let mut body = DenebBlockBody {
            graffiti: [0x67; 32],
            eth1_data: Eth1Data {
                deposit_root: [0x11; 32],
                deposit_count: 5,
                block_hash: [0x12; 32],
            },
            execution_payload: ExecutionPayloadHeader {
                parent_hash: [0x21; 32],
                state_root: [0x22; 32],
                block_number: 1_000,
                gas_used: 21_000,
                timestamp: 1_700_000_000,
                block_hash: [0x23; 32],
                blob_gas_used: 131_072 * commitments.len() as u64,
                excess_blob_gas: 0,
            },
            ..DenebBlockBody::default()
        };
        body.attestations.push([0x31; 32]);
        body.deposits.push([0x41; 32]);

        for commitment in &commitments {
            let vector = Vector::<u8, 48>::try_from(commitment.as_bytes().to_vec())
                .map_err(|_| FixtureError::TooManyCommitments(commitments.len()))?;
            body.blob_kzg_commitments.push(vector);
        }

        Ok(Self { body, commitments })
    }

    /// SSZ hash tree root of the whole body.
    pub fn ssz_root(&self) -> Result<Root, FixtureError> {
        field_root("body", &self.body)
    }
}

fn field_root<T: SimpleSerialize>(field: &'static str, value: &T) -> Result<Root, FixtureError> {
    value
        .hash_tree_root()
        .map(Into::into)
        .map_err(|e| FixtureError::FieldHash {
            field,
            reason: format!("{e:?}"),
        })
}

impl BlockBody for SszBlockBody {
    type Error = FixtureError;

    fn top_level_field_roots(&self) -> Result<Vec<Root>, Self::Error> {
        let b = &self.body;
        Ok(vec![
            field_root("randao_reveal", &b.randao_reveal)?,
            field_root("eth1_data", &b.eth1_data)?,
            field_root("graffiti", &b.graffiti)?,
            field_root("proposer_slashings", &b.proposer_slashings)?,
            field_root("attester_slashings", &b.attester_slashings)?,
            field_root("attestations", &b.attestations)?,
            field_root("deposits", &b.deposits)?,
            field_root("voluntary_exits", &b.voluntary_exits)?,
            field_root("sync_aggregate", &b.sync_aggregate)?,
            field_root("execution_payload", &b.execution_payload)?,
            field_root("bls_to_execution_changes", &b.bls_to_execution_changes)?,
            field_root("blob_kzg_commitments", &b.blob_kzg_commitments)?,
        ])
    }

    fn blob_kzg_commitments(&self) -> &[KzgCommitment] {
        &self.commitments
    }
}

/// Deterministic, distinct commitment bytes for test index `i`.
#[must_use]
pub fn test_commitment(i: u8) -> KzgCommitment {
    let mut bytes = [0u8; 48];
    bytes[0] = 0xc0;
    bytes[1] = i;
    bytes[47] = i.wrapping_mul(31);
    KzgCommitment::new(bytes)
}

/// A block at `slot` carrying an SSZ body with `count` commitments.
pub fn ssz_block(slot: u64, count: u8) -> Result<BeaconBlock<SszBlockBody>, FixtureError> {
    let commitments = (0..count).map(test_commitment).collect();
    Ok(BeaconBlock {
        slot,
        proposer_index: 17,
        parent_root: [0xaa; 32],
        state_root: [0xbb; 32],
        body: SszBlockBody::with_commitments(commitments)?,
    })
}
