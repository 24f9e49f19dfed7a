//! End-to-end sidecar building over an SSZ body and its field-roots form.

use integration_tests::{ssz_block, test_commitment};
use proptest::prelude::*;
use sidecar_gen::{
    verify_blob_sidecar_inclusion_proof, BeaconBlock, Blob, BlobSidecars, BlobsBundle, BlockBody,
    ChainConfig, FieldRootsBody, KzgProof, SidecarError, SidecarFactory, SszLeafifier,
};

fn bundle_of(count: usize) -> BlobsBundle {
    BlobsBundle::new(
        (0..count).map(|i| Blob::new(vec![i as u8; 256])).collect(),
        (0..count).map(|i| test_commitment(i as u8)).collect(),
        (0..count).map(|i| KzgProof::new([0x80 | i as u8; 48])).collect(),
    )
}

#[test]
fn test_field_roots_body_matches_ssz_body() {
    let spec = ChainConfig::minimal();
    let block = ssz_block(12, 3).unwrap();
    let factory = SidecarFactory::new(spec);

    let from_ssz = factory.build_sidecars(&block, &bundle_of(3)).unwrap();

    // The same block, handed over as pre-computed roots
    let roots_body = FieldRootsBody::assemble(
        block.body.top_level_field_roots().unwrap(),
        block.body.blob_kzg_commitments().to_vec(),
        &spec,
        &SszLeafifier,
    )
    .unwrap();
    let roots_block = BeaconBlock {
        slot: block.slot,
        proposer_index: block.proposer_index,
        parent_root: block.parent_root,
        state_root: block.state_root,
        body: roots_body,
    };
    let from_roots = factory.build_sidecars(&roots_block, &bundle_of(3)).unwrap();

    assert_eq!(from_ssz, from_roots);
}

#[test]
fn test_sidecars_survive_json() {
    let spec = ChainConfig::minimal();
    let block = ssz_block(3, 2).unwrap();
    let sidecars = SidecarFactory::new(spec).build_sidecars(&block, &bundle_of(2)).unwrap();

    let json = serde_json::to_string(&sidecars).unwrap();
    let decoded: BlobSidecars = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded, sidecars);
    for sidecar in &decoded {
        assert!(verify_blob_sidecar_inclusion_proof(sidecar, &spec, &SszLeafifier));
    }

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let body_root = value[0]["block_header"]["body_root"].as_str().unwrap();
    assert_eq!(
        body_root,
        format!("0x{}", hex::encode(sidecars.get(0).unwrap().header().body_root))
    );
}

#[test]
fn test_proof_against_wrong_chain_config_fails() {
    let block = ssz_block(5, 1).unwrap();
    let sidecars = SidecarFactory::new(ChainConfig::minimal())
        .build_sidecars(&block, &bundle_of(1))
        .unwrap();

    let sidecar = sidecars.get(0).unwrap();
    assert!(!verify_blob_sidecar_inclusion_proof(sidecar, &ChainConfig::mainnet(), &SszLeafifier));
}

#[test]
fn test_mismatched_bundle_produces_nothing() {
    let block = ssz_block(5, 2).unwrap();
    let mut bundle = bundle_of(2);
    bundle.blobs.push(Blob::default());

    let err = SidecarFactory::new(ChainConfig::minimal())
        .build_sidecars(&block, &bundle)
        .unwrap_err();
    assert!(matches!(err, SidecarError::BundleLengthMismatch { blobs: 3, .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_ssz_body_sidecars_verify(count in 0usize..=8) {
        let spec = ChainConfig::minimal();
        let block = ssz_block(count as u64, count as u8).unwrap();
        let body_root = block.body.ssz_root().unwrap();

        let sidecars = SidecarFactory::new(spec)
            .build_sidecars(&block, &bundle_of(count))
            .unwrap();

        prop_assert_eq!(sidecars.len(), count);
        for (i, sidecar) in sidecars.iter().enumerate() {
            prop_assert_eq!(sidecar.index(), i as u64);
            prop_assert_eq!(sidecar.header().body_root, body_root);
            prop_assert!(verify_blob_sidecar_inclusion_proof(sidecar, &spec, &SszLeafifier));
        }
    }
}
