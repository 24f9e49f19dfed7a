//! Cross-validate sidecar proofs against ssz_rs merkleization.

use integration_tests::{ssz_block, test_commitment, SszBlockBody, MINIMAL_MAX_BLOB_COMMITMENTS};
use sidecar_gen::{
    body_root, commitments_root, BlockBody, ChainConfig, ChainSpec, CommitmentLeafifier,
    GindexCalculator, SidecarFactory, SszLeafifier,
};
use ssz_rs::prelude::*;

fn node(bytes: &[u8; 32]) -> Node {
    Node::try_from(bytes.as_slice()).unwrap()
}

#[test]
fn test_body_root_matches_ssz_rs() {
    let spec = ChainConfig::minimal();
    let block = ssz_block(1, 3).unwrap();

    let field_roots = block.body.top_level_field_roots().unwrap();
    assert_eq!(field_roots.len() as u64, spec.body_length());

    let ours = body_root(&field_roots, &spec).unwrap();
    assert_eq!(ours, block.body.ssz_root().unwrap(), "body roots should match");
}

#[test]
fn test_commitments_root_matches_ssz_rs_list() {
    let spec = ChainConfig::minimal();
    let block = ssz_block(1, 5).unwrap();

    let ours = commitments_root(block.body.blob_kzg_commitments(), &spec, &SszLeafifier).unwrap();
    let theirs: [u8; 32] = block.body.body.blob_kzg_commitments.hash_tree_root().unwrap().into();
    assert_eq!(ours, theirs);
}

#[test]
fn test_mainnet_commitments_root_matches_ssz_rs_list() {
    let mut list = List::<Vector<u8, 48>, 4096>::default();
    let commitments: Vec<_> = (0..6).map(test_commitment).collect();
    for c in &commitments {
        list.push(Vector::<u8, 48>::try_from(c.as_bytes().to_vec()).unwrap());
    }

    let ours = commitments_root(&commitments, &ChainConfig::mainnet(), &SszLeafifier).unwrap();
    let theirs: [u8; 32] = list.hash_tree_root().unwrap().into();
    assert_eq!(ours, theirs);
}

#[test]
fn test_leafifier_matches_vector_hash_tree_root() {
    let commitment = test_commitment(9);
    let vector = Vector::<u8, 48>::try_from(commitment.as_bytes().to_vec()).unwrap();
    let theirs: [u8; 32] = vector.hash_tree_root().unwrap().into();
    assert_eq!(SszLeafifier.leaf(&commitment), theirs);
}

#[test]
fn test_sidecar_proofs_valid_for_generalized_index() {
    let spec = ChainConfig::minimal();
    let block = ssz_block(64, 4).unwrap();
    let body_root = block.body.ssz_root().unwrap();

    let sidecars = SidecarFactory::new(spec).build_sidecars(&block, &bundle_for(&block.body)).unwrap();
    assert_eq!(sidecars.len(), 4);

    for sidecar in &sidecars {
        assert_eq!(sidecar.header().body_root, body_root);
        assert_eq!(sidecar.inclusion_proof().len(), 10);

        let gindex = GindexCalculator::kzg_commitment_gindex(&spec, sidecar.index()).unwrap();
        let leaf = SszLeafifier.leaf(sidecar.commitment());
        let branch: Vec<Node> = sidecar.inclusion_proof().iter().map(node).collect();

        ssz_rs::proofs::is_valid_merkle_branch_for_generalized_index(
            node(&leaf),
            &branch,
            gindex as usize,
            node(&body_root),
        )
        .unwrap_or_else(|e| panic!("sidecar {} proof failed: {e}", sidecar.index()));
    }
}

#[test]
fn test_cross_validate_with_ssz_rs_prove() {
    let spec = ChainConfig::minimal();
    let block = ssz_block(7, 3).unwrap();

    let sidecars = SidecarFactory::new(spec).build_sidecars(&block, &bundle_for(&block.body)).unwrap();

    let mut ssz_body = block.body.body.clone();
    for index in 0..3usize {
        let path: &[PathElement] = &["blob_kzg_commitments".into(), index.into()];
        let (ssz_proof, ssz_witness) = ssz_body.prove(path).expect("ssz_rs prove");
        let ssz_root: [u8; 32] = ssz_witness.into();
        let ssz_leaf: [u8; 32] = ssz_proof.leaf.into();
        let ssz_branch: Vec<[u8; 32]> = ssz_proof.branch.iter().map(|n| (*n).into()).collect();

        let sidecar = sidecars.get(index).unwrap();
        assert_eq!(sidecar.header().body_root, ssz_root, "body roots should match");
        assert_eq!(SszLeafifier.leaf(sidecar.commitment()), ssz_leaf, "leaves should match");
        assert_eq!(sidecar.inclusion_proof().len(), ssz_branch.len());

        for (i, (ours, theirs)) in sidecar.inclusion_proof().iter().zip(&ssz_branch).enumerate() {
            assert_eq!(ours, theirs, "proof node {i} differs for commitment {index}");
        }
    }
}

#[test]
fn test_full_commitment_list() {
    let spec = ChainConfig::minimal();
    let block = ssz_block(9, MINIMAL_MAX_BLOB_COMMITMENTS as u8).unwrap();

    let sidecars = SidecarFactory::new(spec).build_sidecars(&block, &bundle_for(&block.body)).unwrap();
    assert_eq!(sidecars.len(), MINIMAL_MAX_BLOB_COMMITMENTS);

    let body_root = block.body.ssz_root().unwrap();
    assert!(sidecars.iter().all(|s| s.header().body_root == body_root));
}

fn bundle_for(body: &SszBlockBody) -> sidecar_gen::BlobsBundle {
    let commitments = body.blob_kzg_commitments().to_vec();
    sidecar_gen::BlobsBundle::new(
        (0..commitments.len()).map(|i| sidecar_gen::Blob::new(vec![i as u8; 128])).collect(),
        commitments.clone(),
        (0..commitments.len())
            .map(|i| sidecar_gen::KzgProof::new([i as u8; 48]))
            .collect(),
    )
}
