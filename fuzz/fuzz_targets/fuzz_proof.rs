#![no_main]

use libfuzzer_sys::fuzz_target;
use ssz_tree::{
    cover_depth, merkle_proof, merkleize, no_sub_proof, verify_proof, Gindex, Root, Sha256Hasher,
};

/// Every position up to the limit depth proves against the root, and a
/// flipped branch byte never verifies
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let count = u64::from(data[0]);
    let limit = count + u64::from(data[1]);
    if limit == 0 {
        return;
    }
    let depth = cover_depth(limit);
    let index = u64::from(u16::from_le_bytes([data[2], data[3]])) % (1 << depth);
    let seed = &data[4..];
    let leaf = |i: u64| {
        let mut root = Root::ZERO;
        root[24..].copy_from_slice(&i.to_be_bytes());
        if let Some(b) = seed.get(i as usize) {
            root[0] = *b;
        }
        root
    };

    let hasher = Sha256Hasher;
    let target = Gindex::from_index(index, depth).expect("index below 2^depth");
    let proof = merkle_proof(&hasher, count, limit, target, leaf, no_sub_proof).expect("in range");
    let root = merkleize(&hasher, count, limit, leaf);
    assert_eq!(proof.root, root);
    assert!(verify_proof(&hasher, &proof.branch, target, &root, &leaf(index)));

    if let Some(first) = proof.branch.first() {
        let mut tampered = proof.branch.clone();
        let mut sibling = *first;
        sibling[31] ^= 1;
        tampered[0] = sibling;
        assert!(!verify_proof(&hasher, &tampered, target, &root, &leaf(index)));
    }
});
