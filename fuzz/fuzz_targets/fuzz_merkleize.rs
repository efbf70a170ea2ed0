#![no_main]

use libfuzzer_sys::fuzz_target;
use ssz_tree::{cover_depth, merkleize, Blake3Hasher, Hasher, Merkleizer, Root};

/// Naive reference: hash level by level over the fully padded leaf row.
fn naive(leaves: &[Root], limit: u64) -> Root {
    let hasher = Blake3Hasher;
    let depth = cover_depth(limit);
    let mut level: Vec<Root> = leaves.to_vec();
    level.resize(1 << depth, Root::ZERO);
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| hasher.hash_64(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

/// Streaming, closure-driven and naive merkleization agree
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let extra = u64::from(data[0] % 64);
    let leaves: Vec<Root> = data[1..]
        .chunks(32)
        .map(|chunk| {
            let mut root = Root::ZERO;
            root[..chunk.len()].copy_from_slice(chunk);
            root
        })
        .collect();
    let count = leaves.len() as u64;
    let limit = count + extra;

    let closure = merkleize(&Blake3Hasher, count, limit, |i| leaves[i as usize]);

    let mut streaming = Merkleizer::with_hasher(Blake3Hasher, limit);
    for leaf in &leaves {
        streaming.push(*leaf).expect("within limit");
    }
    assert_eq!(streaming.finish(), closure, "streaming vs closure mismatch");
    assert_eq!(naive(&leaves, limit), closure, "naive vs closure mismatch");
});
