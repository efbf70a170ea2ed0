//! Known-answer tests: fixed roots and branches for small SHA-256 trees.

use std::sync::Arc;

use ssz_tree::{
    merkle_proof, merkleize, no_sub_proof, verify_proof, zero_hash, zero_node, Gindex, Hasher,
    Node, Root, Sha256Hasher,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Leaf `i` holds `i + 1` big-endian in its last 8 bytes.
fn counting_leaf(i: u64) -> Root {
    let mut out = Root::ZERO;
    out[24..].copy_from_slice(&(i + 1).to_be_bytes());
    out
}

fn root_from_hex(s: &str) -> Root {
    Root::from_slice(&hex::decode(s).unwrap())
}

/// Check the root and the branch, listed from the root down to the leaf.
fn check_proof(count: u64, limit: u64, index: u64, root_hex: &str, siblings_top_down: &[&str]) {
    let hasher = Sha256Hasher;
    let target = Gindex::from_index(index, ssz_tree::cover_depth(limit)).unwrap();
    let proof = merkle_proof(&hasher, count, limit, target, counting_leaf, no_sub_proof).unwrap();

    let root = merkleize(&hasher, count, limit, counting_leaf);
    assert_eq!(root, root_from_hex(root_hex));
    assert_eq!(proof.root, root);

    let expected: Vec<Root> = siblings_top_down.iter().rev().map(|s| root_from_hex(s)).collect();
    assert_eq!(proof.branch, expected);
    assert!(verify_proof(&hasher, &proof.branch, target, &root, &counting_leaf(index)));
}

const DEEP_SIBLINGS: [&str; 9] = [
    "506d86582d252405b840018792cad2bf1259f1ef5aa5f887e13cb2f0094f51e1",
    "26846476fd5fc54a5d43385167c95144f2643f533cc85bb9d16b782f8d7db193",
    "87eb0ddba57e35f6d286673802a4af5975e22506c7cf4c64bb6be5ee11527f2c",
    "d88ddfeed400a8755596b21942c1497e114c302e6118290f91e6772976041fa1",
    "9efde052aa15429fae05bad4d0b1d7c64da64d03d7a1854a588c2cb8430c0d30",
    "536d98837f2dd165a55d5eeae91485954472d56f246df256bf3cae19352a123c",
    "c78009fdf07fc56a11f122370658a353aaa542ed63e44c4bc15ff4cd105ab33c",
    "9f9315983e72b3712b8453057fffea967876477459f4f288a79ac135f7e7ea7f",
    "da0cd6b20f3f0d2e7c040ea5d411fed01cbe85af2bdc3069d7d191073b4bd2a7",
];

const DEEP_ROOT: &str = "f6b1035624bd2bb134a52924e41d66c8e31177458809de4ac8a2b0ac2ae1cd41";

#[test]
fn test_eight_leaves_root() {
    let root = merkleize(&Sha256Hasher, 8, 8, counting_leaf);
    assert_eq!(
        root,
        root_from_hex("f21a13e8c312a582f7a002f90b7af23bf104d4bfe70be85fe16229db8174c8f9")
    );
}

#[test]
fn test_proof_full_tree() {
    check_proof(
        8,
        8,
        0,
        "f21a13e8c312a582f7a002f90b7af23bf104d4bfe70be85fe16229db8174c8f9",
        &[
            "373fade5331b44f7c3bbde6d110d5f62a9c658029567331fb29d2df285b8456a",
            "da0cd6b20f3f0d2e7c040ea5d411fed01cbe85af2bdc3069d7d191073b4bd2a7",
            "0000000000000000000000000000000000000000000000000000000000000002",
        ],
    );
}

#[test]
fn test_proof_one_past_power_of_two() {
    init_tracing();
    check_proof(
        8,
        9,
        0,
        "933df3778817647f2cedb0b2a43e15b2a27b138f7050132fa3d6f5ef5141c55a",
        &[
            "c78009fdf07fc56a11f122370658a353aaa542ed63e44c4bc15ff4cd105ab33c",
            "373fade5331b44f7c3bbde6d110d5f62a9c658029567331fb29d2df285b8456a",
            "da0cd6b20f3f0d2e7c040ea5d411fed01cbe85af2bdc3069d7d191073b4bd2a7",
            "0000000000000000000000000000000000000000000000000000000000000002",
        ],
    );
    // that first sibling is just the zero subtree of depth 3
    assert_eq!(
        zero_hash(3),
        root_from_hex("c78009fdf07fc56a11f122370658a353aaa542ed63e44c4bc15ff4cd105ab33c")
    );
}

#[test]
fn test_proof_lone_right_leaf() {
    check_proof(
        9,
        9,
        8,
        "b00c4fa7e5c2f468627398409af7bc6fb364c8bbcf629d58ae74385e08aee694",
        &[
            "f21a13e8c312a582f7a002f90b7af23bf104d4bfe70be85fe16229db8174c8f9",
            "db56114e00fdd4c1f85c892bf35ac9a89289aaecb1ebd0a96cde606a748b5d71",
            "f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b",
            "0000000000000000000000000000000000000000000000000000000000000000",
        ],
    );
}

#[test]
fn test_proof_sparse_deep_tree() {
    init_tracing();
    let mut left = DEEP_SIBLINGS.to_vec();
    left.push("0000000000000000000000000000000000000000000000000000000000000002");
    check_proof(6, 1024, 0, DEEP_ROOT, &left);

    let mut right = DEEP_SIBLINGS.to_vec();
    right.push("0000000000000000000000000000000000000000000000000000000000000001");
    check_proof(6, 1024, 1, DEEP_ROOT, &right);
    // 1023 covers the same depth as 1024
    check_proof(6, 1023, 1, DEEP_ROOT, &right);
}

#[test]
fn test_fill_three_leaves() {
    let hasher = Sha256Hasher;
    let leaves: Vec<_> = (0..3).map(|i| Node::leaf(counting_leaf(i))).collect();
    let tree = ssz_tree::subtree_fill_to_contents(&hasher, &leaves, 2).unwrap();

    let expected = hasher.hash_64(
        &hasher.hash_64(&counting_leaf(0), &counting_leaf(1)),
        &hasher.hash_64(&counting_leaf(2), &zero_hash(0)),
    );
    assert_eq!(tree.merkle_root(&hasher), expected);
}

#[test]
fn test_expand_bare_zero_leaf() {
    init_tracing();
    let hasher = Sha256Hasher;
    let bare = zero_node(3);
    let target = Gindex::from_index(0, 3).unwrap();
    let value = Root::repeat_byte(0x42);

    let tree = bare.expand_into(&hasher, target).unwrap().apply(Node::leaf(value));

    // three pairs down the left edge, each right side the zero subtree below it
    let mut current = Arc::clone(&tree);
    for depth in (0..3).rev() {
        let pair = current.as_pair().expect("expanded level is a pair");
        assert_eq!(pair.right().merkle_root(&hasher), zero_hash(depth));
        current = Arc::clone(pair.left());
    }
    assert!(current.is_leaf());

    let mut expected = value;
    for depth in 0..3 {
        expected = hasher.hash_64(&expected, &zero_hash(depth));
    }
    assert_eq!(tree.merkle_root(&hasher), expected);
    assert_eq!(bare.merkle_root(&hasher), zero_hash(3));
}

#[test]
fn test_split_and_proof_membership() {
    let g = Gindex::new(221184).unwrap();
    let (outer, inner) = g.split(4);
    assert_eq!(outer.get(), 27);
    assert_eq!(inner.get(), 8192);

    let target = Gindex::new(8).unwrap();
    let on_path: Vec<u64> = (1..=15)
        .filter(|&c| Gindex::new(c).unwrap().is_proof(target))
        .collect();
    assert_eq!(on_path, vec![3, 5, 9]);
}
