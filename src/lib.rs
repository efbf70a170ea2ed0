//! # SSZ Merkle tree engine
//!
//! Persistent binary Merkle trees addressed by generalized indices, with
//! bounded-memory merkleization and Merkle proofs, as used by SSZ.
//!
//! Key features:
//!
//! - **Generalized indices**: a single integer encodes depth and path ([`Gindex`])
//! - **Persistent tree**: immutable [`Node`]s shared through `Arc`; writes
//!   rebuild only the path to the target and reuse every other subtree
//! - **Streaming merkleization**: [`merkleize`] and [`Merkleizer`] need
//!   O(log limit) memory, whatever the number of leaves
//! - **Proofs**: [`merkle_proof`] collects a branch in the same single pass,
//!   descending into nested structures through a callback
//!
//! ## Tree Structure
//!
//! Gindex 1 is the root and node `g` has children `2g` and `2g + 1`. Lists
//! hash as `H(content_root, length)`, so their content lives under gindex 2
//! and the length chunk is gindex 3.
//!
//! Node types:
//! - `Leaf`: a 32-byte chunk, its own Merkle root
//! - `Pair`: two children and a write-once cache of their combined root
//!
//! All-zero subtrees are never built: one shared leaf per depth stands in for
//! them, holding the precomputed zero hash of that depth.
//!
//! ## Hash Function
//!
//! SHA-256 over the 64-byte concatenation of two roots ([`Sha256Hasher`]).
//! Everything is generic over [`Hasher`]; [`Blake3Hasher`] is provided for
//! experiments where roots never leave the process.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod bitfield;
mod chunks;
mod error;
mod gindex;
mod hash;
mod merkle;
mod proof;
mod subtree;
mod tree;

pub use error::{Result, TreeError};
pub use gindex::{bit_length, cover_depth, msb_index, Gindex};
pub use hash::{
    zero_hash, zero_hashes, zero_node, Blake3Hasher, Hasher, Root, Sha256Hasher, ZeroHashes,
    MAX_ZERO_DEPTH,
};
pub use tree::{
    subtree_fill_to_contents, subtree_fill_to_depth, subtree_fill_to_length, Node, PairNode,
    Rebinder, SharedNode,
};

pub use bitfield::{
    bit_index, bitlist_check, bitlist_len, bitlist_ones_count, bitvector_check,
    bitvector_check_byte_len, bitvector_check_last_byte, bitvector_ones_count, covers, get_bit,
    is_zero_bitlist, set_bit,
};
pub use chunks::{
    basic_chunk, basic_chunk_count, basic_list_proof, basic_list_root, basic_vector_proof,
    basic_vector_root, bit_chunk_count, bitlist_proof, bitlist_root, bitvector_proof,
    bitvector_root, byte_chunk, byte_chunk_count, byte_list_proof, byte_list_root,
    byte_vector_proof, byte_vector_root, complex_list_proof, complex_list_root,
    complex_vector_proof, complex_vector_root, fields_proof, fields_root, union_proof, union_root,
    BasicValue, HashTreeProof, HashTreeRoot,
};
pub use merkle::{
    length_chunk, merkleize, mix_in_length, mix_in_selector, selector_chunk, Merkleizer,
};
pub use proof::{merkle_proof, no_sub_proof, verify_proof, Proof};
pub use subtree::{ListTree, SubtreeView};
