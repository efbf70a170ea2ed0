//! Hash function abstraction and precomputed zero-subtree roots.
//!
//! SSZ merkleization hashes the 64-byte concatenation of two child roots.
//! Unlike sparse-tree hashers, there is no special case for empty input:
//! `hash_64(0, 0)` is a real digest, and it is exactly the zero hash at depth 1.

use alloy_primitives::B256;
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};

use crate::tree::{Node, SharedNode};

/// A 32-byte Merkle root or chunk.
pub type Root = B256;

/// Deepest precomputed zero hash. A `u64` gindex never addresses deeper.
pub const MAX_ZERO_DEPTH: usize = 64;

/// Trait for hash functions used to merkleize.
///
/// `Default` doubles as the hasher factory: every call site constructs its own
/// value, so stateful implementations never share working buffers.
///
/// # Thread Safety
///
/// Hashers are `Send + Sync` so one tree can be hashed from several threads
/// (see the `"parallel"` feature).
pub trait Hasher: Clone + Default + Send + Sync {
    /// Hash two child roots: `hash(left || right)`
    fn hash_64(&self, left: &Root, right: &Root) -> Root;

    /// Raw hash of arbitrary input
    fn hash_raw(&self, input: &[u8]) -> Root;

    /// Roots of all-zero subtrees computed with this hasher.
    ///
    /// Implementations must build the table once and hand out the same
    /// reference for the life of the process.
    fn zero_hashes(&self) -> &'static ZeroHashes;

    /// Zero-subtree root at `depth`.
    fn zero_hash(&self, depth: u32) -> Root {
        self.zero_hashes().root(depth)
    }
}

/// SHA-256 hasher, the SSZ default.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash_64(&self, left: &Root, right: &Root) -> Root {
        let mut hasher = Sha256::new();
        hasher.update(left.as_slice());
        hasher.update(right.as_slice());
        B256::from_slice(&hasher.finalize())
    }

    fn hash_raw(&self, input: &[u8]) -> Root {
        B256::from_slice(&Sha256::digest(input))
    }

    fn zero_hashes(&self) -> &'static ZeroHashes {
        static TABLE: OnceLock<ZeroHashes> = OnceLock::new();
        TABLE.get_or_init(|| ZeroHashes::build(&Sha256Hasher))
    }
}

/// BLAKE3-based hasher.
///
/// **Note**: not part of SSZ. Useful for experiments and benchmarks where
/// roots never leave the process.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    fn hash_64(&self, left: &Root, right: &Root) -> Root {
        let mut input = [0u8; 64];
        input[..32].copy_from_slice(left.as_slice());
        input[32..].copy_from_slice(right.as_slice());

        B256::from_slice(blake3::hash(&input).as_bytes())
    }

    fn hash_raw(&self, input: &[u8]) -> Root {
        B256::from_slice(blake3::hash(input).as_bytes())
    }

    fn zero_hashes(&self) -> &'static ZeroHashes {
        static TABLE: OnceLock<ZeroHashes> = OnceLock::new();
        TABLE.get_or_init(|| ZeroHashes::build(&Blake3Hasher))
    }
}

/// Merkle roots of all-zero subtrees, one per depth.
///
/// `root(0)` is 32 zero bytes and `root(d + 1) = H(root(d), root(d))`.
/// Each depth also has a shared leaf node, so lazily grown trees all point at
/// the same zero leaves.
pub struct ZeroHashes {
    roots: [Root; MAX_ZERO_DEPTH + 1],
    nodes: Vec<SharedNode>,
}

impl ZeroHashes {
    /// Compute the table for `hasher`. Costs 64 hashes.
    pub fn build<H: Hasher>(hasher: &H) -> Self {
        let mut roots = [Root::ZERO; MAX_ZERO_DEPTH + 1];
        for depth in 0..MAX_ZERO_DEPTH {
            roots[depth + 1] = hasher.hash_64(&roots[depth], &roots[depth]);
        }
        let nodes = roots.iter().map(|root| Arc::new(Node::Leaf(*root))).collect();
        Self { roots, nodes }
    }

    /// Zero-subtree root at `depth`.
    ///
    /// # Panics
    ///
    /// If `depth > 64`; no `u64` gindex reaches that deep.
    pub fn root(&self, depth: u32) -> Root {
        assert!(
            depth as usize <= MAX_ZERO_DEPTH,
            "zero hash depth {depth} exceeds precomputed {MAX_ZERO_DEPTH}"
        );
        self.roots[depth as usize]
    }

    /// Shared leaf standing in for a zero subtree of `depth`.
    ///
    /// # Panics
    ///
    /// If `depth > 64`.
    pub fn node(&self, depth: u32) -> SharedNode {
        assert!(
            depth as usize <= MAX_ZERO_DEPTH,
            "zero node depth {depth} exceeds precomputed {MAX_ZERO_DEPTH}"
        );
        Arc::clone(&self.nodes[depth as usize])
    }

    /// All roots, indexed by depth.
    pub fn as_slice(&self) -> &[Root] {
        &self.roots
    }
}

impl std::fmt::Debug for ZeroHashes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZeroHashes")
            .field("depths", &self.roots.len())
            .field("top", &self.roots[MAX_ZERO_DEPTH])
            .finish()
    }
}

/// Process-wide SHA-256 zero hashes.
pub fn zero_hashes() -> &'static ZeroHashes {
    Sha256Hasher.zero_hashes()
}

/// SHA-256 zero-subtree root at `depth`.
pub fn zero_hash(depth: u32) -> Root {
    zero_hashes().root(depth)
}

/// Shared SHA-256 zero leaf for `depth`.
pub fn zero_node(depth: u32) -> SharedNode {
    zero_hashes().node(depth)
}
