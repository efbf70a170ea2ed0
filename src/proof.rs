//! Merkle proof generation and verification.
//!
//! Proofs are built in the same single carry-merge pass as
//! [`merkleize`](crate::merkleize), keeping only the nodes on the Merkle path
//! of the target, so they also need O(log limit) memory.

use tracing::debug;

use crate::{
    error::Result,
    merkle::{clamp_count, length_chunk, selector_chunk, Accumulator},
    Gindex, Hasher, Root, TreeError,
};

/// A Merkle branch for one gindex.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proof {
    /// One sibling per level, from the proven node up to the root
    pub branch: Vec<Root>,
    /// Root the branch folds into
    pub root: Root,
}

impl Proof {
    /// Create a new proof.
    pub fn new(branch: Vec<Root>, root: Root) -> Self {
        Self { branch, root }
    }

    /// Depth of the node this proof is for.
    pub fn depth(&self) -> usize {
        self.branch.len()
    }

    /// Size of the proof in bytes.
    pub fn size(&self) -> usize {
        (self.branch.len() + 1) * 32
    }

    /// Check that `leaf` sits at `index` under this proof's root.
    pub fn verify<H: Hasher>(&self, hasher: &H, index: Gindex, leaf: &Root) -> bool {
        verify_proof(hasher, &self.branch, index, &self.root, leaf)
    }

    /// Fold `leaf` upward through the branch.
    ///
    /// Fails with [`TreeError::InvalidProof`] if the branch length does not
    /// match the depth of `index`.
    pub fn compute_root<H: Hasher>(&self, hasher: &H, index: Gindex, leaf: &Root) -> Result<Root> {
        if self.branch.len() != index.depth() as usize {
            return Err(TreeError::InvalidProof(format!(
                "branch has {} nodes, gindex {} needs {}",
                self.branch.len(),
                index,
                index.depth()
            )));
        }
        Ok(fold(hasher, &self.branch, index, *leaf))
    }

    /// Extend a proof of the content tree of a list into a proof of the list
    /// root, which is `H(content_root, length_chunk)`.
    ///
    /// The proven node moves one level down: it is now under the left child
    /// of the new root, with the length chunk as the top sibling.
    pub fn mix_in_length<H: Hasher>(self, hasher: &H, length: u64) -> Self {
        self.mix_in(hasher, length_chunk(length))
    }

    /// Like [`Proof::mix_in_length`], for the selector chunk of a union.
    pub fn mix_in_selector<H: Hasher>(self, hasher: &H, selector: u8) -> Self {
        self.mix_in(hasher, selector_chunk(selector))
    }

    /// Prove under `H(root, chunk)`.
    pub(crate) fn mix_in<H: Hasher>(mut self, hasher: &H, chunk: Root) -> Self {
        self.root = hasher.hash_64(&self.root, &chunk);
        self.branch.push(chunk);
        self
    }

    /// Extend this proof downward with `inner`, a proof rooted at the node
    /// this proof is for.
    ///
    /// Fails with [`TreeError::InvalidProof`] if `inner` is rooted elsewhere.
    pub fn splice(mut self, inner: Proof, proven: &Root) -> Result<Self> {
        if inner.root != *proven {
            return Err(TreeError::InvalidProof(format!(
                "sub-proof root {} does not match node {}",
                inner.root, proven
            )));
        }
        let mut branch = inner.branch;
        branch.append(&mut self.branch);
        self.branch = branch;
        Ok(self)
    }
}

/// Sub-proof callback for leaves with no internal structure.
pub fn no_sub_proof(_index: u64, _gindex: Gindex) -> Result<Option<Proof>> {
    Ok(None)
}

/// Proof for `target` in the tree [`merkleize`](crate::merkleize) would
/// build from the same `count`, `limit` and `leaf`.
///
/// Targets at or above the leaf level are proven directly. A deeper target
/// descends into leaf `i`, and `sub_proof(i, inner)` must supply that leaf's
/// own proof for the remaining path `inner`; returning `None` there, or
/// targeting below a padding leaf, fails with
/// [`TreeError::NavigationFailure`].
///
/// Nodes inside zero-padded regions are proven with zero hashes, so every
/// position up to the limit depth is provable.
pub fn merkle_proof<H, F, S>(
    hasher: &H,
    count: u64,
    limit: u64,
    target: Gindex,
    leaf: F,
    sub_proof: S,
) -> Result<Proof>
where
    H: Hasher,
    F: Fn(u64) -> Root,
    S: Fn(u64, Gindex) -> Result<Option<Proof>>,
{
    let count = clamp_count(count, limit);
    let mut acc = Accumulator::new(hasher.clone(), limit);
    let limit_depth = acc.limit_depth();

    let (outer, inner) = target.split(limit_depth);
    let outer_depth = outer.depth();
    let outer_position = outer.base_index();

    // Unvisited nodes all lie in zero subtrees, so start from those.
    let zeros = hasher.zero_hashes();
    let mut branch: Vec<Root> = (0..outer_depth)
        .map(|k| zeros.root(limit_depth - outer_depth + k))
        .collect();
    let mut proven = zeros.root(limit_depth - outer_depth);

    let mut collect = |level: u32, position: u64, root: &Root| {
        // nodes 64 levels down, only reached for limits above 2^63, have no gindex
        let Ok(node) = Gindex::from_index(position, limit_depth - level) else {
            return;
        };
        if node.is_proof(outer) {
            branch[(outer_depth - node.depth()) as usize] = *root;
        } else if node == outer {
            proven = *root;
        }
    };

    for i in 0..count {
        acc.push(leaf(i), &mut collect);
    }
    let root = acc.finish(&mut collect);

    let proof = Proof::new(branch, root);
    if inner.is_root() {
        return Ok(proof);
    }

    let missing = TreeError::NavigationFailure {
        gindex: target.get(),
        depth: inner.depth(),
    };
    if outer_position >= count {
        return Err(missing);
    }
    match sub_proof(outer_position, inner)? {
        Some(sub) => {
            debug!(
                leaf = outer_position,
                inner = %inner,
                levels = sub.branch.len(),
                "splicing sub-proof"
            );
            proof.splice(sub, &proven)
        }
        None => Err(missing),
    }
}

/// Fold `leaf` through `branch` along the path of `index` and compare with
/// `root`. A branch whose length differs from the depth of `index` never
/// verifies.
pub fn verify_proof<H: Hasher>(
    hasher: &H,
    branch: &[Root],
    index: Gindex,
    root: &Root,
    leaf: &Root,
) -> bool {
    if branch.len() != index.depth() as usize {
        return false;
    }
    fold(hasher, branch, index, *leaf) == *root
}

fn fold<H: Hasher>(hasher: &H, branch: &[Root], mut index: Gindex, mut node: Root) -> Root {
    for sibling in branch {
        node = if index.is_left_leaf() {
            hasher.hash_64(&node, sibling)
        } else {
            hasher.hash_64(sibling, &node)
        };
        index = index.parent();
    }
    node
}
