//! Persistent binary Merkle tree.
//!
//! A tree is a graph of immutable [`Node`]s shared through [`Arc`]:
//!
//! - `Leaf`: a 32-byte root, which is its own Merkle root
//! - `Pair`: two children and a write-once cache of `hash(left || right)`
//!
//! Nodes are never modified. A write navigates to the target, collecting a
//! [`Rebinder`], and applying it builds a new root that shares every untouched
//! subtree with the old one. Readers holding the old root keep a stable
//! snapshot.
//!
//! | Operation     | Time     | New nodes |
//! |---------------|----------|-----------|
//! | `get`         | O(depth) | 0         |
//! | `setter`      | O(depth) | 0         |
//! | `expand_into` | O(depth) | 0         |
//! | `Rebinder::apply` | O(depth) | depth |

mod fill;
mod rebind;

pub use fill::{subtree_fill_to_contents, subtree_fill_to_depth, subtree_fill_to_length};
pub use rebind::Rebinder;

use std::sync::{Arc, OnceLock};

use tracing::trace;

use crate::{error::Result, Gindex, Hasher, Root, TreeError};

/// Reference-counted handle to a node. Lives as long as the longest holder.
pub type SharedNode = Arc<Node>;

/// A node in the tree.
#[derive(Debug)]
pub enum Node {
    /// A 32-byte chunk or the cached root of a collapsed subtree
    Leaf(Root),
    /// Branching node with two children
    Pair(PairNode),
}

/// Branching node.
///
/// Both children are always present. The root is computed at most once and
/// never changes, since the children never change either.
#[derive(Debug)]
pub struct PairNode {
    left: SharedNode,
    right: SharedNode,
    root: OnceLock<Root>,
}

impl PairNode {
    /// Left child
    pub fn left(&self) -> &SharedNode {
        &self.left
    }

    /// Right child
    pub fn right(&self) -> &SharedNode {
        &self.right
    }

    /// Root if it has already been computed.
    pub fn cached_root(&self) -> Option<Root> {
        self.root.get().copied()
    }

    /// Calculate the hash: `hash(left_root || right_root)`, once.
    ///
    /// Concurrent first calls may both hash; only one result is stored and
    /// both are identical.
    pub fn merkle_root<H: Hasher>(&self, hasher: &H) -> Root {
        *self.root.get_or_init(|| {
            let left = self.left.merkle_root(hasher);
            let right = self.right.merkle_root(hasher);
            hasher.hash_64(&left, &right)
        })
    }
}

impl Node {
    /// Create a shared leaf.
    pub fn leaf(root: Root) -> SharedNode {
        Arc::new(Node::Leaf(root))
    }

    /// Create a shared pair.
    pub fn pair(left: SharedNode, right: SharedNode) -> SharedNode {
        Arc::new(Node::Pair(PairNode {
            left,
            right,
            root: OnceLock::new(),
        }))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// The pair behind this node, if it is one.
    pub fn as_pair(&self) -> Option<&PairNode> {
        match self {
            Self::Pair(pair) => Some(pair),
            Self::Leaf(_) => None,
        }
    }

    /// Merkle root of the subtree. Leaves return themselves.
    pub fn merkle_root<H: Hasher>(&self, hasher: &H) -> Root {
        match self {
            Self::Leaf(root) => *root,
            Self::Pair(pair) => pair.merkle_root(hasher),
        }
    }

    /// Merkle root, hashing the top `levels` of the tree on the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn merkle_root_parallel<H: Hasher>(&self, hasher: &H, levels: u32) -> Root {
        match self {
            Self::Leaf(root) => *root,
            Self::Pair(pair) if levels == 0 => pair.merkle_root(hasher),
            Self::Pair(pair) => {
                if let Some(root) = pair.cached_root() {
                    return root;
                }
                let (left, right) = rayon::join(
                    || pair.left.merkle_root_parallel(hasher, levels - 1),
                    || pair.right.merkle_root_parallel(hasher, levels - 1),
                );
                *pair.root.get_or_init(|| hasher.hash_64(&left, &right))
            }
        }
    }

    /// Node at `target`, relative to this node.
    ///
    /// Fails with [`TreeError::NavigationFailure`] if a leaf is reached before
    /// the path is exhausted.
    pub fn get(self: &Arc<Self>, target: Gindex) -> Result<SharedNode> {
        let mut current = Arc::clone(self);
        let mut remaining = target.depth();
        for go_right in target.path() {
            let next = match current.as_pair() {
                Some(pair) if go_right => Arc::clone(&pair.right),
                Some(pair) => Arc::clone(&pair.left),
                None => return Err(navigation_failure(target, remaining)),
            };
            current = next;
            remaining -= 1;
        }
        Ok(current)
    }

    /// Rebinder that replaces the node at `target`.
    ///
    /// Strict: every node on the path must be a pair.
    pub fn setter(self: &Arc<Self>, target: Gindex) -> Result<Rebinder> {
        let mut steps = Vec::with_capacity(target.depth() as usize);
        let mut current = Arc::clone(self);
        let mut remaining = target.depth();
        for go_right in target.path() {
            let next = match current.as_pair() {
                Some(pair) => step(pair, go_right, &mut steps),
                None => return Err(navigation_failure(target, remaining)),
            };
            current = next;
            remaining -= 1;
        }
        Ok(rebind::from_steps(steps))
    }

    /// Like [`Node::setter`], but a leaf standing in for an all-zero subtree
    /// is expanded on the way down, with zero hashes as the untouched
    /// siblings.
    ///
    /// Only zero leaves expand, and "zero" is relative to the depth the leaf
    /// stands in for: a leaf `d` levels above the target must hold
    /// `zero_hash(d)`, as [`zero_node(d)`](crate::zero_node) does. An
    /// all-zero chunk is only the zero leaf of depth 0, so above the target it
    /// fails like any other content leaf, with [`TreeError::NavigationFailure`].
    pub fn expand_into<H: Hasher>(self: &Arc<Self>, hasher: &H, target: Gindex) -> Result<Rebinder> {
        let mut steps = Vec::with_capacity(target.depth() as usize);
        let mut current = Arc::clone(self);
        let mut remaining = target.depth();
        let mut path = target.path();

        while let Some(go_right) = path.next() {
            let next = match current.as_pair() {
                Some(pair) => step(pair, go_right, &mut steps),
                None => {
                    let zeros = hasher.zero_hashes();
                    if current.merkle_root(hasher) != zeros.root(remaining) {
                        return Err(navigation_failure(target, remaining));
                    }
                    trace!(gindex = %target, levels = remaining, "expanding zero subtree");
                    let mut go_right = go_right;
                    loop {
                        remaining -= 1;
                        let sibling = zeros.node(remaining);
                        steps.push(if go_right {
                            Rebinder::RebindRight { left: sibling }
                        } else {
                            Rebinder::RebindLeft { right: sibling }
                        });
                        match path.next() {
                            Some(bit) => go_right = bit,
                            None => break,
                        }
                    }
                    break;
                }
            };
            current = next;
            remaining -= 1;
        }
        Ok(rebind::from_steps(steps))
    }
}

/// Record the sibling kept when descending one level, return the child.
fn step(pair: &PairNode, go_right: bool, steps: &mut Vec<Rebinder>) -> SharedNode {
    if go_right {
        steps.push(Rebinder::RebindRight {
            left: Arc::clone(&pair.left),
        });
        Arc::clone(&pair.right)
    } else {
        steps.push(Rebinder::RebindLeft {
            right: Arc::clone(&pair.right),
        });
        Arc::clone(&pair.left)
    }
}

fn navigation_failure(target: Gindex, remaining: u32) -> TreeError {
    TreeError::NavigationFailure {
        gindex: target.get(),
        depth: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{zero_hash, zero_node, Blake3Hasher, Sha256Hasher};
    use alloy_primitives::B256;

    fn gi(v: u64) -> Gindex {
        Gindex::new(v).unwrap()
    }

    fn count_pairs(node: &Node) -> usize {
        match node {
            Node::Leaf(_) => 0,
            Node::Pair(pair) => 1 + count_pairs(pair.left()) + count_pairs(pair.right()),
        }
    }

    fn four_leaves() -> (SharedNode, Vec<SharedNode>) {
        let leaves: Vec<_> = (1u8..=4).map(|i| Node::leaf(B256::repeat_byte(i))).collect();
        let root = Node::pair(
            Node::pair(Arc::clone(&leaves[0]), Arc::clone(&leaves[1])),
            Node::pair(Arc::clone(&leaves[2]), Arc::clone(&leaves[3])),
        );
        (root, leaves)
    }

    #[test]
    fn test_leaf_is_own_root() {
        let leaf = Node::leaf(B256::repeat_byte(0x42));
        assert_eq!(leaf.merkle_root(&Sha256Hasher), B256::repeat_byte(0x42));
    }

    #[test]
    fn test_pair_root_memoized() {
        let hasher = Sha256Hasher;
        let (root, leaves) = four_leaves();
        let pair = root.as_pair().unwrap();
        assert!(pair.cached_root().is_none());

        let left = hasher.hash_64(&leaves[0].merkle_root(&hasher), &leaves[1].merkle_root(&hasher));
        let right = hasher.hash_64(&leaves[2].merkle_root(&hasher), &leaves[3].merkle_root(&hasher));
        let expected = hasher.hash_64(&left, &right);

        assert_eq!(root.merkle_root(&hasher), expected);
        assert_eq!(pair.cached_root(), Some(expected));
        assert_eq!(pair.left().as_pair().unwrap().cached_root(), Some(left));
    }

    #[test]
    fn test_get() {
        let (root, leaves) = four_leaves();
        assert!(Arc::ptr_eq(&root.get(Gindex::ROOT).unwrap(), &root));
        for (i, leaf) in leaves.iter().enumerate() {
            let found = root.get(gi(4 + i as u64)).unwrap();
            assert!(Arc::ptr_eq(&found, leaf));
        }
        assert!(Arc::ptr_eq(
            root.get(gi(2)).unwrap().as_pair().unwrap().right(),
            &leaves[1]
        ));
    }

    #[test]
    fn test_get_through_leaf_fails() {
        let (root, _) = four_leaves();
        assert_eq!(
            root.get(gi(8)).unwrap_err(),
            TreeError::NavigationFailure { gindex: 8, depth: 1 }
        );
    }

    #[test]
    fn test_setter_shares_untouched_subtrees() {
        let hasher = Sha256Hasher;
        let (root, leaves) = four_leaves();
        let old_root = root.merkle_root(&hasher);

        let replacement = Node::leaf(B256::repeat_byte(0xee));
        let new_root = root.setter(gi(6)).unwrap().apply(Arc::clone(&replacement));

        // old snapshot is untouched
        assert_eq!(root.merkle_root(&hasher), old_root);
        assert!(Arc::ptr_eq(&root.get(gi(6)).unwrap(), &leaves[2]));

        // new tree reuses the whole left half and the sibling leaf
        assert!(Arc::ptr_eq(&new_root.get(gi(2)).unwrap(), &root.get(gi(2)).unwrap()));
        assert!(Arc::ptr_eq(&new_root.get(gi(7)).unwrap(), &leaves[3]));
        assert!(Arc::ptr_eq(&new_root.get(gi(6)).unwrap(), &replacement));

        let expected = hasher.hash_64(
            &root.get(gi(2)).unwrap().merkle_root(&hasher),
            &hasher.hash_64(&B256::repeat_byte(0xee), &B256::repeat_byte(4)),
        );
        assert_eq!(new_root.merkle_root(&hasher), expected);
    }

    #[test]
    fn test_setter_on_leaf_fails() {
        let leaf = Node::leaf(Root::ZERO);
        assert!(matches!(leaf.setter(Gindex::ROOT), Ok(Rebinder::Identity)));
        assert_eq!(
            leaf.setter(gi(3)).unwrap_err(),
            TreeError::NavigationFailure { gindex: 3, depth: 1 }
        );
    }

    #[test]
    fn test_expand_into_bare_leaf() {
        let hasher = Sha256Hasher;
        let bare = zero_node(3);
        let target = gi(0b1101);
        let rebinder = bare.expand_into(&hasher, target).unwrap();
        assert_eq!(rebinder.depth(), 3);

        let value = B256::repeat_byte(0x77);
        let root = rebinder.apply(Node::leaf(value));
        assert_eq!(count_pairs(&root), 3);

        // right, left, right
        assert_eq!(root.get(gi(2)).unwrap().merkle_root(&hasher), zero_hash(2));
        assert_eq!(root.get(gi(7)).unwrap().merkle_root(&hasher), zero_hash(1));
        assert_eq!(root.get(gi(12)).unwrap().merkle_root(&hasher), zero_hash(0));

        let mut expected = value;
        expected = hasher.hash_64(&zero_hash(0), &expected);
        expected = hasher.hash_64(&expected, &zero_hash(1));
        expected = hasher.hash_64(&zero_hash(2), &expected);
        assert_eq!(root.merkle_root(&hasher), expected);
    }

    #[test]
    fn test_expand_into_partial_tree() {
        let hasher = Sha256Hasher;
        let root = Node::pair(Node::leaf(B256::repeat_byte(9)), zero_node(2));
        let rebinder = root.expand_into(&hasher, gi(0b1110)).unwrap();
        let updated = rebinder.apply(Node::leaf(B256::repeat_byte(5)));

        // left child kept by reference, right side grew two pairs
        assert!(Arc::ptr_eq(&updated.get(gi(2)).unwrap(), &root.get(gi(2)).unwrap()));
        assert_eq!(count_pairs(&updated), 3);
        assert_eq!(updated.get(gi(0b1110)).unwrap().merkle_root(&hasher), B256::repeat_byte(5));
    }

    #[test]
    fn test_expand_into_rejects_content_leaf() {
        let hasher = Sha256Hasher;
        let leaf = Node::leaf(B256::repeat_byte(1));
        assert_eq!(
            leaf.expand_into(&hasher, gi(4)).unwrap_err(),
            TreeError::NavigationFailure { gindex: 4, depth: 2 }
        );
        assert!(matches!(leaf.expand_into(&hasher, Gindex::ROOT), Ok(Rebinder::Identity)));

        // a zero chunk stands in for depth 0 only
        let chunk = Node::leaf(Root::ZERO);
        assert_eq!(
            chunk.expand_into(&hasher, gi(8)).unwrap_err(),
            TreeError::NavigationFailure { gindex: 8, depth: 3 }
        );
        assert!(zero_node(3).expand_into(&hasher, gi(8)).is_ok());
    }

    #[test]
    fn test_expand_into_uses_hasher_zero_table() {
        let hasher = Blake3Hasher;
        let bare = hasher.zero_hashes().node(2);
        let root = bare.expand_into(&hasher, gi(4)).unwrap().apply(Node::leaf(Root::ZERO));
        assert_eq!(root.merkle_root(&hasher), hasher.zero_hash(2));
    }

    #[test]
    fn test_concurrent_readers_agree() {
        let hasher = Sha256Hasher;
        let (root, _) = four_leaves();
        let roots: Vec<Root> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let root = Arc::clone(&root);
                    scope.spawn(move || root.merkle_root(&hasher))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(roots.windows(2).all(|w| w[0] == w[1]));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_root_matches_serial() {
        let hasher = Sha256Hasher;
        let leaves: Vec<_> = (0u8..64).map(|i| Node::leaf(B256::repeat_byte(i))).collect();
        let tree = subtree_fill_to_contents(&hasher, &leaves, 6).unwrap();
        let copy = subtree_fill_to_contents(&hasher, &leaves, 6).unwrap();
        assert_eq!(tree.merkle_root_parallel(&hasher, 3), copy.merkle_root(&hasher));
    }
}
