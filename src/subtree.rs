//! Index-addressed views over persistent trees.
//!
//! [`SubtreeView`] addresses the bottom nodes of a fixed-depth tree by
//! position. [`ListTree`] adds a length mixin on top and grows lazily: an
//! empty list is two leaves, and appending materializes only the path to the
//! new element.
//!
//! | Operation | Time            | New nodes       |
//! |-----------|-----------------|-----------------|
//! | `get`     | O(limit depth)  | 0               |
//! | `set`     | O(limit depth)  | limit depth     |
//! | `append`  | O(limit depth)  | limit depth + 2 |
//! | `pop`     | O(limit depth)  | limit depth + 2 |

use std::sync::Arc;

use crate::{
    cover_depth, error::Result, merkle::length_chunk, Gindex, Hasher, Node, Root, Sha256Hasher,
    SharedNode, TreeError,
};

/// Gindex of the length chunk in a length-mixed tree.
const LENGTH_GINDEX: Gindex = match Gindex::ROOT.right() {
    Some(g) => g,
    None => Gindex::ROOT,
};

/// Positional access to the nodes at the bottom of a tree of fixed depth.
#[derive(Clone, Debug)]
pub struct SubtreeView {
    backing: SharedNode,
    depth: u32,
}

impl SubtreeView {
    pub fn new(backing: SharedNode, depth: u32) -> Self {
        Self { backing, depth }
    }

    /// Current root node. Older roots handed out before a write stay valid.
    pub fn backing(&self) -> &SharedNode {
        &self.backing
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Node at bottom position `i`.
    pub fn get(&self, i: u64) -> Result<SharedNode> {
        self.backing.get(Gindex::from_index(i, self.depth)?)
    }

    /// Replace the node at bottom position `i`.
    pub fn set(&mut self, i: u64, node: SharedNode) -> Result<()> {
        let setter = self.backing.setter(Gindex::from_index(i, self.depth)?)?;
        self.backing = setter.apply(node);
        Ok(())
    }

    /// Copy the bottom chunks, left to right, into `dest` until it is full.
    ///
    /// Fails with [`TreeError::NotALeaf`] if a chunk position holds a pair.
    pub fn read_bytes(&self, dest: &mut [u8]) -> Result<()> {
        for (i, out) in dest.chunks_mut(32).enumerate() {
            let gindex = Gindex::from_index(i as u64, self.depth)?;
            match &*self.backing.get(gindex)? {
                Node::Leaf(chunk) => out.copy_from_slice(&chunk[..out.len()]),
                Node::Pair(_) => return Err(TreeError::NotALeaf { gindex: gindex.get() }),
            }
        }
        Ok(())
    }

    pub fn root<H: Hasher>(&self, hasher: &H) -> Root {
        self.backing.merkle_root(hasher)
    }
}

/// A list of up to `limit` nodes, backed by `H(content, length_chunk)`.
///
/// # Example
///
/// ```
/// use ssz_tree::{complex_list_root, ListTree, Node, Root, Sha256Hasher};
///
/// let mut list: ListTree = ListTree::new(1024);
/// list.append(Node::leaf(Root::repeat_byte(1))).unwrap();
/// list.append(Node::leaf(Root::repeat_byte(2))).unwrap();
///
/// let elements = [Root::repeat_byte(1), Root::repeat_byte(2)];
/// assert_eq!(list.root(), complex_list_root(&Sha256Hasher, &elements, 1024));
/// ```
#[derive(Clone, Debug)]
pub struct ListTree<H: Hasher = Sha256Hasher> {
    view: SubtreeView,
    limit: u64,
    length: u64,
    hasher: H,
}

impl<H: Hasher> ListTree<H> {
    /// Empty list with the default hasher.
    pub fn new(limit: u64) -> Self {
        Self::with_hasher(H::default(), limit)
    }

    /// Empty list with a custom hasher.
    pub fn with_hasher(hasher: H, limit: u64) -> Self {
        let limit_depth = cover_depth(limit);
        let zeros = hasher.zero_hashes();
        let backing = Node::pair(zeros.node(limit_depth), zeros.node(0));
        Self {
            view: SubtreeView::new(backing, limit_depth + 1),
            limit,
            length: 0,
            hasher,
        }
    }

    /// Wrap an existing length-mixed tree, reading its length chunk.
    pub fn from_backing(hasher: H, backing: SharedNode, limit: u64) -> Result<Self> {
        let length = match &*backing.get(LENGTH_GINDEX)? {
            Node::Leaf(chunk) => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&chunk[..8]);
                u64::from_le_bytes(bytes)
            }
            Node::Pair(_) => {
                return Err(TreeError::NotALeaf {
                    gindex: LENGTH_GINDEX.get(),
                })
            }
        };
        if length > limit {
            return Err(TreeError::CapacityViolation { length, limit });
        }
        Ok(Self {
            view: SubtreeView::new(backing, cover_depth(limit) + 1),
            limit,
            length,
            hasher,
        })
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn backing(&self) -> &SharedNode {
        self.view.backing()
    }

    /// Element `i`.
    pub fn get(&self, i: u64) -> Result<SharedNode> {
        self.check_index(i)?;
        self.view.get(i)
    }

    /// Replace element `i`.
    pub fn set(&mut self, i: u64, node: SharedNode) -> Result<()> {
        self.check_index(i)?;
        self.view.set(i, node)
    }

    /// Add `node` at the end, growing the tree along its path only.
    pub fn append(&mut self, node: SharedNode) -> Result<()> {
        if self.length >= self.limit {
            return Err(TreeError::CapacityViolation {
                length: self.length + 1,
                limit: self.limit,
            });
        }
        let target = Gindex::from_index(self.length, self.view.depth)?;
        let rebinder = self.view.backing.expand_into(&self.hasher, target)?;
        let backing = rebinder.apply(node);
        self.view.backing = with_length(&backing, self.length + 1)?;
        self.length += 1;
        Ok(())
    }

    /// Remove and return the last element, zeroing its slot.
    pub fn pop(&mut self) -> Result<SharedNode> {
        let Some(last) = self.length.checked_sub(1) else {
            return Err(TreeError::IndexOutOfBounds {
                index: 0,
                length: 0,
            });
        };
        let target = Gindex::from_index(last, self.view.depth)?;
        let popped = self.view.backing.get(target)?;
        let backing = self
            .view
            .backing
            .setter(target)?
            .apply(self.hasher.zero_hashes().node(0));
        self.view.backing = with_length(&backing, last)?;
        self.length = last;
        Ok(popped)
    }

    /// Hash tree root of the list.
    pub fn root(&self) -> Root {
        self.view.root(&self.hasher)
    }

    fn check_index(&self, i: u64) -> Result<()> {
        if i >= self.length {
            return Err(TreeError::IndexOutOfBounds {
                index: i,
                length: self.length,
            });
        }
        Ok(())
    }
}

fn with_length(backing: &SharedNode, length: u64) -> Result<SharedNode> {
    let setter = backing.setter(LENGTH_GINDEX)?;
    Ok(setter.apply(Arc::new(Node::Leaf(length_chunk(length)))))
}
