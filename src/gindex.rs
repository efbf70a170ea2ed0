//! Generalized indices.
//!
//! A gindex addresses a node in a binary tree with a single integer: the most
//! significant set bit is the anchor and marks the depth, the bits below it are
//! the path from the root (0 = left, 1 = right). The root is `1`, its children
//! `2` and `3`, and so on.

use std::fmt;

use crate::error::{Result, TreeError};

/// Smallest depth that covers `v` leaves: `ceil(log2(v))`, and 0 for `v <= 1`.
pub const fn cover_depth(v: u64) -> u32 {
    if v <= 1 {
        0
    } else {
        64 - (v - 1).leading_zeros()
    }
}

/// Number of bits needed to represent `v`.
pub const fn bit_length(v: u64) -> u32 {
    64 - v.leading_zeros()
}

/// Position of the most significant set bit, 0 for `v == 0`.
pub const fn msb_index(v: u64) -> u32 {
    if v == 0 {
        0
    } else {
        63 - v.leading_zeros()
    }
}

/// A generalized index that fits in 64 bits (depth 0 to 63).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gindex(u64);

impl Gindex {
    /// The root of the tree.
    pub const ROOT: Self = Self(1);

    /// Wrap a raw gindex value. Fails for 0, which addresses nothing.
    pub fn new(value: u64) -> Result<Self> {
        if value == 0 {
            return Err(TreeError::InvalidGindex(value));
        }
        Ok(Self(value))
    }

    /// Gindex of the `index`-th node at `depth`.
    ///
    /// Fails with [`TreeError::MalformedIndex`] if `depth >= 64` or
    /// `index >= 2^depth`.
    pub fn from_index(index: u64, depth: u32) -> Result<Self> {
        if depth >= 64 {
            return Err(TreeError::MalformedIndex { index, depth });
        }
        let anchor = 1u64 << depth;
        if index >= anchor {
            return Err(TreeError::MalformedIndex { index, depth });
        }
        Ok(Self(anchor | index))
    }

    /// The raw integer.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Depth below the root: `floor(log2(gindex))`.
    pub const fn depth(self) -> u32 {
        msb_index(self.0)
    }

    /// Anchor: same depth, position zeroed out.
    pub const fn anchor(self) -> Self {
        Self(1 << self.depth())
    }

    /// Position within its level, counted from the left.
    pub const fn base_index(self) -> u64 {
        self.0 ^ (1 << self.depth())
    }

    pub const fn is_root(self) -> bool {
        self.0 == 1
    }

    /// Direct child of the root.
    pub const fn is_close(self) -> bool {
        self.0 == 2 || self.0 == 3
    }

    /// The first step from the root goes left.
    ///
    /// Meaningless for the root itself, which reports `false`.
    pub const fn is_left(self) -> bool {
        let depth = self.depth();
        depth > 0 && self.0 & (1 << (depth - 1)) == 0
    }

    /// The last step into this node goes left (the node is a left child).
    pub const fn is_left_leaf(self) -> bool {
        self.0 & 1 == 0
    }

    /// Left child, `None` if it would not fit in 64 bits.
    pub const fn left(self) -> Option<Self> {
        match self.0.checked_mul(2) {
            Some(v) if self.depth() < 63 => Some(Self(v)),
            _ => None,
        }
    }

    /// Right child, `None` if it would not fit in 64 bits.
    pub const fn right(self) -> Option<Self> {
        match self.left() {
            Some(left) => Some(Self(left.0 | 1)),
            None => None,
        }
    }

    /// Parent. The root maps to itself.
    pub const fn parent(self) -> Self {
        if self.0 == 1 {
            self
        } else {
            Self(self.0 >> 1)
        }
    }

    /// The other child of the same parent. The root is its own sibling.
    pub const fn sibling(self) -> Self {
        if self.0 == 1 {
            self
        } else {
            Self(self.0 ^ 1)
        }
    }

    /// Same path with the first step removed: the position of this node
    /// relative to the child of the root it lies under. `None` for the root.
    pub const fn subtree(self) -> Option<Self> {
        if self.0 == 1 {
            return None;
        }
        let anchor = 1u64 << self.depth();
        Some(Self((self.0 ^ anchor) | (anchor >> 1)))
    }

    /// Split at `boundary` depth into the ancestor at that depth and the
    /// remaining path re-based as a root-relative gindex.
    ///
    /// Nodes at or above the boundary split into `(self, ROOT)`.
    pub const fn split(self, boundary: u32) -> (Self, Self) {
        let depth = self.depth();
        if depth <= boundary {
            return (self, Self::ROOT);
        }
        let shift = depth - boundary;
        let anchor = 1u64 << shift;
        let outer = Self(self.0 >> shift);
        let inner = Self((self.0 & (anchor - 1)) | anchor);
        (outer, inner)
    }

    /// Whether `self` is on the Merkle path of `target`: the sibling of
    /// `target` or of one of its ancestors.
    pub const fn is_proof(self, target: Self) -> bool {
        let depth = self.depth();
        let target_depth = target.depth();
        if depth == 0 || depth > target_depth {
            return false;
        }
        let ancestor = target.0 >> (target_depth - depth);
        self.0 == ancestor ^ 1
    }

    /// Path from the root, one `bool` per level (`true` = right).
    pub fn path(self) -> impl DoubleEndedIterator<Item = bool> + ExactSizeIterator {
        let depth = self.depth();
        let value = self.0;
        (0..depth).rev().map(move |bit| (value >> bit) & 1 == 1)
    }

    /// Big-endian bytes without leading zero bytes.
    pub fn to_be_bytes(self) -> Vec<u8> {
        let bytes = self.0.to_be_bytes();
        let skip = (self.0.leading_zeros() / 8) as usize;
        bytes[skip..].to_vec()
    }

    /// Little-endian bytes without trailing zero bytes.
    pub fn to_le_bytes(self) -> Vec<u8> {
        let mut bytes = self.to_be_bytes();
        bytes.reverse();
        bytes
    }
}

impl TryFrom<u64> for Gindex {
    type Error = TreeError;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Gindex> for u64 {
    fn from(gindex: Gindex) -> Self {
        gindex.0
    }
}

impl fmt::Debug for Gindex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gindex({:#b})", self.0)
    }
}

impl fmt::Display for Gindex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
