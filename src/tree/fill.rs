//! Balanced subtree construction helpers.

use std::sync::Arc;

use crate::{error::Result, Hasher, TreeError};

use super::{Node, SharedNode};

/// `2^depth`, or `None` when it does not fit in a `u64`.
fn capacity(depth: u32) -> Option<u64> {
    1u64.checked_shl(depth)
}

/// Full subtree of `depth` levels with `bottom` repeated in every leaf slot.
///
/// Every level is a single pair pointing twice at the level below, so this
/// allocates `depth` nodes no matter how many slots it covers.
pub fn subtree_fill_to_depth(bottom: SharedNode, depth: u32) -> SharedNode {
    let mut node = bottom;
    for _ in 0..depth {
        node = Node::pair(Arc::clone(&node), node);
    }
    node
}

/// Subtree of `depth` levels whose first `length` slots hold `bottom` and
/// whose remaining slots are zero.
pub fn subtree_fill_to_length<H: Hasher>(
    hasher: &H,
    bottom: SharedNode,
    depth: u32,
    length: u64,
) -> Result<SharedNode> {
    let anchor = capacity(depth);
    if let Some(anchor) = anchor {
        if length > anchor {
            return Err(TreeError::CapacityViolation {
                length,
                limit: anchor,
            });
        }
        if length == anchor {
            return Ok(subtree_fill_to_depth(bottom, depth));
        }
    }
    if length == 0 {
        return Ok(hasher.zero_hashes().node(depth));
    }
    // length > 0 and below capacity, so depth >= 1
    let pivot = 1u64 << (depth - 1);
    if length <= pivot {
        let left = subtree_fill_to_length(hasher, bottom, depth - 1, length)?;
        Ok(Node::pair(left, hasher.zero_hashes().node(depth - 1)))
    } else {
        let left = subtree_fill_to_depth(Arc::clone(&bottom), depth - 1);
        let right = subtree_fill_to_length(hasher, bottom, depth - 1, length - pivot)?;
        Ok(Node::pair(left, right))
    }
}

/// Subtree of `depth` levels holding `nodes` left to right, zero-padded.
///
/// Fails with [`TreeError::EmptyContents`] for an empty slice and
/// [`TreeError::CapacityViolation`] if more than `2^depth` nodes are given.
pub fn subtree_fill_to_contents<H: Hasher>(
    hasher: &H,
    nodes: &[SharedNode],
    depth: u32,
) -> Result<SharedNode> {
    if nodes.is_empty() {
        return Err(TreeError::EmptyContents);
    }
    let length = nodes.len() as u64;
    if let Some(anchor) = capacity(depth) {
        if length > anchor {
            return Err(TreeError::CapacityViolation {
                length,
                limit: anchor,
            });
        }
    }
    if depth == 0 {
        return Ok(Arc::clone(&nodes[0]));
    }
    let pivot = 1u64 << (depth - 1);
    if length <= pivot {
        let left = subtree_fill_to_contents(hasher, nodes, depth - 1)?;
        Ok(Node::pair(left, hasher.zero_hashes().node(depth - 1)))
    } else {
        let (left, right) = nodes.split_at(pivot as usize);
        let left = subtree_fill_to_contents(hasher, left, depth - 1)?;
        let right = subtree_fill_to_contents(hasher, right, depth - 1)?;
        Ok(Node::pair(left, right))
    }
}
