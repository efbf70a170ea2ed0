//! Bounded-memory merkleization.
//!
//! Leaves are fed left to right into a stack of at most `cover_depth(limit) + 1`
//! partial roots. Each new leaf carries upward like binary addition: while it is
//! a right child it is hashed with the stored left sibling, and it stops at the
//! first level where it is a left child. Padding to the next power of two and
//! then to the full limit depth uses zero hashes, so a list with a limit of
//! `2^40` costs no more memory than one with a limit of 8.

use tracing::warn;

use crate::{cover_depth, error::Result, Hasher, Root, Sha256Hasher, TreeError};

/// Streaming merkleizer over at most `limit` leaves.
///
/// # Example
///
/// ```
/// use ssz_tree::{merkleize, Merkleizer, Root, Sha256Hasher};
///
/// let mut m: Merkleizer = Merkleizer::new(8);
/// for i in 0..5u8 {
///     m.push(Root::repeat_byte(i)).unwrap();
/// }
/// let root = m.finish();
/// assert_eq!(root, merkleize(&Sha256Hasher, 5, 8, |i| Root::repeat_byte(i as u8)));
/// ```
#[derive(Clone, Debug)]
pub struct Merkleizer<H: Hasher = Sha256Hasher> {
    acc: Accumulator<H>,
}

impl<H: Hasher> Merkleizer<H> {
    /// Create a merkleizer with the default hasher.
    pub fn new(limit: u64) -> Self {
        Self::with_hasher(H::default(), limit)
    }

    /// Create a merkleizer with a custom hasher.
    pub fn with_hasher(hasher: H, limit: u64) -> Self {
        Self {
            acc: Accumulator::new(hasher, limit),
        }
    }

    /// Number of leaves pushed so far.
    pub fn count(&self) -> u64 {
        self.acc.count
    }

    pub fn limit(&self) -> u64 {
        self.acc.limit
    }

    /// Add the next leaf.
    ///
    /// Fails with [`TreeError::CapacityViolation`] once `limit` leaves have
    /// been pushed; the merkleizer is left unchanged.
    pub fn push(&mut self, leaf: Root) -> Result<()> {
        if self.acc.count >= self.acc.limit {
            return Err(TreeError::CapacityViolation {
                length: self.acc.count + 1,
                limit: self.acc.limit,
            });
        }
        self.acc.push(leaf, &mut ignore);
        Ok(())
    }

    /// Pad with zero hashes up to the limit depth and return the root.
    pub fn finish(self) -> Root {
        self.acc.finish(&mut ignore)
    }
}

fn ignore(_level: u32, _position: u64, _root: &Root) {}

/// Root of `count` leaves in a tree sized for `limit` leaves.
///
/// `limit == 0` gives the zero root and `limit == 1` gives `leaf(0)` (or the
/// zero root when `count == 0`). A `count` over `limit` is clamped to `limit`
/// with a warning rather than rejected.
pub fn merkleize<H, F>(hasher: &H, count: u64, limit: u64, leaf: F) -> Root
where
    H: Hasher,
    F: Fn(u64) -> Root,
{
    let count = clamp_count(count, limit);
    let mut acc = Accumulator::new(hasher.clone(), limit);
    for i in 0..count {
        acc.push(leaf(i), &mut ignore);
    }
    acc.finish(&mut ignore)
}

pub(crate) fn clamp_count(count: u64, limit: u64) -> u64 {
    if count > limit {
        warn!(count, limit, "merkleizing more leaves than the limit, clamping");
        limit
    } else {
        count
    }
}

/// Chunk holding `length` as 8 little-endian bytes, zero elsewhere.
pub fn length_chunk(length: u64) -> Root {
    let mut chunk = Root::ZERO;
    chunk[..8].copy_from_slice(&length.to_le_bytes());
    chunk
}

/// Mix a collection length into its content root: `H(root, length_chunk)`.
pub fn mix_in_length<H: Hasher>(hasher: &H, root: &Root, length: u64) -> Root {
    hasher.hash_64(root, &length_chunk(length))
}

/// Chunk holding a union selector in its first byte.
pub fn selector_chunk(selector: u8) -> Root {
    let mut chunk = Root::ZERO;
    chunk[0] = selector;
    chunk
}

/// Mix a union selector into the value root: `H(root, selector_chunk)`.
pub fn mix_in_selector<H: Hasher>(hasher: &H, root: &Root, selector: u8) -> Root {
    hasher.hash_64(root, &selector_chunk(selector))
}

/// Carry-merge stack shared by [`Merkleizer`] and the proof builder.
///
/// Every node the pass produces is reported to a visitor as
/// `(level, position, root)`, where level 0 is the leaves and `position`
/// counts from the left within that level.
#[derive(Clone, Debug)]
pub(crate) struct Accumulator<H> {
    hasher: H,
    limit: u64,
    limit_depth: u32,
    count: u64,
    stack: Vec<Root>,
}

impl<H: Hasher> Accumulator<H> {
    pub(crate) fn new(hasher: H, limit: u64) -> Self {
        let limit_depth = cover_depth(limit);
        Self {
            hasher,
            limit,
            limit_depth,
            count: 0,
            stack: vec![Root::ZERO; limit_depth as usize + 1],
        }
    }

    pub(crate) fn limit_depth(&self) -> u32 {
        self.limit_depth
    }

    /// Caller guarantees `count < limit`.
    pub(crate) fn push<V>(&mut self, leaf: Root, visit: &mut V)
    where
        V: FnMut(u32, u64, &Root),
    {
        let index = self.count;
        visit(0, index, &leaf);
        self.merge(index, leaf, 0, visit);
        self.count += 1;
    }

    pub(crate) fn finish<V>(mut self, visit: &mut V) -> Root
    where
        V: FnMut(u32, u64, &Root),
    {
        let count = self.count;
        let depth = cover_depth(count);
        let zeros = self.hasher.zero_hashes();

        // complete the last partial subtree to a power of two
        if !count.is_power_of_two() {
            let pad = zeros.root(0);
            visit(0, count, &pad);
            self.merge(count, pad, depth, visit);
        }

        // then fold zero subtrees up to the limit depth
        for level in depth..self.limit_depth {
            let zero = zeros.root(level);
            visit(level, 1, &zero);
            let up = self.hasher.hash_64(&self.stack[level as usize], &zero);
            visit(level + 1, 0, &up);
            self.stack[level as usize + 1] = up;
        }

        self.stack[self.limit_depth as usize]
    }

    /// Carry `node` (at leaf position `index`) upward. Below `pad_depth`, a
    /// missing right sibling is filled with the zero hash of that level.
    fn merge<V>(&mut self, index: u64, mut node: Root, pad_depth: u32, visit: &mut V)
    where
        V: FnMut(u32, u64, &Root),
    {
        let mut level = 0u32;
        loop {
            if is_right(index, level) {
                node = self.hasher.hash_64(&self.stack[level as usize], &node);
            } else if level < pad_depth {
                let zero = self.hasher.zero_hash(level);
                visit(level, position(index, level) ^ 1, &zero);
                node = self.hasher.hash_64(&node, &zero);
            } else {
                break;
            }
            level += 1;
            visit(level, position(index, level), &node);
        }
        self.stack[level as usize] = node;
    }
}

/// Position at `level` of the ancestor of leaf `index`.
fn position(index: u64, level: u32) -> u64 {
    index.checked_shr(level).unwrap_or(0)
}

fn is_right(index: u64, level: u32) -> bool {
    position(index, level) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{zero_hash, Blake3Hasher};
    use alloy_primitives::B256;

    fn leaf(i: u64) -> Root {
        let mut chunk = Root::ZERO;
        chunk[24..].copy_from_slice(&(i + 1).to_be_bytes());
        chunk
    }

    /// Naive reference: materialize every level.
    fn naive<H: Hasher>(hasher: &H, count: u64, limit: u64) -> Root {
        let depth = cover_depth(limit);
        let width = 1u64 << depth;
        let mut level: Vec<Root> = (0..width)
            .map(|i| if i < count.min(limit) { leaf(i) } else { Root::ZERO })
            .collect();
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| hasher.hash_64(&pair[0], &pair[1]))
                .collect();
        }
        if limit == 0 {
            Root::ZERO
        } else {
            level[0]
        }
    }

    #[test]
    fn test_small_limits() {
        let hasher = Sha256Hasher;
        assert_eq!(merkleize(&hasher, 0, 0, leaf), Root::ZERO);
        assert_eq!(merkleize(&hasher, 0, 1, leaf), Root::ZERO);
        assert_eq!(merkleize(&hasher, 1, 1, leaf), leaf(0));
        assert_eq!(merkleize(&hasher, 0, 2, leaf), zero_hash(1));
        assert_eq!(
            merkleize(&hasher, 1, 2, leaf),
            hasher.hash_64(&leaf(0), &Root::ZERO)
        );
    }

    #[test]
    fn test_matches_naive() {
        let hasher = Sha256Hasher;
        for limit in 0..=17u64 {
            for count in 0..=limit {
                assert_eq!(
                    merkleize(&hasher, count, limit, leaf),
                    naive(&hasher, count, limit),
                    "count {count} limit {limit}"
                );
            }
        }
    }

    #[test]
    fn test_empty_huge_limit_is_zero_hash() {
        let hasher = Sha256Hasher;
        assert_eq!(merkleize(&hasher, 0, 1 << 40, leaf), zero_hash(40));
        assert_eq!(merkleize(&hasher, 0, u64::MAX, leaf), zero_hash(64));
    }

    #[test]
    fn test_clamps_count_over_limit() {
        let hasher = Sha256Hasher;
        assert_eq!(merkleize(&hasher, 9, 4, leaf), merkleize(&hasher, 4, 4, leaf));
    }

    #[test]
    fn test_streaming_matches_closure() {
        let hasher = Blake3Hasher;
        for count in 0..=10u64 {
            let mut m = Merkleizer::with_hasher(hasher, 16);
            for i in 0..count {
                m.push(leaf(i)).unwrap();
            }
            assert_eq!(m.count(), count);
            assert_eq!(m.finish(), merkleize(&hasher, count, 16, leaf));
        }
    }

    #[test]
    fn test_streaming_rejects_past_limit() {
        let mut m: Merkleizer = Merkleizer::new(2);
        m.push(leaf(0)).unwrap();
        m.push(leaf(1)).unwrap();
        assert_eq!(
            m.push(leaf(2)),
            Err(TreeError::CapacityViolation { length: 3, limit: 2 })
        );
        assert_eq!(m.finish(), merkleize(&Sha256Hasher, 2, 2, leaf));
    }

    #[test]
    fn test_visitor_sees_every_level() {
        let mut acc = Accumulator::new(Sha256Hasher, 8);
        let mut seen = Vec::new();
        let mut record = |level: u32, position: u64, _: &Root| seen.push((level, position));
        for i in 0..3 {
            acc.push(leaf(i), &mut record);
        }
        acc.finish(&mut record);
        for expected in [(0, 0), (0, 1), (1, 0), (0, 2), (0, 3), (1, 1), (2, 0), (2, 1), (3, 0)] {
            assert!(seen.contains(&expected), "missing {expected:?}");
        }
    }

    #[test]
    fn test_mixins() {
        let hasher = Sha256Hasher;
        let root = B256::repeat_byte(7);
        let chunk = length_chunk(0x0102);
        assert_eq!(chunk[0], 0x02);
        assert_eq!(chunk[1], 0x01);
        assert!(chunk[2..].iter().all(|b| *b == 0));
        assert_eq!(mix_in_length(&hasher, &root, 0x0102), hasher.hash_64(&root, &chunk));

        let mut selector = Root::ZERO;
        selector[0] = 3;
        assert_eq!(mix_in_selector(&hasher, &root, 3), hasher.hash_64(&root, &selector));
    }
}
