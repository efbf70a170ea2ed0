//! Chunking adapters: turn typed values into 32-byte leaves and hash or prove
//! them with [`merkleize`] and [`merkle_proof`].
//!
//! Lists and bitlists are mixed with their length, so their gindices address
//! the mixed tree: the content tree sits under gindex 2 and the length chunk
//! is gindex 3.

use std::sync::Arc;

use crate::{
    bitfield::bitlist_len,
    error::Result,
    merkle::{length_chunk, mix_in_length, mix_in_selector, selector_chunk},
    merkle_proof, merkleize, no_sub_proof, Gindex, Hasher, Node, Proof, Root, Sha256Hasher,
    TreeError,
};

/// Values with a hash tree root.
pub trait HashTreeRoot<H: Hasher = Sha256Hasher> {
    fn hash_tree_root(&self, hasher: &H) -> Root;
}

/// Values that can prove any node below their hash tree root.
pub trait HashTreeProof<H: Hasher = Sha256Hasher>: HashTreeRoot<H> {
    fn hash_tree_proof(&self, hasher: &H, index: Gindex) -> Result<Proof>;
}

impl<H: Hasher> HashTreeRoot<H> for Root {
    fn hash_tree_root(&self, _hasher: &H) -> Root {
        *self
    }
}

impl<H: Hasher> HashTreeProof<H> for Root {
    fn hash_tree_proof(&self, _hasher: &H, index: Gindex) -> Result<Proof> {
        if !index.is_root() {
            return Err(TreeError::NavigationFailure {
                gindex: index.get(),
                depth: index.depth(),
            });
        }
        Ok(Proof::new(Vec::new(), *self))
    }
}

impl<H: Hasher> HashTreeRoot<H> for Node {
    fn hash_tree_root(&self, hasher: &H) -> Root {
        self.merkle_root(hasher)
    }
}

impl<H: Hasher> HashTreeProof<H> for Node {
    /// Walk the path, collecting the root of every sibling passed.
    ///
    /// A leaf standing in for an all-zero subtree is proven through with zero
    /// hashes, so padding positions prove like `merkle_proof` does. Any other
    /// leaf above the target fails with [`TreeError::NavigationFailure`].
    fn hash_tree_proof(&self, hasher: &H, index: Gindex) -> Result<Proof> {
        let mut branch = Vec::with_capacity(index.depth() as usize);
        let mut current = self;
        let mut remaining = index.depth();
        for go_right in index.path() {
            let Some(pair) = current.as_pair() else {
                let zeros = hasher.zero_hashes();
                if current.merkle_root(hasher) != zeros.root(remaining) {
                    return Err(TreeError::NavigationFailure {
                        gindex: index.get(),
                        depth: remaining,
                    });
                }
                branch.extend((0..remaining).rev().map(|depth| zeros.root(depth)));
                break;
            };
            let (next, sibling) = if go_right {
                (pair.right(), pair.left())
            } else {
                (pair.left(), pair.right())
            };
            branch.push(sibling.merkle_root(hasher));
            current = next.as_ref();
            remaining -= 1;
        }
        branch.reverse();
        Ok(Proof::new(branch, self.merkle_root(hasher)))
    }
}

impl<H: Hasher, T: HashTreeRoot<H> + ?Sized> HashTreeRoot<H> for Arc<T> {
    fn hash_tree_root(&self, hasher: &H) -> Root {
        (**self).hash_tree_root(hasher)
    }
}

impl<H: Hasher, T: HashTreeProof<H> + ?Sized> HashTreeProof<H> for Arc<T> {
    fn hash_tree_proof(&self, hasher: &H, index: Gindex) -> Result<Proof> {
        (**self).hash_tree_proof(hasher, index)
    }
}

/// Fixed-size values packed several to a chunk.
pub trait BasicValue: Copy {
    /// Encoded size in bytes, a divisor of 32
    const SIZE: usize;

    /// Write the little-endian encoding into `out`, which is `SIZE` bytes.
    fn write_le(&self, out: &mut [u8]);
}

macro_rules! impl_basic_uint {
    ($($ty:ty),*) => {$(
        impl BasicValue for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn write_le(&self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

impl_basic_uint!(u8, u16, u32, u64, u128);

impl BasicValue for bool {
    const SIZE: usize = 1;

    fn write_le(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }
}

impl<H: Hasher> HashTreeRoot<H> for u64 {
    fn hash_tree_root(&self, _hasher: &H) -> Root {
        basic_chunk(std::slice::from_ref(self), 0)
    }
}

impl<H: Hasher> HashTreeRoot<H> for bool {
    fn hash_tree_root(&self, _hasher: &H) -> Root {
        basic_chunk(std::slice::from_ref(self), 0)
    }
}

fn ceil_div(n: u64, d: u64) -> u64 {
    n / d + u64::from(n % d != 0)
}

/// Chunks needed for `length` packed values of `T`.
pub fn basic_chunk_count<T: BasicValue>(length: u64) -> u64 {
    ceil_div(length, (32 / T::SIZE) as u64)
}

/// Chunks needed for `length` bytes.
pub fn byte_chunk_count(length: u64) -> u64 {
    ceil_div(length, 32)
}

/// Chunks needed for `bits` packed bits.
pub fn bit_chunk_count(bits: u64) -> u64 {
    ceil_div(bits, 256)
}

/// Chunk `i` of the packed values, zero-padded past the end.
pub fn basic_chunk<T: BasicValue>(values: &[T], i: u64) -> Root {
    let per_chunk = 32 / T::SIZE;
    let mut chunk = Root::ZERO;
    let start = (i as usize).saturating_mul(per_chunk);
    if let Some(values) = values.get(start..) {
        for (slot, value) in chunk.chunks_exact_mut(T::SIZE).zip(values) {
            value.write_le(slot);
        }
    }
    chunk
}

/// Chunk `i` of raw bytes, zero-padded past the end.
pub fn byte_chunk(bytes: &[u8], i: u64) -> Root {
    basic_chunk(bytes, i)
}

/// Hash tree root of a fixed-length container given its field roots, in
/// order.
///
/// Zero fields hash to the zero root and one field to its own root.
pub fn fields_root<H: Hasher>(hasher: &H, fields: &[&dyn HashTreeRoot<H>]) -> Root {
    match fields {
        [] => Root::ZERO,
        [only] => only.hash_tree_root(hasher),
        [a, b] => hasher.hash_64(&a.hash_tree_root(hasher), &b.hash_tree_root(hasher)),
        _ => {
            let n = fields.len() as u64;
            merkleize(hasher, n, n, |i| fields[i as usize].hash_tree_root(hasher))
        }
    }
}

/// Proof for `index` in a container, descending into fields as needed.
pub fn fields_proof<H: Hasher>(
    hasher: &H,
    index: Gindex,
    fields: &[&dyn HashTreeProof<H>],
) -> Result<Proof> {
    let n = fields.len() as u64;
    merkle_proof(
        hasher,
        n,
        n,
        index,
        |i| fields[i as usize].hash_tree_root(hasher),
        |i, inner| fields[i as usize].hash_tree_proof(hasher, inner).map(Some),
    )
}

/// Root of a vector of composite elements.
pub fn complex_vector_root<H: Hasher, T: HashTreeRoot<H>>(hasher: &H, elements: &[T]) -> Root {
    let n = elements.len() as u64;
    merkleize(hasher, n, n, |i| elements[i as usize].hash_tree_root(hasher))
}

/// Proof into a vector of composite elements.
pub fn complex_vector_proof<H: Hasher, T: HashTreeProof<H>>(
    hasher: &H,
    elements: &[T],
    index: Gindex,
) -> Result<Proof> {
    let n = elements.len() as u64;
    complex_proof(hasher, elements, n, index)
}

/// Root of a list of composite elements with capacity `limit`.
pub fn complex_list_root<H: Hasher, T: HashTreeRoot<H>>(
    hasher: &H,
    elements: &[T],
    limit: u64,
) -> Root {
    let n = elements.len() as u64;
    let content = merkleize(hasher, n, limit, |i| elements[i as usize].hash_tree_root(hasher));
    mix_in_length(hasher, &content, n)
}

/// Proof into a list of composite elements with capacity `limit`.
pub fn complex_list_proof<H: Hasher, T: HashTreeProof<H>>(
    hasher: &H,
    elements: &[T],
    limit: u64,
    index: Gindex,
) -> Result<Proof> {
    let n = elements.len() as u64;
    mixed_proof(hasher, index, length_chunk(n), |content| {
        complex_proof(hasher, elements, limit, content)
    })
}

fn complex_proof<H: Hasher, T: HashTreeProof<H>>(
    hasher: &H,
    elements: &[T],
    limit: u64,
    index: Gindex,
) -> Result<Proof> {
    merkle_proof(
        hasher,
        elements.len() as u64,
        limit,
        index,
        |i| elements[i as usize].hash_tree_root(hasher),
        |i, inner| elements[i as usize].hash_tree_proof(hasher, inner).map(Some),
    )
}

/// Root of a vector of basic values.
pub fn basic_vector_root<H: Hasher, T: BasicValue>(hasher: &H, values: &[T]) -> Root {
    let chunks = basic_chunk_count::<T>(values.len() as u64);
    merkleize(hasher, chunks, chunks, |i| basic_chunk(values, i))
}

/// Proof into a vector of basic values, down to chunk level.
pub fn basic_vector_proof<H: Hasher, T: BasicValue>(
    hasher: &H,
    values: &[T],
    index: Gindex,
) -> Result<Proof> {
    let chunks = basic_chunk_count::<T>(values.len() as u64);
    merkle_proof(hasher, chunks, chunks, index, |i| basic_chunk(values, i), no_sub_proof)
}

/// Root of a list of basic values with capacity `limit` values.
pub fn basic_list_root<H: Hasher, T: BasicValue>(hasher: &H, values: &[T], limit: u64) -> Root {
    let length = values.len() as u64;
    let content = merkleize(
        hasher,
        basic_chunk_count::<T>(length),
        basic_chunk_count::<T>(limit),
        |i| basic_chunk(values, i),
    );
    mix_in_length(hasher, &content, length)
}

/// Proof into a list of basic values with capacity `limit` values.
pub fn basic_list_proof<H: Hasher, T: BasicValue>(
    hasher: &H,
    values: &[T],
    limit: u64,
    index: Gindex,
) -> Result<Proof> {
    let length = values.len() as u64;
    mixed_proof(hasher, index, length_chunk(length), |content| {
        merkle_proof(
            hasher,
            basic_chunk_count::<T>(length),
            basic_chunk_count::<T>(limit),
            content,
            |i| basic_chunk(values, i),
            no_sub_proof,
        )
    })
}

/// Root of a fixed-length byte vector.
pub fn byte_vector_root<H: Hasher>(hasher: &H, bytes: &[u8]) -> Root {
    basic_vector_root(hasher, bytes)
}

/// Proof into a fixed-length byte vector.
pub fn byte_vector_proof<H: Hasher>(hasher: &H, bytes: &[u8], index: Gindex) -> Result<Proof> {
    basic_vector_proof(hasher, bytes, index)
}

/// Root of a byte list of at most `limit` bytes.
pub fn byte_list_root<H: Hasher>(hasher: &H, bytes: &[u8], limit: u64) -> Root {
    basic_list_root(hasher, bytes, limit)
}

/// Proof into a byte list of at most `limit` bytes.
pub fn byte_list_proof<H: Hasher>(
    hasher: &H,
    bytes: &[u8],
    limit: u64,
    index: Gindex,
) -> Result<Proof> {
    basic_list_proof(hasher, bytes, limit, index)
}

/// Root of a packed bitvector. No delimiter; unused bits must already be zero.
pub fn bitvector_root<H: Hasher>(hasher: &H, bits: &[u8]) -> Root {
    byte_vector_root(hasher, bits)
}

pub fn bitvector_proof<H: Hasher>(hasher: &H, bits: &[u8], index: Gindex) -> Result<Proof> {
    byte_vector_proof(hasher, bits, index)
}

/// Chunk `i` of a bitlist with the delimiter bit cleared.
fn bitlist_chunk(bits: &[u8], bit_len: u64, i: u64) -> Root {
    let mut chunk = byte_chunk(bits, i);
    if i == bit_len >> 8 {
        let pos = bit_len & 0xff;
        chunk[(pos >> 3) as usize] &= !(1u8 << (pos & 7));
    }
    chunk
}

/// Root of a bitlist of at most `bit_limit` bits, delimiter excluded and
/// bit length mixed in.
pub fn bitlist_root<H: Hasher>(hasher: &H, bits: &[u8], bit_limit: u64) -> Root {
    let bit_len = bitlist_len(bits);
    let content = merkleize(
        hasher,
        bit_chunk_count(bit_len),
        bit_chunk_count(bit_limit),
        |i| bitlist_chunk(bits, bit_len, i),
    );
    mix_in_length(hasher, &content, bit_len)
}

pub fn bitlist_proof<H: Hasher>(
    hasher: &H,
    bits: &[u8],
    bit_limit: u64,
    index: Gindex,
) -> Result<Proof> {
    let bit_len = bitlist_len(bits);
    mixed_proof(hasher, index, length_chunk(bit_len), |content| {
        merkle_proof(
            hasher,
            bit_chunk_count(bit_len),
            bit_chunk_count(bit_limit),
            content,
            |i| bitlist_chunk(bits, bit_len, i),
            no_sub_proof,
        )
    })
}

/// Root of a union: the value root (zero for the empty variant) mixed with
/// the selector.
pub fn union_root<H: Hasher>(hasher: &H, selector: u8, value: Option<&dyn HashTreeRoot<H>>) -> Root {
    let value = value.map_or(Root::ZERO, |v| v.hash_tree_root(hasher));
    mix_in_selector(hasher, &value, selector)
}

/// Proof into a union.
pub fn union_proof<H: Hasher>(
    hasher: &H,
    selector: u8,
    value: Option<&dyn HashTreeProof<H>>,
    index: Gindex,
) -> Result<Proof> {
    mixed_proof(hasher, index, selector_chunk(selector), |inner| match value {
        Some(value) => value.hash_tree_proof(hasher, inner),
        None => <Root as HashTreeProof<H>>::hash_tree_proof(&Root::ZERO, hasher, inner),
    })
}

/// Proof for `index` in a tree `H(content, mixin)`, delegating the left side
/// to `content`, which proves gindices relative to the content root.
fn mixed_proof<H, F>(hasher: &H, index: Gindex, mixin: Root, content: F) -> Result<Proof>
where
    H: Hasher,
    F: FnOnce(Gindex) -> Result<Proof>,
{
    let Some(inner) = index.subtree() else {
        let proof = content(Gindex::ROOT)?;
        return Ok(Proof::new(Vec::new(), hasher.hash_64(&proof.root, &mixin)));
    };
    if index.is_left() {
        return Ok(content(inner)?.mix_in(hasher, mixin));
    }
    if inner.is_root() {
        let proof = content(Gindex::ROOT)?;
        let root = hasher.hash_64(&proof.root, &mixin);
        return Ok(Proof::new(vec![proof.root], root));
    }
    Err(TreeError::NavigationFailure {
        gindex: index.get(),
        depth: inner.depth(),
    })
}
