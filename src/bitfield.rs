//! Packed bit helpers for bit vectors and bit lists.
//!
//! Bits are packed least significant first within each byte. A bitlist
//! carries one extra delimiter bit, the highest set bit of its last byte,
//! which marks the length and is not part of the content.

use crate::{error::Result, TreeError};

/// Index (0..8) of the highest set bit of `v`, 0 for `v == 0`.
pub const fn bit_index(v: u8) -> u64 {
    if v == 0 {
        0
    } else {
        7 - v.leading_zeros() as u64
    }
}

/// Bit `i` of `bits`.
///
/// # Panics
///
/// If `i` is past the end of `bits`.
pub fn get_bit(bits: &[u8], i: u64) -> bool {
    (bits[(i >> 3) as usize] >> (i & 7)) & 1 == 1
}

/// Set or clear bit `i` of `bits`.
///
/// # Panics
///
/// If `i` is past the end of `bits`.
pub fn set_bit(bits: &mut [u8], i: u64, value: bool) {
    let mask = 1u8 << (i & 7);
    let byte = &mut bits[(i >> 3) as usize];
    if value {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

/// Whether every content bit of a bitlist is zero.
///
/// Empty input and a last byte of zero (no delimiter, so not a valid bitlist)
/// both count as zero.
pub fn is_zero_bitlist(bits: &[u8]) -> bool {
    let Some((&last, rest)) = bits.split_last() else {
        return true;
    };
    if rest.iter().any(|b| *b != 0) {
        return false;
    }
    if last == 0 {
        return true;
    }
    last ^ (1 << bit_index(last)) == 0
}

/// Number of content bits in a bitlist, from the position of its delimiter.
pub fn bitlist_len(bits: &[u8]) -> u64 {
    match bits.split_last() {
        Some((&last, rest)) => (rest.len() as u64) * 8 + bit_index(last),
        None => 0,
    }
}

/// Check that `bits` is a bitlist of at most `limit` bits.
pub fn bitlist_check(bits: &[u8], limit: u64) -> Result<()> {
    let Some(&last) = bits.last() else {
        return Err(TreeError::InvalidBitlist("no delimiter bit in empty input".into()));
    };
    if last == 0 {
        return Err(TreeError::InvalidBitlist(format!(
            "last byte of {} is zero, delimiter bit missing",
            bits.len()
        )));
    }
    let length = bitlist_len(bits);
    if length > limit {
        return Err(TreeError::CapacityViolation { length, limit });
    }
    Ok(())
}

/// Number of set content bits, excluding the delimiter.
pub fn bitlist_ones_count(bits: &[u8]) -> u64 {
    bitvector_ones_count(bits).saturating_sub(1)
}

/// Number of set bits.
pub fn bitvector_ones_count(bits: &[u8]) -> u64 {
    bits.iter().map(|b| b.count_ones() as u64).sum()
}

/// Check that `bits` is a bitvector of exactly `n` bits with zero padding.
pub fn bitvector_check(bits: &[u8], n: u64) -> Result<()> {
    bitvector_check_byte_len(bits.len() as u64, n)?;
    match bits.last() {
        Some(&last) => bitvector_check_last_byte(last, n),
        None => Ok(()),
    }
}

/// Check that `byte_len` bytes is exactly enough for `n` bits.
pub fn bitvector_check_byte_len(byte_len: u64, n: u64) -> Result<()> {
    let expected = n / 8 + u64::from(n % 8 != 0);
    if byte_len != expected {
        return Err(TreeError::InvalidBitvector(format!(
            "{byte_len} bytes, expected {expected} for {n} bits"
        )));
    }
    Ok(())
}

/// Check that the unused high bits of the last byte of an `n`-bit vector are zero.
pub fn bitvector_check_last_byte(last: u8, n: u64) -> Result<()> {
    if n == 0 {
        return Err(TreeError::InvalidBitvector(
            "empty bitvector has no last byte".into(),
        ));
    }
    let used = n & 7;
    if used != 0 && last >> used != 0 {
        return Err(TreeError::InvalidBitvector(format!(
            "last byte {last:#010b} has bits set past the first {used}"
        )));
    }
    Ok(())
}

/// Whether `a` has every bit that `b` has.
///
/// Fails with [`TreeError::BitfieldMismatch`] unless both are non-empty and
/// of the same byte length.
pub fn covers(a: &[u8], b: &[u8]) -> Result<bool> {
    if a.is_empty() || a.len() != b.len() {
        return Err(TreeError::BitfieldMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b).all(|(x, y)| y & !x == 0))
}
