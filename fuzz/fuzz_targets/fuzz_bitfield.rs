#![no_main]

use libfuzzer_sys::fuzz_target;
use ssz_tree::{
    bitlist_check, bitlist_len, bitlist_ones_count, bitlist_root, bitvector_check,
    bitvector_ones_count, get_bit, is_zero_bitlist, Sha256Hasher,
};

/// Bitfield helpers never panic and agree with each other on valid input
fuzz_target!(|data: &[u8]| {
    let Some((&limit_byte, bits)) = data.split_first() else {
        return;
    };
    let limit = u64::from(limit_byte) * 8;

    if bitlist_check(bits, limit).is_ok() {
        let len = bitlist_len(bits);
        assert!(len <= limit);
        let ones = (0..len).filter(|&i| get_bit(bits, i)).count() as u64;
        assert_eq!(bitlist_ones_count(bits), ones);
        assert_eq!(is_zero_bitlist(bits), ones == 0);
        let _ = bitlist_root(&Sha256Hasher, bits, limit);
    }

    let bit_len = (bits.len() as u64 * 8).saturating_sub(u64::from(limit_byte % 8));
    if bitvector_check(bits, bit_len).is_ok() {
        let ones = (0..bit_len).filter(|&i| get_bit(bits, i)).count() as u64;
        assert_eq!(bitvector_ones_count(bits), ones);
    }
});
