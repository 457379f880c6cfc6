/// Hashes a fixed-width key by value.
///
/// This is the murmur3 64-bit finalizer. It is cheap, and every input bit
/// affects the low bits that pick the slot.
#[inline]
pub fn hash_scalar(value: u64) -> u64 {
    let mut k = value;
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// Hashes a variable-length key by content.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(bytes)
}
