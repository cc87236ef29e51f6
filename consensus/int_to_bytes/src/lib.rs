//! Little-endian encodings of `u64` padded to the widths used by seed and hash preimages.
use bytes::{BufMut, BytesMut};

/// Returns `int` as little-endian bytes with a length of 1.
pub fn int_to_bytes1(int: u8) -> Vec<u8> {
    vec![int]
}

/// Returns the low 4 bytes of `int`, little-endian.
pub fn int_to_bytes4(int: u32) -> Vec<u8> {
    let mut bytes = BytesMut::with_capacity(4);
    bytes.put_u32_le(int);
    bytes.to_vec()
}

/// Returns `int` as little-endian bytes with a length of 8.
pub fn int_to_bytes8(int: u64) -> Vec<u8> {
    let mut bytes = BytesMut::with_capacity(8);
    bytes.put_u64_le(int);
    bytes.to_vec()
}

/// Returns `int` as little-endian bytes, right-padded with zeros to 32 bytes.
pub fn int_to_bytes32(int: u64) -> Vec<u8> {
    let mut bytes = BytesMut::with_capacity(32);
    bytes.put_u64_le(int);
    bytes.resize(32, 0);
    bytes.to_vec()
}

/// As `int_to_bytes32` but into a fixed array, for callers building `Hash256` values.
pub fn int_to_fixed_bytes32(int: u64) -> [u8; 32] {
    let mut bytes = [0; 32];
    bytes[0..8].copy_from_slice(&int.to_le_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths() {
        assert_eq!(int_to_bytes1(7).len(), 1);
        assert_eq!(int_to_bytes4(7).len(), 4);
        assert_eq!(int_to_bytes8(7).len(), 8);
        assert_eq!(int_to_bytes32(7).len(), 32);
    }

    #[test]
    fn little_endian_vectors() {
        assert_eq!(hex::encode(int_to_bytes4(0x0a0b0c0d)), "0d0c0b0a");
        assert_eq!(
            hex::encode(int_to_bytes8(1_000_000_000)),
            "00ca9a3b00000000"
        );
        assert_eq!(
            hex::encode(int_to_bytes32(u64::MAX)),
            "ffffffffffffffff000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn fixed_matches_vec() {
        for int in [0, 1, 255, 1 << 40, u64::MAX] {
            assert_eq!(int_to_fixed_bytes32(int).to_vec(), int_to_bytes32(int));
        }
    }
}
