use crate::consts::participation::NUM_FLAG_INDICES;
use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};
use ssz::{Decode, DecodeError, Encode};
use tree_hash::{PackedEncoding, TreeHash, TreeHashType};

/// One byte of per-validator participation, one bit per timeliness flag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipationFlags {
    #[serde(with = "serde_utils::quoted_u8")]
    bits: u8,
}

impl ParticipationFlags {
    pub fn add_flag(&mut self, flag_index: usize) -> Result<(), ArithError> {
        if flag_index >= NUM_FLAG_INDICES {
            return Err(ArithError::Overflow);
        }
        self.bits |= 1u8.safe_shl(flag_index as u32)?;
        Ok(())
    }

    pub fn has_flag(&self, flag_index: usize) -> Result<bool, ArithError> {
        if flag_index >= NUM_FLAG_INDICES {
            return Err(ArithError::Overflow);
        }
        let mask = 1u8.safe_shl(flag_index as u32)?;
        Ok(self.bits & mask == mask)
    }

    pub fn into_u8(self) -> u8 {
        self.bits
    }
}

/// Decode implementation that transparently behaves like the inner `u8`.
impl Decode for ParticipationFlags {
    fn is_ssz_fixed_len() -> bool {
        <u8 as Decode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <u8 as Decode>::ssz_fixed_len()
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        u8::from_ssz_bytes(bytes).map(|bits| Self { bits })
    }
}

/// Encode implementation that transparently behaves like the inner `u8`.
impl Encode for ParticipationFlags {
    fn is_ssz_fixed_len() -> bool {
        <u8 as Encode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <u8 as Encode>::ssz_fixed_len()
    }

    fn ssz_bytes_len(&self) -> usize {
        self.bits.ssz_bytes_len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        self.bits.ssz_append(buf);
    }

    fn as_ssz_bytes(&self) -> Vec<u8> {
        self.bits.as_ssz_bytes()
    }
}

impl TreeHash for ParticipationFlags {
    fn tree_hash_type() -> TreeHashType {
        u8::tree_hash_type()
    }

    fn tree_hash_packed_encoding(&self) -> PackedEncoding {
        self.bits.tree_hash_packed_encoding()
    }

    fn tree_hash_packing_factor() -> usize {
        u8::tree_hash_packing_factor()
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        self.bits.tree_hash_root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accumulate() {
        let mut flags = ParticipationFlags::default();
        assert_eq!(flags.has_flag(0), Ok(false));

        flags.add_flag(0).unwrap();
        flags.add_flag(2).unwrap();
        assert_eq!(flags.into_u8(), 0b101);
        assert_eq!(flags.has_flag(0), Ok(true));
        assert_eq!(flags.has_flag(1), Ok(false));
        assert_eq!(flags.has_flag(2), Ok(true));

        // Adding a flag twice is a no-op.
        flags.add_flag(2).unwrap();
        assert_eq!(flags.into_u8(), 0b101);
    }

    #[test]
    fn unknown_flag_index() {
        let mut flags = ParticipationFlags::default();
        assert_eq!(flags.add_flag(NUM_FLAG_INDICES), Err(ArithError::Overflow));
        assert_eq!(flags.has_flag(8), Err(ArithError::Overflow));
    }

    #[test]
    fn encodes_as_u8() {
        let mut flags = ParticipationFlags::default();
        flags.add_flag(1).unwrap();
        assert_eq!(flags.as_ssz_bytes(), vec![0b10]);
        assert_eq!(
            ParticipationFlags::from_ssz_bytes(&[0b10]).unwrap(),
            flags
        );
        assert_eq!(flags.tree_hash_root(), 2u8.tree_hash_root());
    }
}
