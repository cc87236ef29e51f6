use crate::{Error, SIGNATURE_BYTES_LEN};

/// An opaque signature of `SIGNATURE_BYTES_LEN` bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureBytes {
    bytes: Box<[u8; SIGNATURE_BYTES_LEN]>,
}

impl SignatureBytes {
    /// The all-zero signature. No backend accepts it.
    pub fn empty() -> Self {
        Self {
            bytes: Box::new([0; SIGNATURE_BYTES_LEN]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    pub fn as_serialized(&self) -> &[u8] {
        &self.bytes[..]
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SIGNATURE_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: SIGNATURE_BYTES_LEN,
            });
        }
        let mut signature = Self::empty();
        signature.bytes.copy_from_slice(bytes);
        Ok(signature)
    }
}

impl Default for SignatureBytes {
    fn default() -> Self {
        Self::empty()
    }
}

impl_ssz_fixed_bytes!(SignatureBytes, SIGNATURE_BYTES_LEN);
impl_tree_hash_fixed_bytes!(SignatureBytes, SIGNATURE_BYTES_LEN);
impl_serde_hex!(SignatureBytes);
impl_short_debug!(SignatureBytes);

#[cfg(test)]
mod tests {
    use super::*;
    use ssz::Encode;

    #[test]
    fn empty_is_empty() {
        assert!(SignatureBytes::empty().is_empty());
        assert!(!SignatureBytes::deserialize(&[1; SIGNATURE_BYTES_LEN])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn fixed_ssz_length() {
        assert_eq!(
            SignatureBytes::empty().as_ssz_bytes().len(),
            SIGNATURE_BYTES_LEN
        );
        assert!(SignatureBytes::deserialize(&[0; 96]).is_err());
    }
}
