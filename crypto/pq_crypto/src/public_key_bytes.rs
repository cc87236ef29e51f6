use crate::{Error, PUBLIC_KEY_BYTES_LEN};
use std::hash::{Hash, Hasher};

/// An opaque public key.
///
/// No structural validation happens here: deposits may carry arbitrary bytes, and only the
/// verifier backend decides whether a key is usable.
#[derive(Clone)]
pub struct PublicKeyBytes {
    bytes: Box<[u8; PUBLIC_KEY_BYTES_LEN]>,
}

impl PublicKeyBytes {
    /// Instantiates `Self` with all-zeros.
    pub fn empty() -> Self {
        Self {
            bytes: Box::new([0; PUBLIC_KEY_BYTES_LEN]),
        }
    }

    pub fn as_serialized(&self) -> &[u8] {
        &self.bytes[..]
    }

    /// Only the byte length is checked.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != PUBLIC_KEY_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: PUBLIC_KEY_BYTES_LEN,
            });
        }
        let mut key = Self::empty();
        key.bytes.copy_from_slice(bytes);
        Ok(key)
    }
}

impl Default for PublicKeyBytes {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for PublicKeyBytes {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..] == other.bytes[..]
    }
}

impl Eq for PublicKeyBytes {}

impl Hash for PublicKeyBytes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes[..].hash(state);
    }
}

impl_ssz_fixed_bytes!(PublicKeyBytes, PUBLIC_KEY_BYTES_LEN);
impl_tree_hash_fixed_bytes!(PublicKeyBytes, PUBLIC_KEY_BYTES_LEN);
impl_serde_hex!(PublicKeyBytes);
impl_short_debug!(PublicKeyBytes);

#[cfg(test)]
mod tests {
    use super::*;
    use ssz::{Decode, Encode};
    use tree_hash::TreeHash;

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            PublicKeyBytes::deserialize(&[1; 48]),
            Err(Error::InvalidByteLength {
                got: 48,
                expected: PUBLIC_KEY_BYTES_LEN
            })
        );
    }

    #[test]
    fn ssz_is_raw_bytes() {
        let key = PublicKeyBytes::deserialize(&[7; PUBLIC_KEY_BYTES_LEN]).unwrap();
        let encoded = key.as_ssz_bytes();
        assert_eq!(encoded, vec![7; PUBLIC_KEY_BYTES_LEN]);
        assert_eq!(PublicKeyBytes::from_ssz_bytes(&encoded).unwrap(), key);
        assert!(PublicKeyBytes::from_ssz_bytes(&encoded[1..]).is_err());
    }

    #[test]
    fn tree_hash_distinguishes_keys() {
        let a = PublicKeyBytes::empty();
        let mut raw = [0; PUBLIC_KEY_BYTES_LEN];
        raw[PUBLIC_KEY_BYTES_LEN - 1] = 1;
        let b = PublicKeyBytes::deserialize(&raw).unwrap();
        assert_ne!(a.tree_hash_root(), b.tree_hash_root());
        assert_eq!(a.tree_hash_root(), PublicKeyBytes::empty().tree_hash_root());
    }

    #[test]
    fn serde_hex_round_trip() {
        let key = PublicKeyBytes::deserialize(&[0xab; PUBLIC_KEY_BYTES_LEN]).unwrap();
        let yaml = serde_yaml::to_string(&key).unwrap();
        assert!(yaml.contains("0xabab"));
        let decoded: PublicKeyBytes = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(decoded, key);
    }
}
