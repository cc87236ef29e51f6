/// Fixed-length SSZ encoding for a byte container holding `$len` bytes in `self.bytes`.
macro_rules! impl_ssz_fixed_bytes {
    ($type: ty, $len: expr) => {
        impl ssz::Encode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $len
            }

            fn ssz_bytes_len(&self) -> usize {
                $len
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.bytes[..])
            }
        }

        impl ssz::Decode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $len
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
                <$type>::deserialize(bytes).map_err(|_| ssz::DecodeError::InvalidByteLength {
                    len: bytes.len(),
                    expected: $len,
                })
            }
        }
    };
}

/// Tree-hashes the container as an SSZ `Vector[byte, $len]`.
macro_rules! impl_tree_hash_fixed_bytes {
    ($type: ty, $len: expr) => {
        impl tree_hash::TreeHash for $type {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                tree_hash::TreeHashType::Vector
            }

            fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
                unreachable!("Vector should never be packed.")
            }

            fn tree_hash_packing_factor() -> usize {
                unreachable!("Vector should never be packed.")
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                let leaves = ($len + tree_hash::BYTES_PER_CHUNK - 1) / tree_hash::BYTES_PER_CHUNK;
                tree_hash::merkle_root(&self.bytes[..], leaves)
            }
        }
    };
}

/// `0x`-prefixed hex serde, as used in YAML and JSON test vectors.
macro_rules! impl_serde_hex {
    ($type: ty) => {
        impl serde::Serialize for $type {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&serde_utils::hex::encode(&self.bytes[..]))
            }
        }

        impl<'de> serde::Deserialize<'de> for $type {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let string = <String as serde::Deserialize>::deserialize(deserializer)?;
                let bytes = serde_utils::hex::decode(&string).map_err(serde::de::Error::custom)?;
                <$type>::deserialize(&bytes)
                    .map_err(|e| serde::de::Error::custom(format!("{:?}", e)))
            }
        }
    };
}

/// Prints the first few bytes only; full keys and signatures swamp logs.
macro_rules! impl_short_debug {
    ($type: ty) => {
        impl std::fmt::Debug for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "0x")?;
                for byte in self.bytes.iter().take(6) {
                    write!(f, "{:02x}", byte)?;
                }
                write!(f, "…")
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Debug::fmt(self, f)
            }
        }
    };
}
