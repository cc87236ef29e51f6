use crate::{
    Error, Hash256, PublicKeyBytes, SecretKey, SignatureBytes, SignatureVerifier, Signer,
    PUBLIC_KEY_BYTES_LEN, SIGNATURE_BYTES_LEN,
};
use ethereum_hashing::{hash32_concat, hash_fixed};

const PUBLIC_KEY_TAG: &[u8] = b"pq_crypto/test/pk";

/// A deterministic, hash-based stand-in for a post-quantum signature scheme.
///
/// A signature is the expansion of `hash(hash(pubkey) ++ message)` to `SIGNATURE_BYTES_LEN`
/// bytes. Anyone holding the public key can forge one, so this must never back a live network.
#[derive(Clone, Copy, Debug, Default)]
pub struct TestScheme;

/// Stretches a 32-byte seed to `len` bytes with a counter-mode hash.
fn expand(seed: [u8; 32], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + 32);
    let mut counter = 0u32;
    while out.len() < len {
        let mut block = [0; 32];
        block[0..4].copy_from_slice(&counter.to_le_bytes());
        out.extend_from_slice(&hash32_concat(&seed, &block));
        counter += 1;
    }
    out.truncate(len);
    out
}

fn signature_for(pubkey: &PublicKeyBytes, message: Hash256) -> Vec<u8> {
    let key_digest = hash_fixed(pubkey.as_serialized());
    expand(hash32_concat(&key_digest, message.as_bytes()), SIGNATURE_BYTES_LEN)
}

impl Signer for TestScheme {
    fn public_key(&self, secret: &SecretKey) -> PublicKeyBytes {
        let mut preimage = PUBLIC_KEY_TAG.to_vec();
        preimage.extend_from_slice(secret.as_bytes());
        let bytes = expand(hash_fixed(&preimage), PUBLIC_KEY_BYTES_LEN);
        PublicKeyBytes::deserialize(&bytes).unwrap_or_else(|_| PublicKeyBytes::empty())
    }

    fn sign(&self, secret: &SecretKey, message: Hash256) -> SignatureBytes {
        let pubkey = self.public_key(secret);
        SignatureBytes::deserialize(&signature_for(&pubkey, message))
            .unwrap_or_else(|_| SignatureBytes::empty())
    }
}

impl SignatureVerifier for TestScheme {
    fn verify(
        &self,
        pubkey: &PublicKeyBytes,
        message: Hash256,
        signature: &SignatureBytes,
    ) -> Result<bool, Error> {
        if signature.is_empty() {
            return Ok(false);
        }
        Ok(signature.as_serialized() == signature_for(pubkey, message).as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_deterministic_keypair;

    #[test]
    fn sign_then_verify() {
        let kp = generate_deterministic_keypair(0);
        let message = Hash256::repeat_byte(42);
        let sig = TestScheme.sign(&kp.sk, message);
        assert_eq!(TestScheme.verify(&kp.pk, message, &sig), Ok(true));
    }

    #[test]
    fn wrong_message_or_key_fails() {
        let kp = generate_deterministic_keypair(0);
        let other = generate_deterministic_keypair(1);
        let sig = TestScheme.sign(&kp.sk, Hash256::repeat_byte(1));
        assert_eq!(
            TestScheme.verify(&kp.pk, Hash256::repeat_byte(2), &sig),
            Ok(false)
        );
        assert_eq!(
            TestScheme.verify(&other.pk, Hash256::repeat_byte(1), &sig),
            Ok(false)
        );
    }

    #[test]
    fn empty_signature_fails() {
        let kp = generate_deterministic_keypair(3);
        assert_eq!(
            TestScheme.verify(&kp.pk, Hash256::zero(), &SignatureBytes::empty()),
            Ok(false)
        );
    }
}
