use crate::{PublicKeyBytes, SecretKey, Signer, TestScheme};
use ethereum_hashing::hash_fixed;

#[derive(Clone, Debug, PartialEq)]
pub struct Keypair {
    pub pk: PublicKeyBytes,
    pub sk: SecretKey,
}

impl Keypair {
    pub fn from_components(pk: PublicKeyBytes, sk: SecretKey) -> Self {
        Self { pk, sk }
    }
}

/// Deterministic keypair `index` under [`TestScheme`], for tests and local simulations.
pub fn generate_deterministic_keypair(index: usize) -> Keypair {
    let mut preimage = b"pq_crypto/interop".to_vec();
    preimage.extend_from_slice(&(index as u64).to_le_bytes());
    let seed = hash_fixed(&preimage);
    // A 32-byte digest is always a valid `TestScheme` secret key.
    let sk = match SecretKey::deserialize(&seed) {
        Ok(sk) => sk,
        Err(_) => unreachable!("hash output is SECRET_KEY_BYTES_LEN bytes"),
    };
    let pk = TestScheme.public_key(&sk);
    Keypair::from_components(pk, sk)
}

pub fn generate_deterministic_keypairs(count: usize) -> Vec<Keypair> {
    (0..count).map(generate_deterministic_keypair).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_distinct() {
        let a = generate_deterministic_keypairs(4);
        let b = generate_deterministic_keypairs(4);
        assert_eq!(a, b);
        assert_ne!(a[0].pk, a[1].pk);
    }
}
