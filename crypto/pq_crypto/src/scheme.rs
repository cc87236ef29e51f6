use crate::{Error, Hash256, PublicKeyBytes, SecretKey, SignatureBytes};

/// Checks a single signature over a 32-byte signing root.
///
/// The domain is already mixed into `message` by the caller, which computes
/// `hash_tree_root(SigningData { object_root, domain })`.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        pubkey: &PublicKeyBytes,
        message: Hash256,
        signature: &SignatureBytes,
    ) -> Result<bool, Error>;
}

/// Produces signatures over signing roots. Only test tooling and simulators need this side.
pub trait Signer {
    fn public_key(&self, secret: &SecretKey) -> PublicKeyBytes;

    fn sign(&self, secret: &SecretKey, message: Hash256) -> SignatureBytes;
}

impl<V: SignatureVerifier + ?Sized> SignatureVerifier for std::sync::Arc<V> {
    fn verify(
        &self,
        pubkey: &PublicKeyBytes,
        message: Hash256,
        signature: &SignatureBytes,
    ) -> Result<bool, Error> {
        (**self).verify(pubkey, message, signature)
    }
}
