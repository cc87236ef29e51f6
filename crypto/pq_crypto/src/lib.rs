//! The signature collaborator used by the state transition.
//!
//! The state transition never implements a signature primitive. It stores public keys and
//! signatures as fixed-width byte strings, computes signing roots, and asks a
//! [`SignatureVerifier`] whether a `(pubkey, signing_root, signature)` triple is valid.
//!
//! The byte widths match a lattice-based (Dilithium-style) scheme. Such signatures cannot be
//! aggregated, so a multi-signer [`SignatureSet`] carries one signature per signing key.
//!
//! [`TestScheme`] is a deterministic hash-based stand-in for tests and simulations. It is not a
//! secure signature scheme.
#[macro_use]
mod macros;
mod keypair;
mod public_key_bytes;
mod scheme;
mod secret_key;
mod signature_bytes;
mod signature_set;
mod test_scheme;

pub use keypair::{generate_deterministic_keypair, generate_deterministic_keypairs, Keypair};
pub use public_key_bytes::PublicKeyBytes;
pub use scheme::{SignatureVerifier, Signer};
pub use secret_key::SecretKey;
pub use signature_bytes::SignatureBytes;
pub use signature_set::{verify_signature_sets, SignatureSet};
pub use test_scheme::TestScheme;

pub type Hash256 = ethereum_types::H256;

pub const PUBLIC_KEY_BYTES_LEN: usize = 2592;
pub const SIGNATURE_BYTES_LEN: usize = 4595;
pub const SECRET_KEY_BYTES_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    InvalidByteLength { got: usize, expected: usize },
    InvalidSecretKey,
    /// A signature set must have one signature for every signing key.
    MismatchedSignatureSet { keys: usize, signatures: usize },
    /// The verifier backend rejected the inputs before attempting verification.
    Backend(String),
}
