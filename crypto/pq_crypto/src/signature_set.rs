use crate::{Error, Hash256, PublicKeyBytes, SignatureBytes, SignatureVerifier};
use rayon::prelude::*;
use std::borrow::Cow;

/// One message signed independently by one or more keys.
///
/// Signatures from different signers over the same message are not aggregated, so
/// `signatures[i]` must be the signature of `signing_keys[i]`.
#[derive(Clone, Debug)]
pub struct SignatureSet<'a> {
    pub signing_keys: Vec<Cow<'a, PublicKeyBytes>>,
    pub signatures: Vec<Cow<'a, SignatureBytes>>,
    pub message: Hash256,
}

impl<'a> SignatureSet<'a> {
    pub fn single_pubkey(
        signature: &'a SignatureBytes,
        signing_key: Cow<'a, PublicKeyBytes>,
        message: Hash256,
    ) -> Self {
        Self {
            signing_keys: vec![signing_key],
            signatures: vec![Cow::Borrowed(signature)],
            message,
        }
    }

    pub fn multiple_pubkeys(
        signatures: Vec<Cow<'a, SignatureBytes>>,
        signing_keys: Vec<Cow<'a, PublicKeyBytes>>,
        message: Hash256,
    ) -> Result<Self, Error> {
        if signatures.len() != signing_keys.len() {
            return Err(Error::MismatchedSignatureSet {
                keys: signing_keys.len(),
                signatures: signatures.len(),
            });
        }
        Ok(Self {
            signing_keys,
            signatures,
            message,
        })
    }

    /// True iff the set is non-empty and every signature is valid for its key.
    ///
    /// Backend errors count as invalid.
    pub fn verify<V: SignatureVerifier + ?Sized>(&self, verifier: &V) -> bool {
        if self.signing_keys.is_empty() || self.signing_keys.len() != self.signatures.len() {
            return false;
        }
        self.signing_keys
            .iter()
            .zip(self.signatures.iter())
            .all(|(pubkey, signature)| {
                matches!(verifier.verify(pubkey, self.message, signature), Ok(true))
            })
    }
}

/// Verifies every set, spreading the work across the rayon pool.
///
/// The outcome does not depend on scheduling: it is `true` iff each set verifies on its own.
/// An empty input is rejected.
pub fn verify_signature_sets<'a, V>(sets: &[SignatureSet<'a>], verifier: &V) -> bool
where
    V: SignatureVerifier + ?Sized,
{
    !sets.is_empty() && sets.par_iter().all(|set| set.verify(verifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{generate_deterministic_keypairs, Signer, TestScheme};

    #[test]
    fn multi_signer_set() {
        let keypairs = generate_deterministic_keypairs(3);
        let message = Hash256::repeat_byte(9);
        let signatures: Vec<_> = keypairs
            .iter()
            .map(|kp| Cow::Owned(TestScheme.sign(&kp.sk, message)))
            .collect();
        let keys: Vec<_> = keypairs.iter().map(|kp| Cow::Borrowed(&kp.pk)).collect();

        let set = SignatureSet::multiple_pubkeys(signatures.clone(), keys.clone(), message)
            .unwrap();
        assert!(set.verify(&TestScheme));

        // Swapping two signatures breaks the pairing.
        let mut swapped = signatures;
        swapped.swap(0, 1);
        let set = SignatureSet::multiple_pubkeys(swapped, keys, message).unwrap();
        assert!(!set.verify(&TestScheme));
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let kp = &generate_deterministic_keypairs(1)[0];
        assert_eq!(
            SignatureSet::multiple_pubkeys(vec![], vec![Cow::Borrowed(&kp.pk)], Hash256::zero())
                .unwrap_err(),
            Error::MismatchedSignatureSet {
                keys: 1,
                signatures: 0
            }
        );
    }

    #[test]
    fn bulk_verification() {
        let keypairs = generate_deterministic_keypairs(8);
        let signatures: Vec<_> = keypairs
            .iter()
            .enumerate()
            .map(|(i, kp)| TestScheme.sign(&kp.sk, Hash256::from_low_u64_be(i as u64)))
            .collect();
        let mut sets: Vec<_> = keypairs
            .iter()
            .zip(signatures.iter())
            .enumerate()
            .map(|(i, (kp, sig))| {
                SignatureSet::single_pubkey(
                    sig,
                    Cow::Borrowed(&kp.pk),
                    Hash256::from_low_u64_be(i as u64),
                )
            })
            .collect();

        assert!(verify_signature_sets(&sets, &TestScheme));
        sets[5].message = Hash256::repeat_byte(0xff);
        assert!(!verify_signature_sets(&sets, &TestScheme));
        assert!(!verify_signature_sets(&[], &TestScheme));
    }
}
