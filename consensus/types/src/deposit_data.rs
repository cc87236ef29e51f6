use crate::*;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The data supplied by the user to the deposit contract.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct DepositData {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: u64,
    pub signature: SignatureBytes,
}

impl DepositData {
    /// Create a `DepositMessage` corresponding to this `DepositData`, for signature verification.
    pub fn as_deposit_message(&self) -> DepositMessage {
        DepositMessage {
            pubkey: self.pubkey.clone(),
            withdrawal_credentials: self.withdrawal_credentials,
            amount: self.amount,
        }
    }

    /// Generate the signature for a given DepositData details.
    pub fn create_signature<S: Signer>(
        &self,
        signer: &S,
        secret_key: &SecretKey,
        spec: &ChainSpec,
    ) -> SignatureBytes {
        let domain = spec.get_deposit_domain();
        let msg = self.as_deposit_message().signing_root(domain);

        signer.sign(secret_key, msg)
    }
}

/// The data supplied by the user to the deposit contract, minus the signature.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct DepositMessage {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: u64,
}

impl SignedRoot for DepositMessage {}

/// A deposit to potentially become a beacon chain validator.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Deposit {
    pub proof: FixedVector<Hash256, U33>,
    pub data: DepositData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pq_crypto::{generate_deterministic_keypair, SignatureVerifier, TestScheme};

    #[test]
    fn deposit_signature_verifies_over_message() {
        let spec = ChainSpec::mainnet();
        let keypair = generate_deterministic_keypair(7);
        let mut data = DepositData {
            pubkey: keypair.pk.clone(),
            withdrawal_credentials: Hash256::repeat_byte(1),
            amount: spec.max_effective_balance,
            signature: SignatureBytes::empty(),
        };
        data.signature = data.create_signature(&TestScheme, &keypair.sk, &spec);

        let message = data
            .as_deposit_message()
            .signing_root(spec.get_deposit_domain());
        assert_eq!(
            TestScheme.verify(&data.pubkey, message, &data.signature),
            Ok(true)
        );

        // The signature does not cover itself, but does cover the amount.
        let mut other = data.clone();
        other.amount -= 1;
        let message = other
            .as_deposit_message()
            .signing_root(spec.get_deposit_domain());
        assert_eq!(
            TestScheme.verify(&other.pubkey, message, &other.signature),
            Ok(false)
        );
    }
}
