use crate::{EthSpec, IndexedAttestation};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Two conflicting attestations.
#[derive(Derivative, Debug, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[derivative(PartialEq)]
#[serde(bound = "E: EthSpec")]
pub struct AttesterSlashing<E: EthSpec> {
    pub attestation_1: IndexedAttestation<E>,
    pub attestation_2: IndexedAttestation<E>,
}
