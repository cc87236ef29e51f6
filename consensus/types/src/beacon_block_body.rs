use crate::*;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The body of a `BeaconChain` block, containing operations.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, Derivative)]
#[derivative(PartialEq)]
#[serde(bound = "E: EthSpec")]
pub struct BeaconBlockBody<E: EthSpec> {
    pub randao_reveal: SignatureBytes,
    pub execution_data: ExecutionData,
    pub graffiti: Hash256,
    pub proposer_slashings: VariableList<ProposerSlashing, E::MaxProposerSlashings>,
    pub attester_slashings: VariableList<AttesterSlashing<E>, E::MaxAttesterSlashings>,
    pub attestations: VariableList<Attestation<E>, E::MaxAttestations>,
    pub deposits: VariableList<Deposit, E::MaxDeposits>,
    pub voluntary_exits: VariableList<SignedVoluntaryExit, E::MaxVoluntaryExits>,
    pub sync_aggregate: SyncAggregate<E>,
    pub execution_payload: ExecutionPayload<E>,
}

impl<E: EthSpec> BeaconBlockBody<E> {
    /// A body with no operations, an empty reveal and a default payload.
    pub fn empty() -> Self {
        Self {
            randao_reveal: SignatureBytes::empty(),
            execution_data: ExecutionData::default(),
            graffiti: Hash256::zero(),
            proposer_slashings: VariableList::empty(),
            attester_slashings: VariableList::empty(),
            attestations: VariableList::empty(),
            deposits: VariableList::empty(),
            voluntary_exits: VariableList::empty(),
            sync_aggregate: SyncAggregate::new(),
            execution_payload: ExecutionPayload::default(),
        }
    }
}
