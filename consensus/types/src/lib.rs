//! Types for the post-quantum beacon chain state transition.

// Required for big type-level numbers
#![recursion_limit = "128"]

#[macro_use]
pub mod slot_epoch_macros;

pub mod attestation;
pub mod attestation_data;
pub mod attestation_duty;
pub mod attester_slashing;
pub mod beacon_block;
pub mod beacon_block_body;
pub mod beacon_block_header;
pub mod beacon_committee;
pub mod beacon_state;
pub mod cancel_token;
pub mod chain_spec;
pub mod checkpoint;
pub mod consts;
pub mod deposit_data;
pub mod eth_spec;
pub mod execution_data;
pub mod execution_payload;
pub mod fork;
pub mod historical_summary;
pub mod indexed_attestation;
pub mod participation_flags;
pub mod proposer_slashing;
pub mod relative_epoch;
pub mod signing_data;
pub mod slot_epoch;
pub mod sync_committee;
pub mod validator;
pub mod voluntary_exit;
pub mod withdrawal;

use ethereum_types::{H160, H256};

pub use crate::attestation::{Attestation, Error as AttestationError};
pub use crate::attestation_data::AttestationData;
pub use crate::attestation_duty::AttestationDuty;
pub use crate::attester_slashing::AttesterSlashing;
pub use crate::beacon_block::{BeaconBlock, SignedBeaconBlock};
pub use crate::beacon_block_body::BeaconBlockBody;
pub use crate::beacon_block_header::{BeaconBlockHeader, SignedBeaconBlockHeader};
pub use crate::beacon_committee::{BeaconCommittee, OwnedBeaconCommittee};
pub use crate::beacon_state::{Error as BeaconStateError, *};
pub use crate::cancel_token::{CancelToken, CANCEL_CHECK_INTERVAL};
pub use crate::chain_spec::{ChainSpec, Config, Domain};
pub use crate::checkpoint::Checkpoint;
pub use crate::deposit_data::{Deposit, DepositData, DepositMessage};
pub use crate::eth_spec::{EthSpec, EthSpecId, MainnetEthSpec, MinimalEthSpec};
pub use crate::execution_data::ExecutionData;
pub use crate::execution_payload::{
    ExecPayload, ExecutionPayload, ExecutionPayloadHeader, Withdrawals,
};
pub use crate::fork::{Fork, ForkData};
pub use crate::historical_summary::HistoricalSummary;
pub use crate::indexed_attestation::IndexedAttestation;
pub use crate::participation_flags::ParticipationFlags;
pub use crate::proposer_slashing::ProposerSlashing;
pub use crate::relative_epoch::{Error as RelativeEpochError, RelativeEpoch};
pub use crate::signing_data::{SignedRoot, SigningData};
pub use crate::slot_epoch::{Epoch, Slot};
pub use crate::sync_committee::{SyncAggregate, SyncCommittee};
pub use crate::validator::Validator;
pub use crate::voluntary_exit::{SignedVoluntaryExit, VoluntaryExit};
pub use crate::withdrawal::Withdrawal;

pub type CommitteeIndex = u64;
pub type Hash256 = H256;
pub type Address = H160;

pub use pq_crypto::{
    Keypair, PublicKeyBytes, SecretKey, SignatureBytes, SignatureVerifier, Signer,
};
pub use safe_arith::{ArithError, SafeArith};
pub use ssz_types::{
    typenum, typenum::{Unsigned, U33}, BitList, BitVector, FixedVector, VariableList,
};
