use crate::*;
use derivative::Derivative;
use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use std::sync::Arc;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

pub use self::committee_cache::{get_active_validator_indices, CommitteeCache};
pub use self::pubkey_cache::PubkeyCache;

mod checkpoints;
mod committee_cache;
mod committees;
mod participation;
mod pubkey_cache;
mod registry;
mod roots;
#[cfg(test)]
mod tests;

pub const CACHED_EPOCHS: usize = 3;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    EpochOutOfBounds,
    SlotOutOfBounds,
    UnknownValidator(usize),
    UnableToShuffle,
    ShuffleIndexOutOfBounds(usize),
    BlockRootsOutOfBounds(usize),
    StateRootsOutOfBounds(usize),
    SlashingsOutOfBounds(usize),
    BalancesOutOfBounds(usize),
    RandaoMixesOutOfBounds(usize),
    CommitteeCachesOutOfBounds(usize),
    ParticipationOutOfBounds(usize),
    InactivityScoresOutOfBounds(usize),
    TooManyValidators,
    InsufficientValidators,
    InvalidBitfield,
    NoCommittee {
        slot: Slot,
        index: CommitteeIndex,
    },
    ZeroSlotsPerEpoch,
    /// `base_reward_per_increment` was asked for with no active balance at all.
    ZeroActiveBalance,
    PubkeyCacheInconsistent,
    PubkeyCacheIncomplete {
        cache_len: usize,
        registry_len: usize,
    },
    TotalActiveBalanceCacheUninitialized,
    TotalActiveBalanceCacheInconsistent {
        initialized_epoch: Epoch,
        current_epoch: Epoch,
    },
    RelativeEpochError(RelativeEpochError),
    CommitteeCacheUninitialized(Option<RelativeEpoch>),
    /// A committee cache built for one epoch was offered for another.
    CommitteeCacheEpochMismatch {
        expected: Epoch,
        found: Option<Epoch>,
    },
    SyncCommitteeNotKnown {
        current_epoch: Epoch,
        epoch: Epoch,
    },
    InvalidDepositState {
        deposit_count: u64,
        deposit_index: u64,
    },
    /// Attestation slipped through block processing with a non-matching source.
    IncorrectAttestationSource,
    /// The owner of the transition asked for it to stop.
    Cancelled,
    SszTypesError(ssz_types::Error),
    /// An arithmetic operation occurred which would have overflowed or divided by 0.
    ///
    /// This represents a serious bug in either the protocol parameters or this implementation.
    ArithError(ArithError),
}

/// The state of the `BeaconChain` at some slot.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, Derivative)]
#[derivative(PartialEq)]
#[serde(bound = "E: EthSpec")]
pub struct BeaconState<E>
where
    E: EthSpec,
{
    // Versioning
    #[serde(with = "serde_utils::quoted_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: Hash256,
    pub slot: Slot,
    pub fork: Fork,

    // History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: FixedVector<Hash256, E::SlotsPerHistoricalRoot>,
    pub state_roots: FixedVector<Hash256, E::SlotsPerHistoricalRoot>,
    // Frozen: no longer appended to, kept so the hash tree layout is stable.
    pub historical_roots: VariableList<Hash256, E::HistoricalRootsLimit>,

    // Execution-layer deposit contract linkage
    pub execution_data: ExecutionData,
    pub execution_data_votes: VariableList<ExecutionData, E::SlotsPerEth1VotingPeriod>,
    #[serde(with = "serde_utils::quoted_u64")]
    pub execution_deposit_index: u64,

    // Registry
    pub validators: VariableList<Validator, E::ValidatorRegistryLimit>,
    #[serde(with = "ssz_types::serde_utils::quoted_u64_var_list")]
    pub balances: VariableList<u64, E::ValidatorRegistryLimit>,

    // Randomness
    pub randao_mixes: FixedVector<Hash256, E::EpochsPerHistoricalVector>,

    // Slashings
    #[serde(with = "ssz_types::serde_utils::quoted_u64_fixed_vec")]
    pub slashings: FixedVector<u64, E::EpochsPerSlashingsVector>,

    // Participation
    pub previous_epoch_participation: VariableList<ParticipationFlags, E::ValidatorRegistryLimit>,
    pub current_epoch_participation: VariableList<ParticipationFlags, E::ValidatorRegistryLimit>,

    // Finality
    pub justification_bits: BitVector<E::JustificationBitsLength>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,

    // Inactivity
    #[serde(with = "ssz_types::serde_utils::quoted_u64_var_list")]
    pub inactivity_scores: VariableList<u64, E::ValidatorRegistryLimit>,

    // Sync committees
    pub current_sync_committee: SyncCommittee<E>,
    pub next_sync_committee: SyncCommittee<E>,

    // Execution
    pub latest_execution_payload_header: ExecutionPayloadHeader,

    // Withdrawals
    #[serde(with = "serde_utils::quoted_u64")]
    pub next_withdrawal_index: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub next_withdrawal_validator_index: u64,
    pub historical_summaries: VariableList<HistoricalSummary, E::HistoricalRootsLimit>,

    // Caching (not hashed, not serialized)
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    #[derivative(PartialEq = "ignore")]
    pub total_active_balance: Option<(Epoch, u64)>,
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    #[derivative(PartialEq = "ignore")]
    pub committee_caches: [Arc<CommitteeCache>; CACHED_EPOCHS],
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    #[derivative(PartialEq = "ignore")]
    pub pubkey_cache: PubkeyCache,
}

impl<E: EthSpec> BeaconState<E> {
    /// Create a new BeaconState suitable for genesis.
    ///
    /// Not a complete genesis state, see `initialize_beacon_state_from_execution`.
    pub fn new(genesis_time: u64, execution_data: ExecutionData, spec: &ChainSpec) -> Self {
        BeaconState {
            // Versioning
            genesis_time,
            genesis_validators_root: Hash256::zero(), // Set later.
            slot: spec.genesis_slot,
            fork: Fork::genesis(spec),

            // History
            latest_block_header: BeaconBlock::<E>::empty(spec).temporary_block_header(),
            block_roots: FixedVector::from_elem(Hash256::zero()),
            state_roots: FixedVector::from_elem(Hash256::zero()),
            historical_roots: VariableList::empty(),

            // Execution-layer linkage
            execution_data,
            execution_data_votes: VariableList::empty(),
            execution_deposit_index: 0,

            // Validator registry
            validators: VariableList::empty(), // Set later.
            balances: VariableList::empty(),   // Set later.

            // Randomness
            randao_mixes: FixedVector::from_elem(Hash256::zero()),

            // Slashings
            slashings: FixedVector::from_elem(0),

            // Participation
            previous_epoch_participation: VariableList::empty(),
            current_epoch_participation: VariableList::empty(),

            // Finality
            justification_bits: BitVector::new(),
            previous_justified_checkpoint: Checkpoint::default(),
            current_justified_checkpoint: Checkpoint::default(),
            finalized_checkpoint: Checkpoint::default(),

            // Inactivity
            inactivity_scores: VariableList::empty(),

            // Sync committees
            current_sync_committee: SyncCommittee::temporary(),
            next_sync_committee: SyncCommittee::temporary(),

            // Execution
            latest_execution_payload_header: ExecutionPayloadHeader::default(),

            // Withdrawals
            next_withdrawal_index: 0,
            next_withdrawal_validator_index: 0,
            historical_summaries: VariableList::empty(),

            // Caching
            total_active_balance: None,
            committee_caches: [
                Arc::new(CommitteeCache::default()),
                Arc::new(CommitteeCache::default()),
                Arc::new(CommitteeCache::default()),
            ],
            pubkey_cache: PubkeyCache::default(),
        }
    }

    /// Returns the `tree_hash_root` of the state.
    ///
    /// Caches are excluded, so a state and its cache-less clone hash identically.
    pub fn canonical_root(&self) -> Hash256 {
        self.tree_hash_root()
    }

    /// The epoch corresponding to `self.slot`.
    pub fn current_epoch(&self) -> Epoch {
        self.slot.epoch(E::slots_per_epoch())
    }

    /// The epoch prior to `self.current_epoch()`.
    ///
    /// If the current epoch is the genesis epoch, the genesis_epoch is returned.
    pub fn previous_epoch(&self) -> Epoch {
        let current_epoch = self.current_epoch();
        if let Ok(prev_epoch) = current_epoch.safe_sub(1) {
            prev_epoch
        } else {
            current_epoch
        }
    }

    /// The epoch following `self.current_epoch()`.
    pub fn next_epoch(&self) -> Result<Epoch, Error> {
        Ok(self.current_epoch().safe_add(1)?)
    }

    /// Returns `true` if the next slot starts a new epoch, so the epoch transition must run
    /// before the slot is incremented.
    pub fn can_process_epoch(&self) -> bool {
        self.slot
            .as_u64()
            .saturating_add(1)
            .safe_rem(E::slots_per_epoch())
            .map_or(false, |rem| rem == 0)
    }

    ///  Return the epoch at which an activation or exit triggered in ``epoch`` takes effect.
    pub fn compute_activation_exit_epoch(
        &self,
        epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<Epoch, Error> {
        Ok(spec.compute_activation_exit_epoch(epoch)?)
    }

    /// Get the canonical root of the `latest_block_header`, filling in its state root if necessary.
    ///
    /// It needs filling in on all slots where there isn't a skip.
    pub fn get_latest_block_root(&self, current_state_root: Hash256) -> Hash256 {
        if self.latest_block_header.state_root.is_zero() {
            let mut latest_block_header = self.latest_block_header.clone();
            latest_block_header.state_root = current_state_root;
            latest_block_header.canonical_root()
        } else {
            self.latest_block_header.canonical_root()
        }
    }

    /// Build all caches (except the next-epoch committee cache) if they need to be built.
    pub fn build_caches(&mut self, spec: &ChainSpec) -> Result<(), Error> {
        self.build_committee_cache(RelativeEpoch::Previous, spec)?;
        self.build_committee_cache(RelativeEpoch::Current, spec)?;
        self.build_total_active_balance_cache(spec)?;
        self.update_pubkey_cache()?;
        Ok(())
    }

    /// Build all committee caches, if they need to be built.
    pub fn build_all_committee_caches(&mut self, spec: &ChainSpec) -> Result<(), Error> {
        self.build_committee_cache(RelativeEpoch::Previous, spec)?;
        self.build_committee_cache(RelativeEpoch::Current, spec)?;
        self.build_committee_cache(RelativeEpoch::Next, spec)?;
        Ok(())
    }

    /// Drop all caches on the state.
    pub fn drop_all_caches(&mut self) -> Result<(), Error> {
        self.drop_total_active_balance_cache();
        self.drop_committee_cache(RelativeEpoch::Previous)?;
        self.drop_committee_cache(RelativeEpoch::Current)?;
        self.drop_committee_cache(RelativeEpoch::Next)?;
        self.drop_pubkey_cache();
        Ok(())
    }

    /// Advances the cache for this state into the next epoch.
    ///
    /// This should be used if the `slot` of this state is advanced beyond an epoch boundary.
    ///
    /// Note: this function will not build any new committee caches, nor will it update the total
    /// active balance cache. The total active balance cache must be updated separately.
    pub fn advance_caches(&mut self) -> Result<(), Error> {
        self.committee_caches.rotate_left(1);

        let next = Self::committee_cache_index(RelativeEpoch::Next);
        *self.committee_cache_at_index_mut(next)? = Arc::new(CommitteeCache::default());
        Ok(())
    }

    /// Passing `previous_epoch` to this function rather than computing it internally provides
    /// a tangible speed improvement in state processing.
    pub fn is_eligible_validator(
        &self,
        previous_epoch: Epoch,
        val: &Validator,
    ) -> Result<bool, Error> {
        Ok(val.is_active_at(previous_epoch)
            || (val.slashed && previous_epoch.safe_add(Epoch::new(1))? < val.withdrawable_epoch))
    }

    /// Passing `previous_epoch` to this function rather than computing it internally provides
    /// a tangible speed improvement in state processing.
    pub fn is_in_inactivity_leak(
        &self,
        previous_epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<bool, ArithError> {
        Ok(
            (previous_epoch.safe_sub(self.finalized_checkpoint.epoch)?)
                > spec.min_epochs_to_inactivity_penalty,
        )
    }
}

impl From<RelativeEpochError> for Error {
    fn from(e: RelativeEpochError) -> Error {
        Error::RelativeEpochError(e)
    }
}

impl From<ssz_types::Error> for Error {
    fn from(e: ssz_types::Error) -> Error {
        Error::SszTypesError(e)
    }
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Error {
        Error::ArithError(e)
    }
}
