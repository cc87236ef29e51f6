//! Tallies the participation flags of the previous and current epochs once, at the start of the
//! epoch transition, so that the later stages can answer "did validator `i` hit flag `f`?" and
//! "how much balance hit flag `f`?" without rescanning the registry.
use safe_arith::SafeArith;
use std::cmp::max;
use std::collections::HashMap;
use types::{
    consts::participation::{
        NUM_FLAG_INDICES, TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX,
        TIMELY_TARGET_FLAG_INDEX,
    },
    BeaconState, BeaconStateError, ChainSpec, Epoch, EthSpec, ParticipationFlags,
};

#[derive(PartialEq, Debug, Clone)]
struct EpochParticipation {
    /// Flags of every active, unslashed validator, keyed by validator index.
    unslashed_participating_indices: HashMap<usize, ParticipationFlags>,
    /// Per-flag sums of effective balance, each floored at `EFFECTIVE_BALANCE_INCREMENT`.
    total_flag_balances: [u64; NUM_FLAG_INDICES],
    /// Floored at `EFFECTIVE_BALANCE_INCREMENT`.
    total_active_balance: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ParticipationCache {
    current_epoch: Epoch,
    current_epoch_participation: EpochParticipation,
    previous_epoch: Epoch,
    previous_epoch_participation: EpochParticipation,
    /// Validators eligible for rewards and penalties in the previous epoch, ascending.
    eligible_indices: Vec<usize>,
}

impl ParticipationCache {
    pub fn new<E: EthSpec>(
        state: &BeaconState<E>,
        spec: &ChainSpec,
    ) -> Result<Self, BeaconStateError> {
        let current_epoch = state.current_epoch();
        let previous_epoch = state.previous_epoch();

        let mut eligible_indices = Vec::with_capacity(state.validators.len());
        for (index, validator) in state.validators.iter().enumerate() {
            if state.is_eligible_validator(previous_epoch, validator)? {
                eligible_indices.push(index);
            }
        }

        Ok(Self {
            current_epoch,
            current_epoch_participation: get_epoch_participation(state, current_epoch, spec)?,
            previous_epoch,
            previous_epoch_participation: get_epoch_participation(state, previous_epoch, spec)?,
            eligible_indices,
        })
    }

    pub fn eligible_validator_indices(&self) -> &[usize] {
        &self.eligible_indices
    }

    pub fn current_epoch_total_active_balance(&self) -> u64 {
        self.current_epoch_participation.total_active_balance
    }

    pub fn previous_epoch_total_active_balance(&self) -> u64 {
        self.previous_epoch_participation.total_active_balance
    }

    pub fn previous_epoch_flag_attesting_balance(
        &self,
        flag_index: usize,
    ) -> Result<u64, BeaconStateError> {
        self.previous_epoch_participation
            .total_flag_balances
            .get(flag_index)
            .copied()
            .ok_or(BeaconStateError::ParticipationOutOfBounds(flag_index))
    }

    pub fn current_epoch_flag_attesting_balance(
        &self,
        flag_index: usize,
    ) -> Result<u64, BeaconStateError> {
        self.current_epoch_participation
            .total_flag_balances
            .get(flag_index)
            .copied()
            .ok_or(BeaconStateError::ParticipationOutOfBounds(flag_index))
    }

    pub fn previous_epoch_target_attesting_balance(&self) -> Result<u64, BeaconStateError> {
        self.previous_epoch_flag_attesting_balance(TIMELY_TARGET_FLAG_INDEX)
    }

    pub fn previous_epoch_head_attesting_balance(&self) -> Result<u64, BeaconStateError> {
        self.previous_epoch_flag_attesting_balance(TIMELY_HEAD_FLAG_INDEX)
    }

    pub fn current_epoch_target_attesting_balance(&self) -> Result<u64, BeaconStateError> {
        self.current_epoch_flag_attesting_balance(TIMELY_TARGET_FLAG_INDEX)
    }

    /// Returns `true` if the validator was active and unslashed in the previous epoch.
    pub fn is_active_unslashed_in_previous_epoch(&self, val_index: usize) -> bool {
        self.previous_epoch_participation
            .unslashed_participating_indices
            .contains_key(&val_index)
    }

    /// Returns `true` if the validator was active and unslashed in the current epoch.
    pub fn is_active_unslashed_in_current_epoch(&self, val_index: usize) -> bool {
        self.current_epoch_participation
            .unslashed_participating_indices
            .contains_key(&val_index)
    }

    /// Returns `true` if the unslashed validator hit `flag_index` in the previous epoch.
    ///
    /// Unknown or slashed validators never have a flag set.
    pub fn has_previous_epoch_flag(
        &self,
        val_index: usize,
        flag_index: usize,
    ) -> Result<bool, BeaconStateError> {
        has_flag(&self.previous_epoch_participation, val_index, flag_index)
    }

    pub fn has_current_epoch_flag(
        &self,
        val_index: usize,
        flag_index: usize,
    ) -> Result<bool, BeaconStateError> {
        has_flag(&self.current_epoch_participation, val_index, flag_index)
    }

    pub fn is_previous_epoch_timely_source_attester(
        &self,
        val_index: usize,
    ) -> Result<bool, BeaconStateError> {
        self.has_previous_epoch_flag(val_index, TIMELY_SOURCE_FLAG_INDEX)
    }

    pub fn is_previous_epoch_timely_target_attester(
        &self,
        val_index: usize,
    ) -> Result<bool, BeaconStateError> {
        self.has_previous_epoch_flag(val_index, TIMELY_TARGET_FLAG_INDEX)
    }

    pub fn is_previous_epoch_timely_head_attester(
        &self,
        val_index: usize,
    ) -> Result<bool, BeaconStateError> {
        self.has_previous_epoch_flag(val_index, TIMELY_HEAD_FLAG_INDEX)
    }

    /// The ascending indices of unslashed validators with any flag set in the previous epoch.
    pub fn previous_epoch_participating_indices(&self) -> Vec<usize> {
        let mut indices = self
            .previous_epoch_participation
            .unslashed_participating_indices
            .iter()
            .filter(|(_, flags)| flags.into_u8() != 0)
            .map(|(index, _)| *index)
            .collect::<Vec<_>>();
        indices.sort_unstable();
        indices
    }

    pub fn previous_epoch(&self) -> Epoch {
        self.previous_epoch
    }

    pub fn current_epoch(&self) -> Epoch {
        self.current_epoch
    }
}

fn has_flag(
    participation: &EpochParticipation,
    val_index: usize,
    flag_index: usize,
) -> Result<bool, BeaconStateError> {
    if flag_index >= NUM_FLAG_INDICES {
        return Err(BeaconStateError::ParticipationOutOfBounds(flag_index));
    }
    Ok(participation
        .unslashed_participating_indices
        .get(&val_index)
        .map(|flags| flags.has_flag(flag_index))
        .transpose()?
        .unwrap_or(false))
}

fn get_epoch_participation<E: EthSpec>(
    state: &BeaconState<E>,
    epoch: Epoch,
    spec: &ChainSpec,
) -> Result<EpochParticipation, BeaconStateError> {
    let epoch_participation = state.get_epoch_participation(epoch)?;

    let active_validator_indices = state.get_active_validator_indices(epoch, spec)?;
    let mut unslashed_participating_indices =
        HashMap::with_capacity(active_validator_indices.len());
    let mut total_flag_balances = [0; NUM_FLAG_INDICES];
    let mut total_active_balance = 0_u64;

    for val_index in active_validator_indices {
        let validator = state.get_validator(val_index)?;
        total_active_balance.safe_add_assign(validator.effective_balance)?;

        if validator.slashed {
            continue;
        }

        let flags = *epoch_participation
            .get(val_index)
            .ok_or(BeaconStateError::ParticipationOutOfBounds(val_index))?;

        for (flag, balance) in total_flag_balances.iter_mut().enumerate() {
            if flags.has_flag(flag)? {
                balance.safe_add_assign(validator.effective_balance)?;
            }
        }

        unslashed_participating_indices.insert(val_index, flags);
    }

    // Floor every balance so that later divisions never see zero.
    for balance in total_flag_balances.iter_mut() {
        *balance = max(*balance, spec.effective_balance_increment);
    }

    Ok(EpochParticipation {
        unslashed_participating_indices,
        total_flag_balances,
        total_active_balance: max(total_active_balance, spec.effective_balance_increment),
    })
}
