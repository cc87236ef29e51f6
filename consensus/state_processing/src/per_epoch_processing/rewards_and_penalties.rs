use super::ParticipationCache;
use crate::common::{
    altair::{get_base_reward, BaseRewardPerIncrement},
    decrease_balance_directly, increase_balance_directly,
};
use crate::per_epoch_processing::Error;
use safe_arith::SafeArith;
use types::consts::participation::{
    PARTICIPATION_FLAG_WEIGHTS, TIMELY_HEAD_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX,
    WEIGHT_DENOMINATOR,
};
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec};

/// Used to track the changes to a validator's balance.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct Delta {
    pub rewards: u64,
    pub penalties: u64,
}

impl Delta {
    /// Reward the validator with the `reward`.
    pub fn reward(&mut self, reward: u64) -> Result<(), Error> {
        self.rewards = self.rewards.safe_add(reward)?;
        Ok(())
    }

    /// Penalize the validator with the `penalty`.
    pub fn penalize(&mut self, penalty: u64) -> Result<(), Error> {
        self.penalties = self.penalties.safe_add(penalty)?;
        Ok(())
    }

    /// Combine two deltas.
    fn combine(&mut self, other: Delta) -> Result<(), Error> {
        self.reward(other.rewards)?;
        self.penalize(other.penalties)
    }
}

/// Apply attester rewards, flag penalties and inactivity penalties for the previous epoch.
pub fn process_rewards_and_penalties<E: EthSpec>(
    state: &mut BeaconState<E>,
    participation_cache: &ParticipationCache,
    spec: &ChainSpec,
) -> Result<(), Error> {
    if state.current_epoch() == E::genesis_epoch() {
        return Ok(());
    }

    let mut deltas = vec![Delta::default(); state.validators.len()];

    let total_active_balance = participation_cache.current_epoch_total_active_balance();

    for flag_index in 0..PARTICIPATION_FLAG_WEIGHTS.len() {
        get_flag_index_deltas(
            &mut deltas,
            state,
            flag_index,
            total_active_balance,
            participation_cache,
            spec,
        )?;
    }

    get_inactivity_penalty_deltas(&mut deltas, state, participation_cache, spec)?;

    // Apply the deltas, erroring on overflow above but not on overflow below (saturating at 0
    // instead).
    for (i, delta) in deltas.into_iter().enumerate() {
        if delta.rewards == 0 && delta.penalties == 0 {
            continue;
        }
        let balance = state
            .balances
            .get_mut(i)
            .ok_or(BeaconStateError::BalancesOutOfBounds(i))?;
        increase_balance_directly(balance, delta.rewards)?;
        decrease_balance_directly(balance, delta.penalties)?;
    }

    Ok(())
}

/// Return the deltas for a given flag index by scanning through the participation flags.
pub fn get_flag_index_deltas<E: EthSpec>(
    deltas: &mut [Delta],
    state: &BeaconState<E>,
    flag_index: usize,
    total_active_balance: u64,
    participation_cache: &ParticipationCache,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let weight = get_flag_weight(flag_index)?;
    let unslashed_participating_balance =
        participation_cache.previous_epoch_flag_attesting_balance(flag_index)?;
    let unslashed_participating_increments =
        unslashed_participating_balance.safe_div(spec.effective_balance_increment)?;
    let active_increments = total_active_balance.safe_div(spec.effective_balance_increment)?;
    let base_reward_per_increment = BaseRewardPerIncrement::new(total_active_balance, spec)?;
    let is_in_inactivity_leak = state.is_in_inactivity_leak(state.previous_epoch(), spec)?;

    for &index in participation_cache.eligible_validator_indices() {
        let base_reward = get_base_reward(
            state.get_effective_balance(index)?,
            base_reward_per_increment,
            spec,
        )?;

        let mut delta = Delta::default();

        if participation_cache.has_previous_epoch_flag(index, flag_index)? {
            if !is_in_inactivity_leak {
                let reward_numerator = base_reward
                    .safe_mul(weight)?
                    .safe_mul(unslashed_participating_increments)?;
                delta.reward(
                    reward_numerator.safe_div(active_increments.safe_mul(WEIGHT_DENOMINATOR)?)?,
                )?;
            }
        } else if flag_index != TIMELY_HEAD_FLAG_INDEX {
            delta.penalize(base_reward.safe_mul(weight)?.safe_div(WEIGHT_DENOMINATOR)?)?;
        }
        deltas
            .get_mut(index)
            .ok_or(Error::DeltaOutOfBounds(index))?
            .combine(delta)?;
    }
    Ok(())
}

/// Get the weight for a `flag_index` from the constant list of all weights.
pub fn get_flag_weight(flag_index: usize) -> Result<u64, Error> {
    PARTICIPATION_FLAG_WEIGHTS
        .get(flag_index)
        .copied()
        .ok_or(Error::InvalidFlagIndex(flag_index))
}

pub fn get_inactivity_penalty_deltas<E: EthSpec>(
    deltas: &mut [Delta],
    state: &BeaconState<E>,
    participation_cache: &ParticipationCache,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let penalty_denominator = spec
        .inactivity_score_bias
        .safe_mul(spec.inactivity_penalty_quotient)?;

    for &index in participation_cache.eligible_validator_indices() {
        let mut delta = Delta::default();

        if !participation_cache.has_previous_epoch_flag(index, TIMELY_TARGET_FLAG_INDEX)? {
            let penalty_numerator = state
                .get_effective_balance(index)?
                .safe_mul(state.get_inactivity_score(index)?)?;
            delta.penalize(penalty_numerator.safe_div(penalty_denominator)?)?;
        }
        deltas
            .get_mut(index)
            .ok_or(Error::DeltaOutOfBounds(index))?
            .combine(delta)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_accumulates() {
        let mut delta = Delta::default();
        delta.reward(3).unwrap();
        delta.penalize(2).unwrap();
        delta
            .combine(Delta {
                rewards: 1,
                penalties: 1,
            })
            .unwrap();
        assert_eq!(
            delta,
            Delta {
                rewards: 4,
                penalties: 3
            }
        );
    }

    #[test]
    fn delta_overflow() {
        let mut delta = Delta {
            rewards: u64::MAX,
            penalties: 0,
        };
        assert!(delta.reward(1).is_err());
    }

    #[test]
    fn unknown_flag_weight() {
        assert_eq!(get_flag_weight(1), Ok(26));
        assert_eq!(get_flag_weight(3), Err(Error::InvalidFlagIndex(3)));
    }
}
