use super::errors::EpochProcessingError;
use safe_arith::SafeArith;
use std::cmp::min;
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec};

/// Move effective balances towards actual balances, with hysteresis so that small oscillations
/// around an increment boundary do not churn the effective balance.
pub fn process_effective_balance_updates<E: EthSpec>(
    state: &mut BeaconState<E>,
    spec: &ChainSpec,
) -> Result<(), EpochProcessingError> {
    let hysteresis_increment = spec
        .effective_balance_increment
        .safe_div(spec.hysteresis_quotient)?;
    let downward_threshold = hysteresis_increment.safe_mul(spec.hysteresis_downward_multiplier)?;
    let upward_threshold = hysteresis_increment.safe_mul(spec.hysteresis_upward_multiplier)?;

    let BeaconState {
        validators,
        balances,
        ..
    } = state;

    for (index, validator) in validators.iter_mut().enumerate() {
        let balance = balances
            .get(index)
            .copied()
            .ok_or(BeaconStateError::BalancesOutOfBounds(index))?;

        if balance.safe_add(downward_threshold)? < validator.effective_balance
            || validator.effective_balance.safe_add(upward_threshold)? < balance
        {
            validator.effective_balance = min(
                balance.safe_sub(balance.safe_rem(spec.effective_balance_increment)?)?,
                spec.max_effective_balance,
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ChainSpec, ExecutionData, MinimalEthSpec, Validator};

    const GWEI: u64 = 1_000_000_000;

    fn state_with_balances(pairs: &[(u64, u64)]) -> BeaconState<MinimalEthSpec> {
        let spec = ChainSpec::minimal();
        let mut state = BeaconState::new(0, ExecutionData::default(), &spec);
        for (effective, actual) in pairs {
            let validator = Validator {
                effective_balance: *effective,
                ..Validator::default()
            };
            state.push_validator(validator, *actual).unwrap();
        }
        state
    }

    #[test]
    fn hysteresis() {
        let spec = ChainSpec::minimal();
        let mut state = state_with_balances(&[
            // Within the downward threshold (0.25 ETH): unchanged.
            (32 * GWEI, 32 * GWEI - GWEI / 5),
            // Beyond the downward threshold: drops to the increment below.
            (32 * GWEI, 31 * GWEI + GWEI / 2),
            // Within the upward threshold (1.25 ETH): unchanged.
            (30 * GWEI, 31 * GWEI),
            // Beyond the upward threshold: rises, capped at the maximum.
            (30 * GWEI, 40 * GWEI),
        ]);

        process_effective_balance_updates(&mut state, &spec).unwrap();

        let effective = state
            .validators
            .iter()
            .map(|v| v.effective_balance)
            .collect::<Vec<_>>();
        assert_eq!(effective, vec![32 * GWEI, 31 * GWEI, 30 * GWEI, 32 * GWEI]);
    }
}
