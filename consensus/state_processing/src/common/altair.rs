use integer_sqrt::IntegerSquareRoot;
use safe_arith::SafeArith;
use types::{BeaconStateError as Error, *};

/// This type exists to avoid confusing `total_active_balance` with `base_reward_per_increment`,
/// since they are used in close proximity and the same type (`u64`).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BaseRewardPerIncrement(u64);

impl BaseRewardPerIncrement {
    pub fn new(total_active_balance: u64, spec: &ChainSpec) -> Result<Self, Error> {
        get_base_reward_per_increment(total_active_balance, spec).map(Self)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Returns the base reward for some validator.
///
/// Takes `base_reward_per_increment` rather than computing it each time, since the
/// recomputation dominates when called for every validator.
pub fn get_base_reward(
    validator_effective_balance: u64,
    base_reward_per_increment: BaseRewardPerIncrement,
    spec: &ChainSpec,
) -> Result<u64, Error> {
    validator_effective_balance
        .safe_div(spec.effective_balance_increment)?
        .safe_mul(base_reward_per_increment.as_u64())
        .map_err(Into::into)
}

fn get_base_reward_per_increment(total_active_balance: u64, spec: &ChainSpec) -> Result<u64, Error> {
    if total_active_balance == 0 {
        return Err(Error::ZeroActiveBalance);
    }
    Ok(spec
        .effective_balance_increment
        .safe_mul(spec.base_reward_factor)?
        .safe_div(total_active_balance.integer_sqrt())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_active_balance() {
        let spec = ChainSpec::mainnet();
        assert_eq!(
            BaseRewardPerIncrement::new(0, &spec),
            Err(Error::ZeroActiveBalance)
        );
    }

    #[test]
    fn mainnet_literal() {
        let spec = ChainSpec::mainnet();
        let per_increment = BaseRewardPerIncrement::new(1_000_000_000, &spec).unwrap();
        assert_eq!(per_increment.as_u64(), 2_023_907);
        assert_eq!(
            get_base_reward(spec.max_effective_balance, per_increment, &spec).unwrap(),
            32 * 2_023_907
        );
    }
}
