use crate::{Address, BeaconState, ChainSpec, Epoch, EthSpec, Hash256, PublicKeyBytes};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Information about a `BeaconChain` validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub effective_balance: u64,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl Validator {
    /// Returns `true` if the validator is considered active at some epoch.
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    /// Returns `true` if the validator is slashable at some epoch.
    pub fn is_slashable_at(&self, epoch: Epoch) -> bool {
        !self.slashed && self.activation_epoch <= epoch && epoch < self.withdrawable_epoch
    }

    /// Returns `true` if the validator is considered exited at some epoch.
    pub fn is_exited_at(&self, epoch: Epoch) -> bool {
        self.exit_epoch <= epoch
    }

    /// Returns `true` if the validator is able to withdraw at some epoch.
    pub fn is_withdrawable_at(&self, epoch: Epoch) -> bool {
        epoch >= self.withdrawable_epoch
    }

    /// Returns `true` if the validator is eligible to join the activation queue.
    pub fn is_eligible_for_activation_queue(&self, spec: &ChainSpec) -> bool {
        self.activation_eligibility_epoch == spec.far_future_epoch
            && self.effective_balance == spec.max_effective_balance
    }

    /// Returns `true` if the validator is eligible to be activated.
    ///
    /// Eligibility must have been finalized, and the validator must not already be scheduled.
    pub fn is_eligible_for_activation<E: EthSpec>(
        &self,
        state: &BeaconState<E>,
        spec: &ChainSpec,
    ) -> bool {
        self.activation_eligibility_epoch <= state.finalized_checkpoint.epoch
            && self.activation_epoch == spec.far_future_epoch
    }

    /// Returns `true` if the validator has an execution-address withdrawal credential.
    pub fn has_execution_withdrawal_credential(&self, spec: &ChainSpec) -> bool {
        self.withdrawal_credentials
            .as_bytes()
            .first()
            .map(|byte| *byte == spec.execution_address_withdrawal_prefix_byte)
            .unwrap_or(false)
    }

    /// Get the execution withdrawal address if this validator has one initialized.
    pub fn get_execution_withdrawal_address(&self, spec: &ChainSpec) -> Option<Address> {
        self.has_execution_withdrawal_credential(spec)
            .then(|| {
                self.withdrawal_credentials
                    .as_bytes()
                    .get(12..)
                    .map(Address::from_slice)
            })
            .flatten()
    }

    /// Returns `true` if the validator is fully withdrawable at some epoch.
    pub fn is_fully_withdrawable_at(&self, balance: u64, epoch: Epoch, spec: &ChainSpec) -> bool {
        self.has_execution_withdrawal_credential(spec)
            && self.withdrawable_epoch <= epoch
            && balance > 0
    }

    /// Returns `true` if the validator is partially withdrawable.
    pub fn is_partially_withdrawable_validator(&self, balance: u64, spec: &ChainSpec) -> bool {
        self.has_execution_withdrawal_credential(spec)
            && self.effective_balance == spec.max_effective_balance
            && balance > spec.max_effective_balance
    }
}

impl Default for Validator {
    /// Yields a "default" `Validator`. Primarily used for testing.
    fn default() -> Self {
        Self {
            pubkey: PublicKeyBytes::empty(),
            withdrawal_credentials: Hash256::default(),
            activation_eligibility_epoch: Epoch::from(u64::MAX),
            activation_epoch: Epoch::from(u64::MAX),
            exit_epoch: Epoch::from(u64::MAX),
            withdrawable_epoch: Epoch::from(u64::MAX),
            slashed: false,
            effective_balance: u64::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execution_credentials(spec: &ChainSpec) -> Hash256 {
        let mut bytes = [0; 32];
        bytes[0] = spec.execution_address_withdrawal_prefix_byte;
        bytes[12..].copy_from_slice(&[0x42; 20]);
        Hash256::from(bytes)
    }

    #[test]
    fn default() {
        let v = Validator::default();

        let epoch = Epoch::new(0);

        assert!(!v.is_active_at(epoch));
        assert!(!v.is_exited_at(epoch));
        assert!(!v.is_withdrawable_at(epoch));
        assert!(!v.slashed);
    }

    #[test]
    fn is_active_at() {
        let epoch = Epoch::new(10);

        let v = Validator {
            activation_epoch: epoch,
            ..Validator::default()
        };

        assert!(!v.is_active_at(epoch - 1));
        assert!(v.is_active_at(epoch));
        assert!(v.is_active_at(epoch + 1));
    }

    #[test]
    fn is_slashable_at() {
        let v = Validator {
            activation_epoch: Epoch::new(2),
            withdrawable_epoch: Epoch::new(8),
            ..Validator::default()
        };

        assert!(!v.is_slashable_at(Epoch::new(1)));
        assert!(v.is_slashable_at(Epoch::new(2)));
        assert!(v.is_slashable_at(Epoch::new(7)));
        assert!(!v.is_slashable_at(Epoch::new(8)));

        let slashed = Validator {
            slashed: true,
            ..v
        };
        assert!(!slashed.is_slashable_at(Epoch::new(4)));
    }

    #[test]
    fn is_exited_at() {
        let epoch = Epoch::new(10);

        let v = Validator {
            exit_epoch: epoch,
            ..Validator::default()
        };

        assert!(!v.is_exited_at(epoch - 1));
        assert!(v.is_exited_at(epoch));
        assert!(v.is_exited_at(epoch + 1));
    }

    #[test]
    fn withdrawal_address() {
        let spec = ChainSpec::mainnet();
        let v = Validator::default();
        assert!(!v.has_execution_withdrawal_credential(&spec));
        assert_eq!(v.get_execution_withdrawal_address(&spec), None);

        let v = Validator {
            withdrawal_credentials: execution_credentials(&spec),
            ..Validator::default()
        };
        assert!(v.has_execution_withdrawal_credential(&spec));
        assert_eq!(
            v.get_execution_withdrawal_address(&spec),
            Some(Address::repeat_byte(0x42))
        );
    }

    #[test]
    fn withdrawability() {
        let spec = ChainSpec::mainnet();
        let max = spec.max_effective_balance;
        let v = Validator {
            withdrawal_credentials: execution_credentials(&spec),
            effective_balance: max,
            withdrawable_epoch: Epoch::new(5),
            ..Validator::default()
        };

        assert!(!v.is_fully_withdrawable_at(max, Epoch::new(4), &spec));
        assert!(v.is_fully_withdrawable_at(max, Epoch::new(5), &spec));
        assert!(!v.is_fully_withdrawable_at(0, Epoch::new(5), &spec));

        assert!(!v.is_partially_withdrawable_validator(max, &spec));
        assert!(v.is_partially_withdrawable_validator(max + 1, &spec));

        let below_max = Validator {
            effective_balance: max - spec.effective_balance_increment,
            ..v
        };
        assert!(!below_max.is_partially_withdrawable_validator(max + 1, &spec));
    }
}
