use crate::*;
use int_to_bytes::int_to_bytes4;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tree_hash::TreeHash;

/// Each of the signature domains.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Domain {
    BeaconProposer,
    BeaconAttester,
    Randao,
    Deposit,
    VoluntaryExit,
    SelectionProof,
    AggregateAndProof,
    SyncCommittee,
}

/// Runtime protocol parameters.
///
/// A `ChainSpec` is built once (from a preset, optionally overridden by a `Config`) and then
/// only ever borrowed. Tests that need different values construct a different `ChainSpec`.
#[derive(PartialEq, Debug, Clone)]
pub struct ChainSpec {
    /*
     * Constants
     */
    pub genesis_slot: Slot,
    pub far_future_epoch: Epoch,
    pub base_rewards_per_epoch: u64,
    pub deposit_contract_tree_depth: u64,

    /*
     * Misc
     */
    pub max_committees_per_slot: usize,
    pub target_committee_size: usize,
    pub min_per_epoch_churn_limit: u64,
    pub churn_limit_quotient: u64,
    pub shuffle_round_count: u8,
    pub min_genesis_active_validator_count: u64,
    pub min_genesis_time: u64,
    pub hysteresis_quotient: u64,
    pub hysteresis_downward_multiplier: u64,
    pub hysteresis_upward_multiplier: u64,

    /*
     *  Gwei values
     */
    pub min_deposit_amount: u64,
    pub max_effective_balance: u64,
    pub ejection_balance: u64,
    pub effective_balance_increment: u64,

    /*
     * Initial Values
     */
    pub genesis_fork_version: [u8; 4],
    pub key_withdrawal_prefix_byte: u8,
    pub execution_address_withdrawal_prefix_byte: u8,

    /*
     * Time parameters
     */
    pub genesis_delay: u64,
    pub seconds_per_slot: u64,
    pub min_attestation_inclusion_delay: u64,
    pub min_seed_lookahead: Epoch,
    pub max_seed_lookahead: Epoch,
    pub min_epochs_to_inactivity_penalty: u64,
    pub min_validator_withdrawability_delay: Epoch,
    pub shard_committee_period: u64,
    pub epochs_per_sync_committee_period: Epoch,

    /*
     * Reward and penalty quotients
     */
    pub base_reward_factor: u64,
    pub whistleblower_reward_quotient: u64,
    pub inactivity_penalty_quotient: u64,
    pub min_slashing_penalty_quotient: u64,
    pub proportional_slashing_multiplier: u64,
    pub inactivity_score_bias: u64,
    pub inactivity_score_recovery_rate: u64,

    /*
     * Withdrawals
     */
    pub max_validators_per_withdrawals_sweep: u64,

    /*
     * Signature domains
     */
    pub(crate) domain_beacon_proposer: u32,
    pub(crate) domain_beacon_attester: u32,
    pub(crate) domain_randao: u32,
    pub(crate) domain_deposit: u32,
    pub(crate) domain_voluntary_exit: u32,
    pub(crate) domain_selection_proof: u32,
    pub(crate) domain_aggregate_and_proof: u32,
    pub(crate) domain_sync_committee: u32,
}

impl ChainSpec {
    /// Returns the number of validators that may enter or exit per epoch.
    pub fn churn_limit(&self, active_validator_count: u64) -> Result<u64, Error> {
        Ok(std::cmp::max(
            self.min_per_epoch_churn_limit,
            active_validator_count.safe_div(self.churn_limit_quotient)?,
        ))
    }

    /// Epoch at which a validator activated or exited during `epoch` takes effect.
    pub fn compute_activation_exit_epoch(&self, epoch: Epoch) -> Result<Epoch, ArithError> {
        epoch.safe_add(1)?.safe_add(self.max_seed_lookahead)
    }

    pub fn get_domain_constant(&self, domain: Domain) -> u32 {
        match domain {
            Domain::BeaconProposer => self.domain_beacon_proposer,
            Domain::BeaconAttester => self.domain_beacon_attester,
            Domain::Randao => self.domain_randao,
            Domain::Deposit => self.domain_deposit,
            Domain::VoluntaryExit => self.domain_voluntary_exit,
            Domain::SelectionProof => self.domain_selection_proof,
            Domain::AggregateAndProof => self.domain_aggregate_and_proof,
            Domain::SyncCommittee => self.domain_sync_committee,
        }
    }

    /// Get the domain for a signature over an object from `epoch` on the chain described by
    /// `fork` and `genesis_validators_root`.
    pub fn get_domain(
        &self,
        epoch: Epoch,
        domain: Domain,
        fork: &Fork,
        genesis_validators_root: Hash256,
    ) -> Hash256 {
        let fork_version = fork.get_fork_version(epoch);
        self.compute_domain(domain, fork_version, genesis_validators_root)
    }

    /// Deposits are valid across forks, so they are signed with the genesis fork version and a
    /// zero validators root.
    pub fn get_deposit_domain(&self) -> Hash256 {
        self.compute_domain(Domain::Deposit, self.genesis_fork_version, Hash256::zero())
    }

    /// `domain_type ++ fork_data_root[..28]`.
    pub fn compute_domain(
        &self,
        domain: Domain,
        fork_version: [u8; 4],
        genesis_validators_root: Hash256,
    ) -> Hash256 {
        let domain_constant = self.get_domain_constant(domain);

        let mut domain = [0; 32];
        domain[0..4].copy_from_slice(&int_to_bytes4(domain_constant));
        domain[4..].copy_from_slice(
            &Self::compute_fork_data_root(fork_version, genesis_validators_root)[..28],
        );

        Hash256::from(domain)
    }

    pub fn compute_fork_data_root(
        current_version: [u8; 4],
        genesis_validators_root: Hash256,
    ) -> Hash256 {
        ForkData {
            current_version,
            genesis_validators_root,
        }
        .tree_hash_root()
    }

    /// Returns the `ChainSpec` used on production networks.
    pub fn mainnet() -> Self {
        Self {
            /*
             * Constants
             */
            genesis_slot: Slot::new(0),
            far_future_epoch: Epoch::new(u64::MAX),
            base_rewards_per_epoch: 4,
            deposit_contract_tree_depth: 32,

            /*
             * Misc
             */
            max_committees_per_slot: 64,
            target_committee_size: 128,
            min_per_epoch_churn_limit: 4,
            churn_limit_quotient: 65_536,
            shuffle_round_count: 90,
            min_genesis_active_validator_count: 16_384,
            min_genesis_time: 1_606_824_000,
            hysteresis_quotient: 4,
            hysteresis_downward_multiplier: 1,
            hysteresis_upward_multiplier: 5,

            /*
             *  Gwei values
             */
            min_deposit_amount: 1_000_000_000,
            max_effective_balance: 32_000_000_000,
            ejection_balance: 16_000_000_000,
            effective_balance_increment: 1_000_000_000,

            /*
             * Initial Values
             */
            genesis_fork_version: [0; 4],
            key_withdrawal_prefix_byte: 0x00,
            execution_address_withdrawal_prefix_byte: 0x01,

            /*
             * Time parameters
             */
            genesis_delay: 604_800, // 7 days
            seconds_per_slot: 12,
            min_attestation_inclusion_delay: 1,
            min_seed_lookahead: Epoch::new(1),
            max_seed_lookahead: Epoch::new(4),
            min_epochs_to_inactivity_penalty: 4,
            min_validator_withdrawability_delay: Epoch::new(256),
            shard_committee_period: 256,
            epochs_per_sync_committee_period: Epoch::new(256),

            /*
             * Reward and penalty quotients
             */
            base_reward_factor: 64,
            whistleblower_reward_quotient: 512,
            inactivity_penalty_quotient: 16_777_216, // 2**24
            min_slashing_penalty_quotient: 32,
            proportional_slashing_multiplier: 3,
            inactivity_score_bias: 4,
            inactivity_score_recovery_rate: 16,

            /*
             * Withdrawals
             */
            max_validators_per_withdrawals_sweep: 16_384,

            /*
             * Signature domains
             */
            domain_beacon_proposer: 0,
            domain_beacon_attester: 1,
            domain_randao: 2,
            domain_deposit: 3,
            domain_voluntary_exit: 4,
            domain_selection_proof: 5,
            domain_aggregate_and_proof: 6,
            domain_sync_committee: 7,
        }
    }

    /// Ethereum Foundation minimal spec, as defined in the eth2.0-specs repo.
    pub fn minimal() -> Self {
        Self {
            max_committees_per_slot: 4,
            target_committee_size: 4,
            churn_limit_quotient: 32,
            shuffle_round_count: 10,
            min_genesis_active_validator_count: 64,
            min_genesis_time: 1_578_009_600,
            genesis_fork_version: [0x00, 0x00, 0x00, 0x01],
            genesis_delay: 300,
            seconds_per_slot: 6,
            shard_committee_period: 64,
            epochs_per_sync_committee_period: Epoch::new(8),
            max_validators_per_withdrawals_sweep: 16,
            ..ChainSpec::mainnet()
        }
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// YAML-representable overrides for the runtime parameters of a `ChainSpec`.
///
/// Unknown keys are ignored so that a full network config file may be supplied. The preset
/// named in `preset_base` must match the `EthSpec` the config is applied with.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "UPPERCASE")]
pub struct Config {
    #[serde(default)]
    pub config_name: Option<String>,
    pub preset_base: String,

    #[serde(with = "serde_utils::quoted_u64")]
    min_genesis_active_validator_count: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    min_genesis_time: u64,
    #[serde(with = "serde_utils::bytes_4_hex")]
    genesis_fork_version: [u8; 4],
    #[serde(with = "serde_utils::quoted_u64")]
    genesis_delay: u64,

    #[serde(with = "serde_utils::quoted_u64")]
    seconds_per_slot: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    min_validator_withdrawability_delay: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    shard_committee_period: u64,

    #[serde(with = "serde_utils::quoted_u64")]
    inactivity_score_bias: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    inactivity_score_recovery_rate: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    ejection_balance: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    min_per_epoch_churn_limit: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    churn_limit_quotient: u64,

    #[serde(default = "default_max_validators_per_withdrawals_sweep")]
    #[serde(with = "serde_utils::quoted_u64")]
    max_validators_per_withdrawals_sweep: u64,
}

fn default_max_validators_per_withdrawals_sweep() -> u64 {
    16_384
}

impl Config {
    /// Maximal set of values drawn from `spec` for preset `E`.
    pub fn from_chain_spec<E: EthSpec>(spec: &ChainSpec) -> Self {
        Self {
            config_name: None,
            preset_base: E::spec_name().to_string(),

            min_genesis_active_validator_count: spec.min_genesis_active_validator_count,
            min_genesis_time: spec.min_genesis_time,
            genesis_fork_version: spec.genesis_fork_version,
            genesis_delay: spec.genesis_delay,

            seconds_per_slot: spec.seconds_per_slot,
            min_validator_withdrawability_delay: spec.min_validator_withdrawability_delay.as_u64(),
            shard_committee_period: spec.shard_committee_period,

            inactivity_score_bias: spec.inactivity_score_bias,
            inactivity_score_recovery_rate: spec.inactivity_score_recovery_rate,
            ejection_balance: spec.ejection_balance,
            min_per_epoch_churn_limit: spec.min_per_epoch_churn_limit,
            churn_limit_quotient: spec.churn_limit_quotient,

            max_validators_per_withdrawals_sweep: spec.max_validators_per_withdrawals_sweep,
        }
    }

    pub fn from_file(filename: &Path) -> Result<Self, String> {
        let f = File::open(filename)
            .map_err(|e| format!("Error opening spec at {}: {:?}", filename.display(), e))?;
        serde_yaml::from_reader(f)
            .map_err(|e| format!("Error parsing spec at {}: {:?}", filename.display(), e))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| format!("Error parsing spec: {:?}", e))
    }

    /// Overlay this config onto the preset for `E`.
    ///
    /// Returns `None` if the config names a different preset.
    pub fn apply_to_chain_spec<E: EthSpec>(&self, chain_spec: &ChainSpec) -> Option<ChainSpec> {
        if self.preset_base != E::spec_name().to_string() {
            return None;
        }

        Some(ChainSpec {
            min_genesis_active_validator_count: self.min_genesis_active_validator_count,
            min_genesis_time: self.min_genesis_time,
            genesis_fork_version: self.genesis_fork_version,
            genesis_delay: self.genesis_delay,
            seconds_per_slot: self.seconds_per_slot,
            min_validator_withdrawability_delay: Epoch::new(
                self.min_validator_withdrawability_delay,
            ),
            shard_committee_period: self.shard_committee_period,
            inactivity_score_bias: self.inactivity_score_bias,
            inactivity_score_recovery_rate: self.inactivity_score_recovery_rate,
            ejection_balance: self.ejection_balance,
            min_per_epoch_churn_limit: self.min_per_epoch_churn_limit,
            churn_limit_quotient: self.churn_limit_quotient,
            max_validators_per_withdrawals_sweep: self.max_validators_per_withdrawals_sweep,
            ..chain_spec.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_are_distinct() {
        let spec = ChainSpec::mainnet();
        let fork = Fork::genesis(&spec);
        let root = Hash256::repeat_byte(3);
        let domains = [
            Domain::BeaconProposer,
            Domain::BeaconAttester,
            Domain::Randao,
            Domain::Deposit,
            Domain::VoluntaryExit,
            Domain::SelectionProof,
            Domain::AggregateAndProof,
            Domain::SyncCommittee,
        ];
        let computed: Vec<_> = domains
            .iter()
            .map(|d| spec.get_domain(Epoch::new(0), *d, &fork, root))
            .collect();
        for (i, a) in computed.iter().enumerate() {
            assert_eq!(
                &a.as_bytes()[0..4],
                &int_to_bytes4(spec.get_domain_constant(domains[i]))[..]
            );
            for b in computed.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn domain_depends_on_validators_root() {
        let spec = ChainSpec::mainnet();
        let fork = Fork::genesis(&spec);
        assert_ne!(
            spec.get_domain(Epoch::new(0), Domain::Randao, &fork, Hash256::zero()),
            spec.get_domain(Epoch::new(0), Domain::Randao, &fork, Hash256::repeat_byte(1))
        );
    }

    #[test]
    fn deposit_domain_ignores_validators_root() {
        let spec = ChainSpec::mainnet();
        assert_eq!(
            spec.get_deposit_domain(),
            spec.compute_domain(Domain::Deposit, spec.genesis_fork_version, Hash256::zero())
        );
    }

    #[test]
    fn churn_limit_has_floor() {
        let spec = ChainSpec::mainnet();
        assert_eq!(spec.churn_limit(0).unwrap(), 4);
        assert_eq!(spec.churn_limit(65_536 * 10).unwrap(), 10);
    }

    #[test]
    fn config_round_trip() {
        let spec = ChainSpec::minimal();
        let config = Config::from_chain_spec::<MinimalEthSpec>(&spec);
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(
            parsed.apply_to_chain_spec::<MinimalEthSpec>(&ChainSpec::minimal()),
            Some(spec)
        );
    }

    #[test]
    fn config_overrides_and_preset_check() {
        let yaml = r#"
PRESET_BASE: 'minimal'
CONFIG_NAME: 'sweep-test'
MIN_GENESIS_ACTIVE_VALIDATOR_COUNT: '64'
MIN_GENESIS_TIME: '0'
GENESIS_FORK_VERSION: '0x00000001'
GENESIS_DELAY: '0'
SECONDS_PER_SLOT: '6'
MIN_VALIDATOR_WITHDRAWABILITY_DELAY: '256'
SHARD_COMMITTEE_PERIOD: '64'
INACTIVITY_SCORE_BIAS: '4'
INACTIVITY_SCORE_RECOVERY_RATE: '16'
EJECTION_BALANCE: '16000000000'
MIN_PER_EPOCH_CHURN_LIMIT: '2'
CHURN_LIMIT_QUOTIENT: '32'
MAX_VALIDATORS_PER_WITHDRAWALS_SWEEP: '80'
UNKNOWN_FIELD: 'ignored'
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        let spec = config
            .apply_to_chain_spec::<MinimalEthSpec>(&ChainSpec::minimal())
            .unwrap();
        assert_eq!(spec.max_validators_per_withdrawals_sweep, 80);
        assert_eq!(spec.min_per_epoch_churn_limit, 2);
        assert_eq!(spec.genesis_delay, 0);
        assert!(config
            .apply_to_chain_spec::<MainnetEthSpec>(&ChainSpec::mainnet())
            .is_none());
    }
}
