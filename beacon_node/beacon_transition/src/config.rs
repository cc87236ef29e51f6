use serde::{Deserialize, Serialize};
use state_processing::BlockSignatureStrategy;

/// The number of entries each transition cache holds when nothing else is configured.
///
/// A shuffling entry is dominated by its index lists, roughly `8 * 2 * validator_count` bytes, so
/// with 100k validators the shuffling cache peaks around 26 MB.
pub const DEFAULT_CACHE_SIZE: usize = 16;

/// How the engine checks the signatures in the blocks it applies.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureVerification {
    /// Every signature is checked as its operation is processed.
    Individual,
    /// Signatures are collected up front and checked in parallel.
    Bulk,
    /// Only the RANDAO reveal is checked.
    RandaoOnly,
    /// No signature is checked. For replaying blocks that are already known to be valid.
    None,
}

impl From<SignatureVerification> for BlockSignatureStrategy {
    fn from(verification: SignatureVerification) -> Self {
        match verification {
            SignatureVerification::Individual => BlockSignatureStrategy::VerifyIndividual,
            SignatureVerification::Bulk => BlockSignatureStrategy::VerifyBulk,
            SignatureVerification::RandaoOnly => BlockSignatureStrategy::VerifyRandao,
            SignatureVerification::None => BlockSignatureStrategy::NoVerification,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Committee caches kept across transitions. Zero disables the cache.
    pub shuffling_cache_size: usize,
    /// Per-epoch proposer lists kept across transitions. Zero disables the cache.
    pub proposer_cache_size: usize,
    /// Total active balances kept across transitions. Zero disables the cache.
    pub total_active_balance_cache_size: usize,
    pub signature_verification: SignatureVerification,
    /// Reject blocks whose `state_root` differs from the root of the post-state.
    pub verify_state_root: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shuffling_cache_size: DEFAULT_CACHE_SIZE,
            proposer_cache_size: DEFAULT_CACHE_SIZE,
            total_active_balance_cache_size: DEFAULT_CACHE_SIZE,
            signature_verification: SignatureVerification::Bulk,
            verify_state_root: true,
        }
    }
}

impl EngineConfig {
    /// A config with every cache turned off.
    pub fn without_caches() -> Self {
        Self {
            shuffling_cache_size: 0,
            proposer_cache_size: 0,
            total_active_balance_cache_size: 0,
            ..Self::default()
        }
    }

    pub fn signature_strategy(&self) -> BlockSignatureStrategy {
        self.signature_verification.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let yaml = "shuffling_cache_size: 4\nsignature_verification: individual\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.shuffling_cache_size, 4);
        assert_eq!(config.proposer_cache_size, DEFAULT_CACHE_SIZE);
        assert_eq!(
            config.signature_strategy(),
            BlockSignatureStrategy::VerifyIndividual
        );
        assert!(config.verify_state_root);
    }

    #[test]
    fn yaml_round_trip() {
        let config = EngineConfig::without_caches();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(serde_yaml::from_str::<EngineConfig>(&yaml).unwrap(), config);
    }
}
