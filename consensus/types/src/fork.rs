use crate::*;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The fork version in force before and after `epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Fork {
    #[serde(with = "serde_utils::bytes_4_hex")]
    pub previous_version: [u8; 4],
    #[serde(with = "serde_utils::bytes_4_hex")]
    pub current_version: [u8; 4],
    pub epoch: Epoch,
}

impl Fork {
    /// The fork a chain starts with: no previous version.
    pub fn genesis(spec: &ChainSpec) -> Self {
        Self {
            previous_version: spec.genesis_fork_version,
            current_version: spec.genesis_fork_version,
            epoch: Epoch::new(0),
        }
    }

    /// Return the fork version of the given ``epoch``.
    pub fn get_fork_version(&self, epoch: Epoch) -> [u8; 4] {
        if epoch < self.epoch {
            self.previous_version
        } else {
            self.current_version
        }
    }
}

/// Object hashed into every signature domain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct ForkData {
    #[serde(with = "serde_utils::bytes_4_hex")]
    pub current_version: [u8; 4],
    pub genesis_validators_root: Hash256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_version_switches_at_epoch() {
        let fork = Fork {
            previous_version: [0, 0, 0, 1],
            current_version: [0, 0, 0, 2],
            epoch: Epoch::new(10),
        };
        assert_eq!(fork.get_fork_version(Epoch::new(9)), [0, 0, 0, 1]);
        assert_eq!(fork.get_fork_version(Epoch::new(10)), [0, 0, 0, 2]);
        assert_eq!(fork.get_fork_version(Epoch::new(11)), [0, 0, 0, 2]);
    }
}
