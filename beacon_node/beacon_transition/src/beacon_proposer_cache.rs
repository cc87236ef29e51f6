//! The `BeaconProposerCache` stores the proposer indices for some epoch.
//!
//! This cache is keyed by `(epoch, block_root)` where `block_root` is the block root at
//! `end_slot(epoch - 1)`. We make the assertion that the proposer shuffling is identical for all
//! blocks in `epoch` which share the common ancestor of `block_root`.
//!
//! The values it stores are very small, so entries for epochs that are long finalized are left to
//! age out rather than being pruned.
use crate::errors::CacheMaintenanceError;
use crate::metrics;
use crate::single_flight::{
    record_maintenance_error, CacheMetrics, EpochKey, EpochProtector, SingleFlightCache,
};
use slog::Logger;
use smallvec::SmallVec;
use std::sync::Arc;
use types::{BeaconState, BeaconStateError, ChainSpec, Epoch, EthSpec, Fork, Hash256, Slot};

const CACHE_NAME: &str = "proposer";

/// This value is fairly unimportant, it's used to avoid heap allocations. The result of it being
/// incorrect is non-substantial from a consensus perspective (and probably also from a
/// performance perspective).
const TYPICAL_SLOTS_PER_EPOCH: usize = 32;

/// For some given slot, this contains the proposer index (`index`) and the `fork` that should be
/// used to verify their signature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposer {
    pub index: usize,
    pub fork: Fork,
}

/// The list of proposers for some given `epoch`, alongside the `fork` that should be used to verify
/// their signatures.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochBlockProposers {
    /// The epoch to which the proposers pertain.
    pub epoch: Epoch,
    /// The fork that should be used to verify proposer signatures.
    pub fork: Fork,
    /// A list of length `E::slots_per_epoch()`, representing the proposers for each slot in that
    /// epoch.
    ///
    /// E.g., if `self.epoch == 1`, then `self.proposers[0]` contains the proposer for slot `32`.
    pub proposers: SmallVec<[usize; TYPICAL_SLOTS_PER_EPOCH]>,
}

impl EpochBlockProposers {
    /// Compute the proposers for the current epoch of `state`.
    pub fn compute<E: EthSpec>(
        state: &BeaconState<E>,
        spec: &ChainSpec,
    ) -> Result<Self, BeaconStateError> {
        Ok(Self {
            epoch: state.current_epoch(),
            fork: state.fork,
            proposers: state.get_beacon_proposer_indices(spec)?.into(),
        })
    }

    /// The proposer of `slot`, or `None` if `slot` is outside `self.epoch`.
    pub fn get_slot<E: EthSpec>(&self, slot: Slot) -> Option<Proposer> {
        let position = self.epoch.position(slot, E::slots_per_epoch())?;
        self.proposers.get(position).map(|&index| Proposer {
            index,
            fork: self.fork,
        })
    }
}

/// A cache to store the proposers for some epoch.
///
/// See the module-level documentation for more information.
pub struct BeaconProposerCache {
    cache: SingleFlightCache<EpochBlockProposers>,
}

impl BeaconProposerCache {
    pub fn new(capacity: usize, log: Logger) -> Self {
        let metrics = CacheMetrics {
            hits: &metrics::PROPOSER_CACHE_HITS,
            misses: &metrics::PROPOSER_CACHE_MISSES,
            promise_waits: &metrics::PROPOSER_CACHE_PROMISE_WAITS,
            size: &metrics::PROPOSER_CACHE_SIZE,
        };
        Self {
            cache: SingleFlightCache::new(CACHE_NAME, capacity, metrics, log),
        }
    }

    /// The key of the proposers for the current epoch of `state`, where `head_block_root` is the
    /// latest block applied to `state`.
    pub fn proposer_shuffling_id<E: EthSpec>(
        state: &BeaconState<E>,
        head_block_root: Hash256,
    ) -> Result<EpochKey, BeaconStateError> {
        Ok(EpochKey::new(
            state.current_epoch(),
            state.proposer_shuffling_decision_root(head_block_root)?,
        ))
    }

    /// Returns the proposers for every slot of the current epoch of `state`.
    pub fn get_epoch<E: EthSpec>(
        &self,
        state: &BeaconState<E>,
        head_block_root: Hash256,
        spec: &ChainSpec,
        maintenance: &mut Vec<CacheMaintenanceError>,
    ) -> Result<Arc<EpochBlockProposers>, BeaconStateError> {
        let compute = || EpochBlockProposers::compute(state, spec).map(Arc::new);

        match Self::proposer_shuffling_id(state, head_block_root) {
            Ok(key) => self.cache.get_or_compute(key, compute, maintenance),
            Err(error) => {
                record_maintenance_error(
                    self.cache.log(),
                    CacheMaintenanceError::KeyUnavailable {
                        cache: CACHE_NAME,
                        error,
                    },
                    maintenance,
                );
                compute()
            }
        }
    }

    /// Returns the proposer for `slot`, which must be in the current epoch of `state`.
    pub fn get_slot<E: EthSpec>(
        &self,
        state: &BeaconState<E>,
        head_block_root: Hash256,
        slot: Slot,
        spec: &ChainSpec,
        maintenance: &mut Vec<CacheMaintenanceError>,
    ) -> Result<Proposer, BeaconStateError> {
        self.get_epoch(state, head_block_root, spec, maintenance)?
            .get_slot::<E>(slot)
            .ok_or(BeaconStateError::SlotOutOfBounds)
    }

    pub fn contains(&self, key: &EpochKey) -> bool {
        self.cache.contains(key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear()
    }

    pub fn update_protector(&self, protector: EpochProtector) {
        self.cache.update_protector(protector)
    }
}
