use promise_cache::PromiseCacheError;
use state_processing::state_advance::Error as StateAdvanceError;
use state_processing::{BlockProcessingError, EpochProcessingError, SlotProcessingError};
use types::*;

macro_rules! easy_from_to {
    ($from: ident, $to: ident) => {
        impl From<$from> for $to {
            fn from(e: $from) -> $to {
                $to::$from(e)
            }
        }
    };
}

/// Reasons a transition driven by the `TransitionEngine` can fail.
///
/// A failed transition never modifies the engine's state.
#[derive(Debug, PartialEq)]
pub enum Error {
    BeaconStateError(BeaconStateError),
    BlockProcessingError(BlockProcessingError),
    SlotProcessingError(SlotProcessingError),
    StateAdvanceError(StateAdvanceError),
    /// Slots can only be processed forwards.
    SlotInPast { state_slot: Slot, target_slot: Slot },
    /// The block's slot is not after the slot of the engine's state.
    BlockSlotInPast { state_slot: Slot, block_slot: Slot },
    /// The block's parent is not the engine's head.
    UnknownParent { parent_root: Hash256, head_root: Hash256 },
    /// Applying the block produced a different state root than the block commits to.
    StateRootMismatch { block: Hash256, local: Hash256 },
    /// Proposers are only known for the head state's epoch and the epochs after it.
    ProposerEpochInPast { epoch: Epoch, state_epoch: Epoch },
    /// A committee cache came back for a different epoch than was asked for.
    ShufflingEpochMismatch { expected: Epoch, found: Option<Epoch> },
}

easy_from_to!(BeaconStateError, Error);
easy_from_to!(BlockProcessingError, Error);
easy_from_to!(SlotProcessingError, Error);
easy_from_to!(StateAdvanceError, Error);

impl Error {
    /// Returns `true` if the transition was abandoned through its `CancelToken`, at any depth.
    pub fn is_cancelled(&self) -> bool {
        let slot_error = match self {
            Error::BeaconStateError(e) => return *e == BeaconStateError::Cancelled,
            Error::BlockProcessingError(BlockProcessingError::BeaconStateError(e)) => {
                return *e == BeaconStateError::Cancelled
            }
            Error::SlotProcessingError(e) => e,
            Error::StateAdvanceError(StateAdvanceError::PerSlotProcessing(e)) => e,
            _ => return false,
        };
        matches!(
            slot_error,
            SlotProcessingError::BeaconStateError(BeaconStateError::Cancelled)
                | SlotProcessingError::EpochProcessingError(EpochProcessingError::BeaconStateError(
                    BeaconStateError::Cancelled
                ))
        )
    }
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Error {
        Error::BeaconStateError(e.into())
    }
}

/// Something went wrong while looking after a cache.
///
/// These never fail a transition: the engine falls back to computing from the state and reports
/// the problem alongside the result.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheMaintenanceError {
    /// A promise or insertion failed inside one of the caches.
    PromiseCache {
        cache: &'static str,
        error: PromiseCacheError,
    },
    /// The state could not produce a key for a cache lookup.
    KeyUnavailable {
        cache: &'static str,
        error: BeaconStateError,
    },
    /// A cached value could not be installed onto the state.
    InstallFailed {
        cache: &'static str,
        error: BeaconStateError,
    },
}

impl CacheMaintenanceError {
    pub fn cache(&self) -> &'static str {
        match self {
            CacheMaintenanceError::PromiseCache { cache, .. }
            | CacheMaintenanceError::KeyUnavailable { cache, .. }
            | CacheMaintenanceError::InstallFailed { cache, .. } => cache,
        }
    }
}
