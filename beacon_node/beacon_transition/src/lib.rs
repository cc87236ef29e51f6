//! Cache-aware driver for beacon state transitions.
//!
//! `TransitionEngine` owns a `BeaconState` and moves it through slots and blocks with
//! `state_processing`, consulting a set of explicit caches for the values that are expensive to
//! derive: committee shufflings, per-epoch proposer lists and total active balances. The caches
//! only ever save work; a disabled cache yields the same states.
pub mod beacon_proposer_cache;
pub mod config;
mod engine;
pub mod errors;
mod metrics;
pub mod shuffling_cache;
pub mod single_flight;
pub mod total_active_balance_cache;
pub mod transition_caches;

pub use beacon_proposer_cache::{BeaconProposerCache, EpochBlockProposers, Proposer};
pub use config::{EngineConfig, SignatureVerification, DEFAULT_CACHE_SIZE};
pub use engine::{TransitionEngine, TransitionOutcome};
pub use errors::{CacheMaintenanceError, Error};
pub use shuffling_cache::ShufflingCache;
pub use single_flight::{EpochKey, EpochProtector};
pub use total_active_balance_cache::TotalActiveBalanceCache;
pub use transition_caches::TransitionCaches;
