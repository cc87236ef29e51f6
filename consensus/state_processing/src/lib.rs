// Clippy lint set-up (disabled in tests)
#![cfg_attr(
    not(test),
    deny(
        clippy::arithmetic_side_effects,
        clippy::disallowed_methods,
        clippy::indexing_slicing,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::let_underscore_must_use
    )
)]

#[macro_use]
mod macros;
mod metrics;

pub mod common;
pub mod consensus_context;
pub mod genesis;
pub mod per_block_processing;
pub mod per_epoch_processing;
pub mod per_slot_processing;
pub mod state_advance;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use consensus_context::{ConsensusContext, ContextError};
pub use genesis::{
    initialize_beacon_state_from_execution, interop_genesis_state, is_valid_genesis_state,
    process_activations,
};
pub use per_block_processing::{
    block_signature_verifier, errors::BlockProcessingError, per_block_processing, signature_sets,
    BlockSignatureStrategy, BlockSignatureVerifier, VerifySignatures,
};
pub use per_epoch_processing::{
    errors::EpochProcessingError, process_epoch as per_epoch_processing,
    process_epoch_with_cancel, EpochProcessingSummary,
};
pub use per_slot_processing::{
    per_slot_processing, per_slot_processing_with_cancel, Error as SlotProcessingError,
};
