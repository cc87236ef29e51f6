pub use consensus_metrics::*;

lazy_static::lazy_static! {
    /*
     * Block processing
     */
    pub static ref BLOCK_PROCESSING_TIMES: Result<Histogram> = try_create_histogram(
        "state_processing_block_processing_seconds",
        "Time spent applying a block to a state"
    );
    pub static ref BLOCK_SIGNATURE_VERIFICATION_TIMES: Result<Histogram> = try_create_histogram(
        "state_processing_block_signature_verification_seconds",
        "Time spent verifying every signature in a block in bulk"
    );
    pub static ref BLOCK_PROCESSING_FAILURES: Result<IntCounter> = try_create_int_counter(
        "state_processing_block_processing_failures_total",
        "Count of blocks rejected by block processing"
    );
    /*
     * Epoch processing
     */
    pub static ref EPOCH_PROCESSING_TIMES: Result<Histogram> = try_create_histogram(
        "state_processing_epoch_processing_seconds",
        "Time spent running the epoch transition"
    );
    pub static ref PARTICIPATION_CACHE_BUILD_TIMES: Result<Histogram> = try_create_histogram(
        "state_processing_participation_cache_build_seconds",
        "Time spent tallying participation at the start of an epoch transition"
    );
    /*
     * Slot processing
     */
    pub static ref SLOT_PROCESSING_TIMES: Result<Histogram> = try_create_histogram(
        "state_processing_slot_processing_seconds",
        "Time spent advancing a state by one slot"
    );
}
