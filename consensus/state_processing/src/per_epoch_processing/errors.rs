use types::BeaconStateError;

#[derive(Debug, PartialEq)]
pub enum EpochProcessingError {
    /// A per-validator delta was indexed outside the registry.
    DeltaOutOfBounds(usize),
    InvalidFlagIndex(usize),
    /// A justification bit could not be read or written.
    InvalidJustificationBit(ssz_types::Error),
    BeaconStateError(BeaconStateError),
    SszTypesError(ssz_types::Error),
    ArithError(safe_arith::ArithError),
}

impl From<BeaconStateError> for EpochProcessingError {
    fn from(e: BeaconStateError) -> EpochProcessingError {
        EpochProcessingError::BeaconStateError(e)
    }
}

impl From<ssz_types::Error> for EpochProcessingError {
    fn from(e: ssz_types::Error) -> EpochProcessingError {
        EpochProcessingError::SszTypesError(e)
    }
}

impl From<safe_arith::ArithError> for EpochProcessingError {
    fn from(e: safe_arith::ArithError) -> EpochProcessingError {
        EpochProcessingError::ArithError(e)
    }
}
