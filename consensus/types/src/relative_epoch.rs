use crate::*;
use safe_arith::{ArithError, SafeArith};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Error {
    EpochTooLow { base: Epoch, other: Epoch },
    EpochTooHigh { base: Epoch, other: Epoch },
    ArithError(ArithError),
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Self {
        Self::ArithError(e)
    }
}

/// An epoch named by its position relative to the state's current epoch.
///
/// Committee caches are kept for exactly these three epochs.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum RelativeEpoch {
    /// The prior epoch.
    Previous,
    /// The current epoch.
    Current,
    /// The next epoch. Its shuffling is fixed by the lookahead, so it is already known.
    Next,
}

impl RelativeEpoch {
    /// Returns the `epoch` that `self` refers to, with respect to the `base` epoch.
    ///
    /// `Previous` at genesis is the genesis epoch itself.
    pub fn into_epoch(self, base: Epoch) -> Epoch {
        match self {
            RelativeEpoch::Previous => base.saturating_sub(1u64),
            RelativeEpoch::Current => base,
            RelativeEpoch::Next => base.saturating_add(1u64),
        }
    }

    /// Converts `other` into a `RelativeEpoch` with respect to `base`.
    ///
    /// Errors if `other` is more than one epoch either side of `base`.
    pub fn from_epoch(base: Epoch, other: Epoch) -> Result<Self, Error> {
        if other == base {
            Ok(RelativeEpoch::Current)
        } else if other.safe_add(1)? == base {
            Ok(RelativeEpoch::Previous)
        } else if other == base.safe_add(1)? {
            Ok(RelativeEpoch::Next)
        } else if other < base {
            Err(Error::EpochTooLow { base, other })
        } else {
            Err(Error::EpochTooHigh { base, other })
        }
    }

    /// Convenience function for `Self::from_epoch` where both slots are converted into epochs.
    pub fn from_slot(base: Slot, other: Slot, slots_per_epoch: u64) -> Result<Self, Error> {
        Self::from_epoch(base.epoch(slots_per_epoch), other.epoch(slots_per_epoch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_epoch() {
        let base = Epoch::new(10);

        assert_eq!(
            RelativeEpoch::from_epoch(base, base - 1),
            Ok(RelativeEpoch::Previous)
        );
        assert_eq!(
            RelativeEpoch::from_epoch(base, base),
            Ok(RelativeEpoch::Current)
        );
        assert_eq!(
            RelativeEpoch::from_epoch(base, base + 1),
            Ok(RelativeEpoch::Next)
        );
        assert_eq!(
            RelativeEpoch::from_epoch(base, base - 2),
            Err(Error::EpochTooLow {
                base,
                other: base - 2
            })
        );
        assert_eq!(
            RelativeEpoch::from_epoch(base, base + 2),
            Err(Error::EpochTooHigh {
                base,
                other: base + 2
            })
        );
    }

    #[test]
    fn into_epoch_round_trips() {
        let base = Epoch::new(3);
        for relative in [
            RelativeEpoch::Previous,
            RelativeEpoch::Current,
            RelativeEpoch::Next,
        ] {
            assert_eq!(
                RelativeEpoch::from_epoch(base, relative.into_epoch(base)),
                Ok(relative)
            );
        }
    }

    #[test]
    fn from_slot() {
        assert_eq!(
            RelativeEpoch::from_slot(Slot::new(16), Slot::new(8), 8),
            Ok(RelativeEpoch::Previous)
        );
        assert_eq!(
            RelativeEpoch::from_slot(Slot::new(16), Slot::new(30), 8),
            Ok(RelativeEpoch::Next)
        );
    }
}
