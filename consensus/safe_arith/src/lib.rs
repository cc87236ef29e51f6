//! Checked integer arithmetic for consensus code.
//!
//! Every balance, epoch and index computation in the state transition goes through these
//! methods so that an overflow or a zero divisor surfaces as an error instead of a panic or a
//! silently wrapped value.
mod iter;

pub use iter::SafeArithIter;

/// Failure of a checked arithmetic operation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithError {
    Overflow,
    DivisionByZero,
}

pub type Result<T> = std::result::Result<T, ArithError>;

macro_rules! in_place {
    ($name:ident, $op:ident, $rhs:ty) => {
        #[doc = concat!("In-place form of `", stringify!($op), "`.")]
        #[inline]
        fn $name(&mut self, other: $rhs) -> Result<()> {
            *self = self.$op(other)?;
            Ok(())
        }
    };
}

/// Checked arithmetic on unsigned integers.
pub trait SafeArith<Rhs = Self>: Sized + Copy {
    const ZERO: Self;
    const ONE: Self;

    fn safe_add(&self, other: Rhs) -> Result<Self>;
    fn safe_sub(&self, other: Rhs) -> Result<Self>;
    fn safe_mul(&self, other: Rhs) -> Result<Self>;

    /// Errors with `DivisionByZero` rather than panicking.
    fn safe_div(&self, other: Rhs) -> Result<Self>;

    /// Errors with `DivisionByZero` rather than panicking.
    fn safe_rem(&self, other: Rhs) -> Result<Self>;

    fn safe_shl(&self, other: u32) -> Result<Self>;
    fn safe_shr(&self, other: u32) -> Result<Self>;

    in_place!(safe_add_assign, safe_add, Rhs);
    in_place!(safe_sub_assign, safe_sub, Rhs);
    in_place!(safe_mul_assign, safe_mul, Rhs);
    in_place!(safe_div_assign, safe_div, Rhs);
    in_place!(safe_rem_assign, safe_rem, Rhs);
    in_place!(safe_shl_assign, safe_shl, u32);
    in_place!(safe_shr_assign, safe_shr, u32);
}

macro_rules! impl_for_unsigned {
    ($($typ:ty),*) => {
        $(
            impl SafeArith for $typ {
                const ZERO: Self = 0;
                const ONE: Self = 1;

                #[inline]
                fn safe_add(&self, other: Self) -> Result<Self> {
                    self.checked_add(other).ok_or(ArithError::Overflow)
                }

                #[inline]
                fn safe_sub(&self, other: Self) -> Result<Self> {
                    self.checked_sub(other).ok_or(ArithError::Overflow)
                }

                #[inline]
                fn safe_mul(&self, other: Self) -> Result<Self> {
                    self.checked_mul(other).ok_or(ArithError::Overflow)
                }

                #[inline]
                fn safe_div(&self, other: Self) -> Result<Self> {
                    self.checked_div(other).ok_or(ArithError::DivisionByZero)
                }

                #[inline]
                fn safe_rem(&self, other: Self) -> Result<Self> {
                    self.checked_rem(other).ok_or(ArithError::DivisionByZero)
                }

                #[inline]
                fn safe_shl(&self, other: u32) -> Result<Self> {
                    self.checked_shl(other).ok_or(ArithError::Overflow)
                }

                #[inline]
                fn safe_shr(&self, other: u32) -> Result<Self> {
                    self.checked_shr(other).ok_or(ArithError::Overflow)
                }
            }
        )*
    };
}

impl_for_unsigned!(u8, u16, u32, u64, usize);

#[cfg(test)]
mod test {
    use super::*;

    const GWEI: u64 = 1_000_000_000;

    #[test]
    fn balance_math() {
        let balance = 32 * GWEI;
        assert_eq!(balance.safe_add(GWEI), Ok(33 * GWEI));
        assert_eq!(balance.safe_sub(GWEI), Ok(31 * GWEI));
        assert_eq!(balance.safe_div(GWEI), Ok(32));
        assert_eq!(balance.safe_rem(3 * GWEI), Ok(2 * GWEI));
        assert_eq!(GWEI.safe_mul(32), Ok(balance));
        assert_eq!(1u64.safe_shl(6), Ok(64));
        assert_eq!(64u64.safe_shr(6), Ok(1));
    }

    #[test]
    fn assign_variants() {
        let mut cursor = 120usize;
        cursor.safe_add_assign(80).unwrap();
        cursor.safe_rem_assign(128).unwrap();
        assert_eq!(cursor, 72);
        cursor.safe_sub_assign(8).unwrap();
        cursor.safe_div_assign(2).unwrap();
        cursor.safe_mul_assign(3).unwrap();
        assert_eq!(cursor, 96);
        cursor.safe_shr_assign(5).unwrap();
        cursor.safe_shl_assign(1).unwrap();
        assert_eq!(cursor, 6);
    }

    #[test]
    fn failures() {
        assert_eq!(u64::MAX.safe_add(1), Err(ArithError::Overflow));
        assert_eq!(0u64.safe_sub(1), Err(ArithError::Overflow));
        assert_eq!(u64::MAX.safe_mul(2), Err(ArithError::Overflow));
        assert_eq!(GWEI.safe_div(0), Err(ArithError::DivisionByZero));
        assert_eq!(GWEI.safe_rem(0), Err(ArithError::DivisionByZero));
        assert_eq!(1u8.safe_shl(8), Err(ArithError::Overflow));
        assert_eq!(1u8.safe_shr(8), Err(ArithError::Overflow));
    }

    #[test]
    fn failed_assign_leaves_value() {
        let mut balance = u64::MAX;
        assert!(balance.safe_add_assign(1).is_err());
        assert_eq!(balance, u64::MAX);
    }
}
