macro_rules! impl_from_into_u64 {
    ($main: ident) => {
        impl From<u64> for $main {
            fn from(n: u64) -> $main {
                $main(n)
            }
        }

        impl From<$main> for u64 {
            fn from(from: $main) -> u64 {
                from.0
            }
        }

        impl $main {
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }
    };
}

macro_rules! impl_from_into_usize {
    ($main: ident) => {
        impl From<usize> for $main {
            fn from(n: usize) -> $main {
                $main(n as u64)
            }
        }

        impl From<$main> for usize {
            fn from(from: $main) -> usize {
                from.0 as usize
            }
        }

        impl $main {
            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }
        }
    };
}

/// Comparisons and saturating operators between `$main` and `$other`.
///
/// Consensus code uses the `SafeArith` impls below; the operators exist for tests and for
/// arithmetic that is bounded by construction.
macro_rules! impl_math_between {
    ($main: ident, $other: ident) => {
        impl PartialOrd<$other> for $main {
            fn partial_cmp(&self, other: &$other) -> Option<Ordering> {
                Some(self.0.cmp(&(*other).into()))
            }
        }

        impl PartialEq<$other> for $main {
            fn eq(&self, other: &$other) -> bool {
                let other: u64 = (*other).into();
                self.0 == other
            }
        }

        impl Add<$other> for $main {
            type Output = $main;

            fn add(self, other: $other) -> $main {
                $main::from(self.0.saturating_add(other.into()))
            }
        }

        impl AddAssign<$other> for $main {
            fn add_assign(&mut self, other: $other) {
                self.0 = self.0.saturating_add(other.into());
            }
        }

        impl Sub<$other> for $main {
            type Output = $main;

            fn sub(self, other: $other) -> $main {
                $main::from(self.0.saturating_sub(other.into()))
            }
        }

        impl SubAssign<$other> for $main {
            fn sub_assign(&mut self, other: $other) {
                self.0 = self.0.saturating_sub(other.into());
            }
        }

        impl Rem<$other> for $main {
            type Output = $main;

            fn rem(self, modulus: $other) -> $main {
                let modulus: u64 = modulus.into();
                $main::from(self.0 % modulus)
            }
        }

        impl SafeArith<$other> for $main {
            const ZERO: Self = $main::new(0);
            const ONE: Self = $main::new(1);

            fn safe_add(&self, other: $other) -> safe_arith::Result<Self> {
                self.0.safe_add(other.into()).map(Self::new)
            }

            fn safe_sub(&self, other: $other) -> safe_arith::Result<Self> {
                self.0.safe_sub(other.into()).map(Self::new)
            }

            fn safe_mul(&self, other: $other) -> safe_arith::Result<Self> {
                self.0.safe_mul(other.into()).map(Self::new)
            }

            fn safe_div(&self, other: $other) -> safe_arith::Result<Self> {
                self.0.safe_div(other.into()).map(Self::new)
            }

            fn safe_rem(&self, other: $other) -> safe_arith::Result<Self> {
                self.0.safe_rem(other.into()).map(Self::new)
            }

            fn safe_shl(&self, other: u32) -> safe_arith::Result<Self> {
                self.0.safe_shl(other).map(Self::new)
            }

            fn safe_shr(&self, other: u32) -> safe_arith::Result<Self> {
                self.0.safe_shr(other).map(Self::new)
            }
        }
    };
}

macro_rules! impl_display_and_debug {
    ($type: ident) => {
        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}({})", stringify!($type), self.0)
            }
        }
    };
}

/// SSZ and tree hashing are those of the wrapped `u64`.
macro_rules! impl_ssz {
    ($type: ident) => {
        impl Encode for $type {
            fn is_ssz_fixed_len() -> bool {
                <u64 as Encode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as Encode>::ssz_fixed_len()
            }

            fn ssz_bytes_len(&self) -> usize {
                0_u64.ssz_bytes_len()
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                self.0.ssz_append(buf)
            }
        }

        impl Decode for $type {
            fn is_ssz_fixed_len() -> bool {
                <u64 as Decode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as Decode>::ssz_fixed_len()
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
                Ok($type(u64::from_ssz_bytes(bytes)?))
            }
        }

        impl tree_hash::TreeHash for $type {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                <u64 as tree_hash::TreeHash>::tree_hash_type()
            }

            fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
                <u64 as tree_hash::TreeHash>::tree_hash_packed_encoding(&self.0)
            }

            fn tree_hash_packing_factor() -> usize {
                <u64 as tree_hash::TreeHash>::tree_hash_packing_factor()
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                <u64 as tree_hash::TreeHash>::tree_hash_root(&self.0)
            }
        }
    };
}

macro_rules! impl_common {
    ($type: ident) => {
        impl_from_into_u64!($type);
        impl_from_into_usize!($type);
        impl_math_between!($type, $type);
        impl_math_between!($type, u64);
        impl_display_and_debug!($type);
        impl_ssz!($type);

        impl $type {
            pub fn saturating_sub<T: Into<$type>>(&self, other: T) -> $type {
                $type::new(self.as_u64().saturating_sub(other.into().as_u64()))
            }

            pub fn saturating_add<T: Into<$type>>(&self, other: T) -> $type {
                $type::new(self.as_u64().saturating_add(other.into().as_u64()))
            }
        }

        impl Ord for $type {
            fn cmp(&self, other: &$type) -> Ordering {
                self.0.cmp(&other.0)
            }
        }

        impl Hash for $type {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state)
            }
        }
    };
}
