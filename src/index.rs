// SPDX-License-Identifier: Apache-2.0

/// Signed index type selecting a width profile.
///
/// The parser addresses both input bytes and token slots through one signed
/// integer type. `i16` gives the narrow profile (inputs up to 32 767 bytes,
/// 8-byte tokens); `i32` and wider lift the limits at the cost of token
/// size. The value −1 is the universal "invalid / none" sentinel.
pub trait TokenIndex:
    Copy + Clone + PartialEq + Eq + PartialOrd + Ord + Default + core::fmt::Debug
{
    /// The invalid position / "no index" sentinel (−1).
    const INVALID: Self;

    /// Largest offset or count representable in this width.
    fn max_usize() -> usize;

    /// Converts from a usize known to be in range for this width.
    fn from_usize(v: usize) -> Self;

    /// Converts to usize. Must not be called on negative values.
    fn into_usize(self) -> usize;

    /// Whether this value is the invalid sentinel (or otherwise negative).
    fn is_invalid(self) -> bool;
}

macro_rules! impl_token_index {
    ($($t:ty),*) => {
        $(
            impl TokenIndex for $t {
                const INVALID: Self = -1;

                #[inline]
                fn max_usize() -> usize {
                    <$t>::MAX as usize
                }

                #[inline]
                fn from_usize(v: usize) -> Self {
                    v as $t
                }

                #[inline]
                fn into_usize(self) -> usize {
                    self as usize
                }

                #[inline]
                fn is_invalid(self) -> bool {
                    self < 0
                }
            }
        )*
    };
}

impl_token_index!(i16, i32, i64, isize);
