//! Scalar value validation
//!
//! Every decoder and encoder funnels candidate values through [`sanitize`],
//! so nothing outside the Unicode scalar range ever reaches an output buffer.

use crate::Family;

/// U+FFFD, substituted for any value that cannot be represented
pub const REPLACEMENT_CHARACTER: u32 = 0xFFFD;

/// Highest assignable code point
pub const MAX_SCALAR: u32 = 0x10FFFF;

const SURROGATE_START: u32 = 0xD800;
const SURROGATE_END: u32 = 0xDFFF;

/// Check whether `value` is a Unicode scalar value
///
/// True for `0..=0x10FFFF` minus the surrogate block `0xD800..=0xDFFF`.
#[inline]
pub const fn is_valid_scalar(value: u32) -> bool {
    value <= MAX_SCALAR && !(value >= SURROGATE_START && value <= SURROGATE_END)
}

/// Replacement scalar used when writing `family`
///
/// The same code point for every family; each encoder renders it in its own
/// layout (`EF BF BD` for UTF-8).
#[inline]
pub const fn replacement_scalar_for(_family: Family) -> u32 {
    REPLACEMENT_CHARACTER
}

/// Pass valid scalars through, replace everything else with the
/// replacement for `family`
#[inline]
pub const fn sanitize(value: u32, family: Family) -> u32 {
    if is_valid_scalar(value) {
        value
    } else {
        replacement_scalar_for(family)
    }
}
