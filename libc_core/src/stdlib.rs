//! Integer absolute values (`abs`, `labs`, `llabs`, `imaxabs`)
//!
//! The most negative value of each type has no positive counterpart and is
//! returned unchanged, as two's complement negation does.

use core::ffi::{c_int, c_long, c_longlong};

pub fn abs(j: c_int) -> c_int {
    j.wrapping_abs()
}

pub fn labs(j: c_long) -> c_long {
    j.wrapping_abs()
}

pub fn llabs(j: c_longlong) -> c_longlong {
    j.wrapping_abs()
}

/// `intmax_t` flavour
pub fn imaxabs(j: i64) -> i64 {
    j.wrapping_abs()
}
