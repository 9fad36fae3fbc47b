//! Fatal trap for broken internal invariants
//!
//! Ordinary input errors never come here; they are reported through errno.

use core::sync::atomic::{AtomicBool, Ordering};

static ASSERTED: AtomicBool = AtomicBool::new(false);

/// Logs the first failed assertion of the task, then traps
///
/// A second failure (for example from the logger itself) traps without
/// logging again.
#[cold]
#[track_caller]
pub fn fatal(condition: &str) -> ! {
    if ASSERTED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        let location = core::panic::Location::caller();
        log::error!(
            "assert {} failed {}:{}",
            condition,
            location.file(),
            location.line()
        );
    }
    panic!("fatal trap: {}", condition);
}

/// Traps through [`fatal`] when the condition does not hold
#[macro_export]
macro_rules! libc_assert {
    ($cond:expr) => {
        if !$cond {
            $crate::assert::fatal(stringify!($cond));
        }
    };
}
