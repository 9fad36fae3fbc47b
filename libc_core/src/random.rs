//! Pseudo-random numbers and the entropy-backed `getrandom`

use crate::config::GETRANDOM_MAX;
use crate::errno::Errno;
use kernel_api::Kernel;

/// Largest value returned by [`Lcg::rand`]
pub const RAND_MAX: i32 = 0x7fff_ffff;

const LCG_MULTIPLIER: u32 = 1_103_515_245;
const LCG_INCREMENT: u32 = 12_345;

fn step(seed: &mut u32) -> i32 {
    *seed = seed.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
    ((*seed / 65_536) % (RAND_MAX as u32 + 1)) as i32
}

/// Linear congruential generator behind `rand`/`srand`
///
/// Not suitable for anything security related; use [`getrandom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lcg {
    seed: u32,
}

impl Lcg {
    /// Generator in the state `rand` starts from without `srand`
    pub const fn new() -> Self {
        Self { seed: 1 }
    }

    pub const fn with_seed(seed: u32) -> Self {
        Self { seed }
    }

    pub fn srand(&mut self, seed: u32) {
        self.seed = seed;
    }

    pub fn rand(&mut self) -> i32 {
        step(&mut self.seed)
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new()
    }
}

/// Reentrant variant keeping its state in `seed`
pub fn rand_r(seed: &mut u32) -> i32 {
    step(seed)
}

fn entropy_word<K: Kernel>(kernel: &mut K, fallback: &mut Lcg) -> u32 {
    if kernel.get_random().is_ok() {
        if let Ok(word) = kernel.exchange().read_u32() {
            return word;
        }
    }
    fallback.rand() as u32
}

/// Fills `buf` from the kernel entropy source
///
/// When the task lacks the entropy capability the words come from
/// `fallback` instead, so the call never fails for that reason.
///
/// # Errors
///
/// `Inval` if `buf` is longer than 65535 bytes.
pub fn getrandom<K: Kernel>(
    kernel: &mut K,
    fallback: &mut Lcg,
    buf: &mut [u8],
) -> Result<usize, Errno> {
    if buf.len() > GETRANDOM_MAX {
        return Err(Errno::Inval);
    }
    for chunk in buf.chunks_mut(4) {
        let word = entropy_word(kernel, fallback).to_le_bytes();
        chunk.copy_from_slice(&word[..chunk.len()]);
    }
    Ok(buf.len())
}
