//! errno contract tests
//!
//! The hardened errno values are shared with C code and must never change.

use libc_core::Errno;

// ===== Canonical Values =====
const GOLDEN_ERRNO: [(Errno, u32); 16] = [
    (Errno::Perm, 0x2af5_e248),
    (Errno::NoEnt, 0x3999_3cc3),
    (Errno::Srch, 0x3f34_f248),
    (Errno::Intr, 0x41de_4352),
    (Errno::Io, 0x455a_5555),
    (Errno::TooBig, 0x6a55_5a5a),
    (Errno::BadF, 0x753c_95a5),
    (Errno::Again, 0x7aaa_5aa5),
    (Errno::NoMem, 0x7f38_a4df),
    (Errno::Acces, 0xc9a9_de4d),
    (Errno::Fault, 0xc9b3_682b),
    (Errno::Busy, 0xcb0b_87b8),
    (Errno::Exist, 0xcc1a_0dcf),
    (Errno::Inval, 0xcfdc_42ff),
    (Errno::Range, 0xf811_0a2d),
    (Errno::NotSup, 0xfbac_fec0),
];

// ===== Contract Tests =====
