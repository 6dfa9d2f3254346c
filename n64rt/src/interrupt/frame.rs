//! # Exception Frame
//!
//! What the low-level exception entry pushes before calling [`super::handle`].
//!
//! The VR4300 GPRs and HI/LO are 64 bits wide even under o32, and compiled code
//! keeps live values in the upper halves (`daddu`, `dmult`, `ld`/`sd`). Every
//! slot is a doubleword, stored with `sd` and reloaded with `ld`.
//!
//! ```text
//!  $sp + 0x00  ┌──────────────────────────┐
//!              │ o32 argument home (16B)  │
//!  $sp + 0x10  ├──────────────────────────┤
//!              │ $at $v0-$v1 $a0-$a3      │
//!              │ $t0-$t9 $ra  (18 × 8B)   │
//!  $sp + 0xA0  ├──────────────────────────┤
//!              │ HI, LO       (2 × 8B)    │
//!  $sp + 0xB0  └──────────────────────────┘
//! ```
//!
//! Only the caller-saved registers are here. `handle` is an ordinary
//! `extern "C"` call and preserves `$s0`-`$s7`, `$gp`, `$fp`.

use core::mem::{offset_of, size_of};

/// `$at`, `$v0`-`$v1`, `$a0`-`$a3`, `$t0`-`$t9`, `$ra`.
pub const SAVED_GPRS: usize = 18;
/// Bytes per saved register.
pub const SLOT: usize = 8;

#[repr(C)]
pub struct ExceptionFrame {
    /// Home space the callee may spill its argument registers into.
    pub args: [u32; 4],
    /// In the order listed on [`SAVED_GPRS`].
    pub gpr: [u64; SAVED_GPRS],
    pub hi: u64,
    pub lo: u64,
}

pub const FRAME_SIZE: usize = size_of::<ExceptionFrame>();
pub const GPR_OFFSET: usize = offset_of!(ExceptionFrame, gpr);
pub const HI_OFFSET: usize = offset_of!(ExceptionFrame, hi);
pub const LO_OFFSET: usize = offset_of!(ExceptionFrame, lo);

static_assertions::const_assert_eq!(FRAME_SIZE, 16 + (SAVED_GPRS + 2) * SLOT);
static_assertions::const_assert_eq!(FRAME_SIZE % 8, 0);

/// Offset of saved GPR `index` from the adjusted `$sp`.
pub const fn gpr_slot(index: usize) -> usize {
    GPR_OFFSET + index * SLOT
}
