//! # MIPS Interface
//!
//! Funnels the six RCP interrupt lines into the CPU's single IP2 input.
//!
//! | Offset | Name    | Description                                      |
//! |--------|---------|--------------------------------------------------|
//! | `0x00` | MODE    | Init mode, ebus test, RDRAM reg mode             |
//! | `0x04` | VERSION | RSP/RDP/RAC/IO revision bytes                    |
//! | `0x08` | INTR    | Pending lines (read only)                        |
//! | `0x0C` | MASK    | Enabled lines. Written as clear/set bit pairs    |
//!
//! `MASK` is never written with the mask itself: each line has a "clear" bit
//! at `2k` and a "set" bit at `2k + 1`, so individual lines can be toggled
//! without a read-modify-write.

use bit_field::BitField;
use volatile_register::{RO, RW};

use crate::mmio;

pub const MI_BASE: u32 = 0x0430_0000;

#[repr(C)]
pub struct MiRegisters {
    pub mode: RW<u32>,
    pub version: RO<u32>,
    pub intr: RO<u32>,
    pub mask: RW<u32>,
}

impl MiRegisters {
    /// # Safety
    ///
    /// Only meaningful on the console; see [`mmio::register_block`].
    #[inline(always)]
    pub unsafe fn new() -> &'static MiRegisters {
        unsafe { mmio::register_block(MI_BASE) }
    }

    #[inline(always)]
    pub fn pending(&self) -> MiInterrupts {
        MiInterrupts::from_bits_truncate(self.intr.read())
    }

    /// Lines currently let through to the CPU. Reads back as a plain mask.
    #[inline(always)]
    pub fn enabled(&self) -> MiInterrupts {
        MiInterrupts::from_bits_truncate(self.mask.read())
    }

    /// Enable exactly `lines`, leaving the others as they are.
    #[inline]
    pub fn enable(&self, lines: MiInterrupts) {
        unsafe { self.mask.write(MiMask::set_lines(lines).bits()) };
    }

    #[inline]
    pub fn disable(&self, lines: MiInterrupts) {
        unsafe { self.mask.write(MiMask::clear_lines(lines).bits()) };
    }

    /// Silicon revision bytes: RSP, RDP, RAC, IO from high to low.
    pub fn revision(&self) -> [u8; 4] {
        self.version.read().to_be_bytes()
    }
}

bitflags::bitflags! {
    /// `MI_INTR` / `MI_MASK` read layout.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct MiInterrupts: u32 {
        const SP = 1 << 0;
        const SI = 1 << 1;
        const AI = 1 << 2;
        const VI = 1 << 3;
        const PI = 1 << 4;
        const DP = 1 << 5;
    }
}

bitflags::bitflags! {
    /// `MI_MASK` write layout.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct MiMask: u32 {
        const CLEAR_SP = 1 << 0;
        const SET_SP   = 1 << 1;
        const CLEAR_SI = 1 << 2;
        const SET_SI   = 1 << 3;
        const CLEAR_AI = 1 << 4;
        const SET_AI   = 1 << 5;
        const CLEAR_VI = 1 << 6;
        const SET_VI   = 1 << 7;
        const CLEAR_PI = 1 << 8;
        const SET_PI   = 1 << 9;
        const CLEAR_DP = 1 << 10;
        const SET_DP   = 1 << 11;
    }
}

impl MiMask {
    /// Set bits for every line in `lines`.
    pub fn set_lines(lines: MiInterrupts) -> Self {
        Self::pairs(lines, 1)
    }

    /// Clear bits for every line in `lines`.
    pub fn clear_lines(lines: MiInterrupts) -> Self {
        Self::pairs(lines, 0)
    }

    fn pairs(lines: MiInterrupts, which: usize) -> Self {
        let mut value = 0u32;
        for line in 0..6 {
            if lines.bits().get_bit(line) {
                value.set_bit(line * 2 + which, true);
            }
        }
        Self::from_bits_retain(value)
    }
}
