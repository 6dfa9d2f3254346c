//! # Exception Vector Trampoline
//!
//! The VR4300 jumps to a fixed address on every exception. That address only
//! has room for a couple of instructions, so we patch in a direct jump to the
//! real entry point at boot:
//!
//! ```text
//!            63          58 57                    32 31                 0
//!           ┌──────────────┬────────────────────────┬───────────────────┐
//!  0x180:   │ 000010 (J)   │ (target >> 2) & 26 bits│ 0 (nop, delay)    │
//!           └──────────────┴────────────────────────┴───────────────────┘
//! ```
//!
//! `J` keeps the top 4 bits of the PC, so the target has to live in the same
//! 256MB region as the vector. Everything in KSEG0 does.
//!
//! The write goes through KSEG1 so it lands in RDRAM directly, then the icache
//! line at the KSEG0 alias is dropped so the next fetch sees it. [`install`]
//! does both; there is no way to get one without the other.
//!
//! [`install`]: Trampoline::install

use crate::{
    cop0::Cpu,
    mmio::PhysAddr,
};

/// Primary opcode of `J`, already in position.
pub const J_OPCODE: u32 = 0x0800_0000;
const J_TARGET_MASK: u32 = 0x03FF_FFFF;

/// Physical address of the general exception vector (interrupts included).
pub const GENERAL_EXCEPTION_VECTOR: u32 = 0x180;

/// A `J target; nop` pair, ready to be written as one doubleword.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Trampoline {
    word: u64,
}

impl Trampoline {
    pub const fn to_address(target: u32) -> Self {
        let jump = J_OPCODE | ((target >> 2) & J_TARGET_MASK);
        Self {
            word: (jump as u64) << 32,
        }
    }

    /// Jump to `entry`.
    pub fn to(entry: unsafe extern "C" fn()) -> Self {
        Self::to_address(entry as usize as u32)
    }

    #[inline(always)]
    pub const fn word(&self) -> u64 {
        self.word
    }

    #[inline(always)]
    pub const fn jump_instruction(&self) -> u32 {
        (self.word >> 32) as u32
    }

    /// Patch `slot`, then drop the stale icache line.
    ///
    /// Interrupts must be masked by the caller; a half-written vector is not
    /// something the CPU should ever see.
    pub fn install<C: Cpu>(self, cpu: &mut C, slot: &mut VectorSlot) {
        unsafe { slot.uncached.write_volatile(self.word.to_be()) };
        cpu.icache_invalidate_line(slot.cached);
        log::debug!("exception vector -> {:#010x}", self.jump_target());
    }

    /// Low 28 bits of the jump target. The top nibble comes from the PC.
    pub const fn jump_target(&self) -> u32 {
        (self.jump_instruction() & J_TARGET_MASK) << 2
    }
}

/// Where a [`Trampoline`] goes: the write alias and the fetch alias of the
/// same doubleword.
pub struct VectorSlot {
    uncached: *mut u64,
    cached: u32,
}

impl VectorSlot {
    /// # Safety
    ///
    /// Only one slot for the vector may exist. Target hardware only.
    pub unsafe fn general_exception() -> Self {
        let phys = PhysAddr::new(GENERAL_EXCEPTION_VECTOR);
        Self {
            uncached: phys.uncached() as usize as *mut u64,
            cached: phys.cached(),
        }
    }

    /// A slot written through `uncached`, with `cached` invalidated afterwards.
    ///
    /// # Safety
    ///
    /// `uncached` must be valid for an aligned 8-byte write for as long as the
    /// slot lives.
    pub unsafe fn from_raw(uncached: *mut u64, cached: u32) -> Self {
        Self { uncached, cached }
    }

    #[inline(always)]
    pub fn cached(&self) -> u32 {
        self.cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cop0::{Cause, CpuStatus},
        testing::{CpuEvent, FakeCpu},
    };

    #[test]
    fn jump_encoding_example() {
        let t = Trampoline::to_address(0x8000_0400);
        assert_eq!(t.jump_instruction(), 0x0800_0100);
        assert_eq!(t.word(), 0x0800_0100_0000_0000);
        assert_eq!(t.jump_target(), 0x400);
    }

    #[test]
    fn jump_encoding_drops_low_and_high_bits() {
        for target in [0x8000_0000u32, 0x8000_0403, 0x8FFF_FFFC, 0xA012_3458, 0x0000_0004] {
            let t = Trampoline::to_address(target);
            assert_eq!(t.word() >> 32, u64::from(0x0800_0000 | ((target >> 2) & 0x03FF_FFFF)));
            assert_eq!(t.word() as u32, 0);
            assert_eq!(t.jump_target(), target & 0x0FFF_FFFC);
        }
    }

    #[test]
    fn entry_point_address() {
        unsafe extern "C" fn entry() {}
        let t = Trampoline::to(entry);
        assert_eq!(t.jump_target(), (entry as usize as u32) & 0x0FFF_FFFC);
    }

    #[test]
    fn install_writes_big_endian_doubleword() {
        let mut cell = 0u64;
        let mut slot = unsafe { VectorSlot::from_raw(&mut cell, 0x8000_0180) };
        let mut cpu = FakeCpu::new();

        Trampoline::to_address(0x8000_0400).install(&mut cpu, &mut slot);

        assert_eq!(cell.to_ne_bytes(), [0x08, 0x00, 0x01, 0x00, 0, 0, 0, 0]);
        assert_eq!(cpu.events, vec![CpuEvent::ICacheInvalidate(0x8000_0180)]);
    }

    /// Checks the slot already holds the jump when the icache is touched.
    struct Probe {
        slot: *const u64,
        seen: Option<u64>,
    }

    impl Cpu for Probe {
        fn status(&self) -> CpuStatus {
            CpuStatus::empty()
        }
        fn set_status(&mut self, _: CpuStatus) {}
        fn cause(&self) -> Cause {
            Cause(0)
        }
        fn icache_invalidate_line(&mut self, _: u32) {
            self.seen = Some(unsafe { self.slot.read_volatile() });
        }
        fn dcache_writeback_line(&mut self, _: u32) {}
        fn dcache_invalidate_line(&mut self, _: u32) {}
    }

    #[test]
    fn write_happens_before_invalidate() {
        let mut cell = 0u64;
        let ptr: *mut u64 = &mut cell;
        let mut slot = unsafe { VectorSlot::from_raw(ptr, 0x8000_0180) };
        let mut cpu = Probe { slot: ptr, seen: None };

        let t = Trampoline::to_address(0x8000_1000);
        t.install(&mut cpu, &mut slot);
        assert_eq!(cpu.seen, Some(t.word().to_be()));
    }
}
