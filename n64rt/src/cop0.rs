//! # COP0 & Caches
//!
//! The VR4300's system control coprocessor owns the interrupt enable bits, the
//! reduced-power switch and the exception cause. Cache maintenance lives here
//! too since the only consumers (trampoline install, DMA buffer handoff) need
//! both.
//!
//! Everything goes through the [`Cpu`] trait so the drivers can be exercised on
//! a host with a recording fake. [`Vr4300`] is the real thing.

use bit_field::BitField;

/// Data cache line size in bytes.
pub const DCACHE_LINE: u32 = 16;
/// Instruction cache line size in bytes.
pub const ICACHE_LINE: u32 = 32;

bitflags::bitflags! {
    /// COP0 `Status` ($12).
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct CpuStatus: u32 {
        /// Global interrupt enable.
        const IE  = 1 << 0;
        /// Exception level. Set by hardware on exception entry.
        const EXL = 1 << 1;
        /// Error level. Set by hardware on reset/NMI.
        const ERL = 1 << 2;

        // Bits 8-15: interrupt mask, one per Cause.IP bit
        const IM0 = 1 << 8;
        const IM1 = 1 << 9;
        /// RCP interrupt line (everything routed through the MI).
        const IM2 = 1 << 10;
        const IM3 = 1 << 11;
        /// Pre-NMI (reset button).
        const IM4 = 1 << 12;
        const IM5 = 1 << 13;
        const IM6 = 1 << 14;
        /// Count/Compare timer.
        const IM7 = 1 << 15;

        /// 64-bit kernel addressing.
        const KX  = 1 << 7;
        /// Bootstrap exception vectors.
        const BEV = 1 << 22;
        /// Reduced power: run the pipeline at 1/4 clock.
        const RP  = 1 << 27;
        /// 32 FP registers.
        const FR  = 1 << 26;
        const CU0 = 1 << 28;
        const CU1 = 1 << 29;
    }
}

/// COP0 `Cause` ($13).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cause(pub u32);

impl Cause {
    /// `ExcCode` value for an interrupt.
    pub const EXC_INTERRUPT: u32 = 0;

    /// Raw IP0-IP7 pending bits.
    #[inline(always)]
    pub fn pending(&self) -> u8 {
        self.0.get_bits(8..16) as u8
    }

    #[inline(always)]
    pub fn exception_code(&self) -> u32 {
        self.0.get_bits(2..7)
    }

    #[inline(always)]
    pub fn is_interrupt(&self) -> bool {
        self.exception_code() == Self::EXC_INTERRUPT
    }

    /// The RCP line (IP2) is raised; the MI knows which device.
    #[inline(always)]
    pub fn rcp_pending(&self) -> bool {
        self.0.get_bit(10)
    }
}

/// Access to COP0 and the cache instruction.
pub trait Cpu {
    fn status(&self) -> CpuStatus;
    fn set_status(&mut self, status: CpuStatus);
    fn cause(&self) -> Cause;

    /// `Hit_Invalidate_I` on the line holding `vaddr`.
    fn icache_invalidate_line(&mut self, vaddr: u32);
    /// `Hit_Write_Back_D` on the line holding `vaddr`.
    fn dcache_writeback_line(&mut self, vaddr: u32);
    /// `Hit_Invalidate_D` on the line holding `vaddr`. Dirty data is lost.
    fn dcache_invalidate_line(&mut self, vaddr: u32);

    #[inline]
    fn modify_status(&mut self, f: impl FnOnce(&mut CpuStatus)) {
        let mut status = self.status();
        f(&mut status);
        self.set_status(status);
    }

    /// Clear IE, returning whether it was set.
    #[inline]
    fn disable_interrupts(&mut self) -> bool {
        let status = self.status();
        self.set_status(status.difference(CpuStatus::IE));
        status.contains(CpuStatus::IE)
    }

    #[inline]
    fn enable_interrupts(&mut self) {
        self.modify_status(|s| s.insert(CpuStatus::IE));
    }

    fn dcache_writeback_range(&mut self, vaddr: u32, len: u32) {
        for line in lines(vaddr, len, DCACHE_LINE) {
            self.dcache_writeback_line(line);
        }
    }

    fn dcache_invalidate_range(&mut self, vaddr: u32, len: u32) {
        for line in lines(vaddr, len, DCACHE_LINE) {
            self.dcache_invalidate_line(line);
        }
    }

    fn icache_invalidate_range(&mut self, vaddr: u32, len: u32) {
        for line in lines(vaddr, len, ICACHE_LINE) {
            self.icache_invalidate_line(line);
        }
    }
}

/// Start address of every `line`-sized cache line touching `[vaddr, vaddr + len)`.
pub fn lines(vaddr: u32, len: u32, line: u32) -> impl Iterator<Item = u32> {
    let start = vaddr & !(line - 1);
    let end = vaddr.wrapping_add(len);
    (0..)
        .map(move |n: u32| start.wrapping_add(n * line))
        .take_while(move |&addr| len != 0 && addr.wrapping_sub(start) < end.wrapping_sub(start))
}

/// Stop for good. Interrupts are masked first so nothing can resume us.
///
/// Silent, since this is also the exception handler's way out. Callers outside
/// interrupt context log before getting here.
pub fn halt<C: Cpu + ?Sized>(cpu: &mut C) -> ! {
    cpu.disable_interrupts();
    loop {
        core::hint::spin_loop();
    }
}

/// The real VR4300.
#[cfg(target_arch = "mips")]
pub struct Vr4300 {
    _private: (),
}

#[cfg(target_arch = "mips")]
impl Vr4300 {
    /// # Safety
    ///
    /// COP0 is process-global. Callers must not let two handles race a
    /// read-modify-write of `Status`.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(target_arch = "mips")]
impl Cpu for Vr4300 {
    #[inline(always)]
    fn status(&self) -> CpuStatus {
        let value: u32;
        unsafe { core::arch::asm!("mfc0 {0}, $12", out(reg) value, options(nomem, nostack)) };
        CpuStatus::from_bits_retain(value)
    }

    #[inline(always)]
    fn set_status(&mut self, status: CpuStatus) {
        // mtc0 has a two-instruction hazard before the new value is visible
        unsafe {
            core::arch::asm!(
                "mtc0 {0}, $12",
                "nop",
                "nop",
                in(reg) status.bits(),
                options(nostack),
            )
        };
    }

    #[inline(always)]
    fn cause(&self) -> Cause {
        let value: u32;
        unsafe { core::arch::asm!("mfc0 {0}, $13", out(reg) value, options(nomem, nostack)) };
        Cause(value)
    }

    #[inline(always)]
    fn icache_invalidate_line(&mut self, vaddr: u32) {
        unsafe { core::arch::asm!("cache 0x10, 0({0})", in(reg) vaddr, options(nostack)) };
    }

    #[inline(always)]
    fn dcache_writeback_line(&mut self, vaddr: u32) {
        unsafe { core::arch::asm!("cache 0x19, 0({0})", in(reg) vaddr, options(nostack)) };
    }

    #[inline(always)]
    fn dcache_invalidate_line(&mut self, vaddr: u32) {
        unsafe { core::arch::asm!("cache 0x11, 0({0})", in(reg) vaddr, options(nostack)) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CpuEvent, FakeCpu};

    #[test]
    fn cause_decodes_rcp_interrupt() {
        let cause = Cause(0x0000_0400);
        assert!(cause.rcp_pending());
        assert!(cause.is_interrupt());
        assert_eq!(cause.pending(), 0b0000_0100);

        // timer interrupt only
        let cause = Cause(0x0000_8000);
        assert!(!cause.rcp_pending());
        assert_eq!(cause.pending(), 0b1000_0000);

        // address error on load
        assert!(!Cause(4 << 2).is_interrupt());
    }

    #[test]
    fn disable_interrupts_reports_previous_state() {
        let mut cpu = FakeCpu::new();
        cpu.status = CpuStatus::IE | CpuStatus::IM2;

        assert!(cpu.disable_interrupts());
        assert_eq!(cpu.status, CpuStatus::IM2);
        assert!(!cpu.disable_interrupts());

        cpu.enable_interrupts();
        assert_eq!(cpu.status, CpuStatus::IE | CpuStatus::IM2);
    }

    #[test]
    fn range_ops_cover_partial_lines() {
        let mut cpu = FakeCpu::new();
        cpu.dcache_writeback_range(0x8000_1008, 0x10);
        assert_eq!(
            cpu.events,
            vec![
                CpuEvent::DCacheWriteback(0x8000_1000),
                CpuEvent::DCacheWriteback(0x8000_1010)
            ]
        );

        cpu.events.clear();
        cpu.icache_invalidate_range(0x8000_0180, 8);
        assert_eq!(cpu.events, vec![CpuEvent::ICacheInvalidate(0x8000_0180)]);
    }

    #[test]
    fn empty_range_touches_nothing() {
        assert_eq!(lines(0x8000_0000, 0, DCACHE_LINE).count(), 0);
    }

    #[test]
    fn line_count_matches_length() {
        assert_eq!(lines(0x8010_0000, 320 * 240 * 2, DCACHE_LINE).count(), 9600);
    }
}
