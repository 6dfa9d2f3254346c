//! # Address Space
//!
//! The VR4300 sees physical memory through two fixed windows:
//!
//! | Segment | Virtual                     | Cached | Used for                      |
//! |---------|-----------------------------|--------|-------------------------------|
//! | KSEG0   | `0x8000_0000-0x9FFF_FFFF`   | yes    | code, data, instruction fetch |
//! | KSEG1   | `0xA000_0000-0xBFFF_FFFF`   | no     | registers, DMA-visible writes |
//!
//! Both windows map the same 512MB of physical space. Registers must always be
//! touched through KSEG1; the DMA engines and the VI only ever take physical
//! addresses.

use core::fmt;

/// Base of the cached window.
pub const KSEG0: u32 = 0x8000_0000;
/// Base of the uncached window.
pub const KSEG1: u32 = 0xA000_0000;

const PHYS_MASK: u32 = 0x1FFF_FFFF;

/// A physical address, as understood by the RCP.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(u32);

impl PhysAddr {
    /// Strip the segment bits from `addr`.
    #[inline(always)]
    pub const fn new(addr: u32) -> Self {
        Self(addr & PHYS_MASK)
    }

    /// Physical address backing a pointer in KSEG0 or KSEG1.
    #[inline(always)]
    pub fn of<T: ?Sized>(ptr: *const T) -> Self {
        Self::new(ptr as *const u8 as usize as u32)
    }

    #[inline(always)]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// The KSEG0 (cached) alias.
    #[inline(always)]
    pub const fn cached(self) -> u32 {
        KSEG0 | self.0
    }

    /// The KSEG1 (uncached) alias.
    #[inline(always)]
    pub const fn uncached(self) -> u32 {
        KSEG1 | self.0
    }

    #[inline(always)]
    pub const fn offset(self, bytes: u32) -> Self {
        Self::new(self.0.wrapping_add(bytes))
    }

    #[inline(always)]
    pub const fn is_aligned(self, align: u32) -> bool {
        self.0 % align == 0
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#010x})", self.0)
    }
}

/// Reinterpret the register block at `phys` through its uncached alias.
///
/// # Safety
///
/// `phys` must be the base of a register block laid out exactly like `T`,
/// and the caller must only run on hardware where that block exists.
#[inline(always)]
pub unsafe fn register_block<T>(phys: u32) -> &'static T {
    unsafe { &*(PhysAddr::new(phys).uncached() as usize as *const T) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_share_physical_address() {
        let p = PhysAddr::new(0xA440_0010);
        assert_eq!(p.as_u32(), 0x0440_0010);
        assert_eq!(p.cached(), 0x8440_0010);
        assert_eq!(p.uncached(), 0xA440_0010);
        assert_eq!(PhysAddr::new(p.cached()), PhysAddr::new(p.uncached()));
    }

    #[test]
    fn offset_stays_in_physical_space() {
        assert_eq!(PhysAddr::new(0x1FFF_FFF0).offset(0x20).as_u32(), 0x10);
        assert_eq!(PhysAddr::new(0x180).offset(8).as_u32(), 0x188);
    }

    #[test]
    fn alignment() {
        assert!(PhysAddr::new(0x8000_0400).is_aligned(8));
        assert!(!PhysAddr::new(0x8000_0402).is_aligned(8));
        assert!(PhysAddr::new(0x8000_0402).is_aligned(2));
    }
}
