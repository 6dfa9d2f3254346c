//! # Boot Beacon
//!
//! Two words in low RDRAM that a debugger or flash cart can read back after a
//! hang to see how far boot got:
//!
//! ```text
//! 0x3F8: "N64B"          magic
//! 0x3FC: 'S','T','x','x' stage code
//! ```
//!
//! Only written with the `boot-beacon` feature. Without it every mark is a
//! no-op and the slot is never touched.

use volatile_register::RW;

use crate::mmio;

pub const BEACON: u32 = 0x3F8;
pub const MAGIC: u32 = u32::from_be_bytes(*b"N64B");

#[repr(C)]
pub struct BeaconSlot {
    pub magic: RW<u32>,
    pub stage: RW<u32>,
}

impl BeaconSlot {
    /// # Safety
    ///
    /// Target hardware only.
    #[inline(always)]
    pub unsafe fn new() -> &'static BeaconSlot {
        unsafe { mmio::register_block(BEACON) }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Entry,
    Trampoline,
    Video,
    Armed,
    Loop,
    Halt,
}

impl Stage {
    pub const fn code(self) -> u32 {
        u32::from_be_bytes(match self {
            Self::Entry => *b"STEN",
            Self::Trampoline => *b"STTR",
            Self::Video => *b"STVI",
            Self::Armed => *b"STAR",
            Self::Loop => *b"STLP",
            Self::Halt => *b"STHL",
        })
    }
}

pub struct Beacon<'a> {
    slot: &'a BeaconSlot,
}

impl<'a> Beacon<'a> {
    pub fn new(slot: &'a BeaconSlot) -> Self {
        Self { slot }
    }

    #[inline(always)]
    pub fn mark(&self, stage: Stage) {
        if cfg!(feature = "boot-beacon") {
            unsafe {
                self.slot.magic.write(MAGIC);
                self.slot.stage.write(stage.code());
            }
        }
    }
}
