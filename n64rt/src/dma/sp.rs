//! # RSP DMA
//!
//! Moves data between RDRAM and the RSP's 4KB DMEM / 4KB IMEM. We don't run
//! any microcode; DMEM is used as a fast fill source for clearing framebuffers.
//!
//! The engine holds one active transfer and one queued behind it, so a second
//! transfer can be started as soon as the first one has begun.
//!
//! ## Register Layout (`0x0404_0000`)
//!
//! | Offset | Name       | Description                                   |
//! |--------|------------|-----------------------------------------------|
//! | `0x00` | MEM_ADDR   | DMEM/IMEM offset, bit 12 selects IMEM         |
//! | `0x04` | DRAM_ADDR  | RDRAM address, 8-byte aligned                 |
//! | `0x08` | RD_LEN     | Row encoding, RDRAM to DMEM. Starts the DMA   |
//! | `0x0C` | WR_LEN     | Row encoding, DMEM to RDRAM. Starts the DMA   |
//! | `0x10` | STATUS     | Halt, broke, DMA busy/full, signals           |
//! | `0x14` | DMA_FULL   | Bit 0: queue slot occupied                    |
//! | `0x18` | DMA_BUSY   | Bit 0: transfer active                        |
//! | `0x1C` | SEMAPHORE  |                                               |
//!
//! ## Row Encoding
//!
//! ```text
//!  31        20 19     12 11         0
//! ┌────────────┬─────────┬────────────┐
//! │    skip    │ count-1 │  length-1  │
//! └────────────┴─────────┴────────────┘
//! ```

use bit_field::BitField;
use volatile_register::RW;

use crate::{
    dma::{DmaEngine, DmaStatus, Direction, EngineCaps},
    mmio::{self, PhysAddr},
};

pub const SP_BASE: u32 = 0x0404_0000;
pub const DMEM: u32 = 0x0400_0000;
pub const DMEM_SIZE: usize = 0x1000;
/// `MEM_ADDR` bit selecting IMEM instead of DMEM.
pub const IMEM_SELECT: u32 = 0x1000;

#[repr(C)]
pub struct SpRegisters {
    pub mem_addr: RW<u32>,
    pub dram_addr: RW<u32>,
    pub rd_len: RW<u32>,
    pub wr_len: RW<u32>,
    pub status: RW<u32>,
    pub dma_full: RW<u32>,
    pub dma_busy: RW<u32>,
    pub semaphore: RW<u32>,
}

impl SpRegisters {
    /// # Safety
    ///
    /// Only meaningful on the console; see [`mmio::register_block`].
    #[inline(always)]
    pub unsafe fn new() -> &'static SpRegisters {
        unsafe { mmio::register_block(SP_BASE) }
    }
}

/// The packed `RD_LEN`/`WR_LEN` value.
///
/// Fields are stored exactly as the hardware wants them: `copy` is bytes per
/// row minus one, `count` is rows minus one, `skip` is the RDRAM stride gap.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RowLength {
    pub copy: u16,
    pub count: u8,
    pub skip: u16,
}

impl RowLength {
    /// A single contiguous run of `bytes` (1..=4096).
    #[inline(always)]
    pub const fn linear(bytes: usize) -> Self {
        Self {
            copy: (bytes - 1) as u16,
            count: 0,
            skip: 0,
        }
    }

    /// `rows` rows of `row_bytes`, skipping `skip` bytes of RDRAM after each.
    #[inline(always)]
    pub const fn rows(row_bytes: usize, rows: usize, skip: usize) -> Self {
        Self {
            copy: (row_bytes - 1) as u16,
            count: (rows - 1) as u8,
            skip: skip as u16,
        }
    }

    pub fn bits(&self) -> u32 {
        let mut value = 0u32;
        value.set_bits(0..12, u32::from(self.copy));
        value.set_bits(12..20, u32::from(self.count));
        value.set_bits(20..32, u32::from(self.skip));
        value
    }

    pub fn from_bits(value: u32) -> Self {
        Self {
            copy: value.get_bits(0..12) as u16,
            count: value.get_bits(12..20) as u8,
            skip: value.get_bits(20..32) as u16,
        }
    }

    /// Total bytes moved on the RSP side.
    pub const fn total_bytes(&self) -> usize {
        (self.copy as usize + 1) * (self.count as usize + 1)
    }
}

/// One RSP transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SpDescriptor {
    /// Offset into SP memory, 8-byte aligned. Add [`IMEM_SELECT`] for IMEM.
    pub mem: u32,
    /// RDRAM side, 8-byte aligned.
    pub dram: PhysAddr,
    pub row: RowLength,
}

impl SpDescriptor {
    pub const fn linear(mem: u32, dram: PhysAddr, bytes: usize) -> Self {
        Self {
            mem,
            dram,
            row: RowLength::linear(bytes),
        }
    }
}

pub struct SpDma<'a> {
    regs: &'a SpRegisters,
}

impl<'a> SpDma<'a> {
    pub const CAPS: EngineCaps = EngineCaps {
        queued: true,
        reports_errors: false,
    };

    pub fn new(regs: &'a SpRegisters) -> Self {
        Self { regs }
    }
}

impl DmaEngine for SpDma<'_> {
    type Descriptor = SpDescriptor;
    const CAPS: EngineCaps = SpDma::CAPS;

    #[inline]
    fn start(&mut self, descriptor: &SpDescriptor, direction: Direction) {
        debug_assert!(descriptor.mem % 8 == 0);
        debug_assert!(descriptor.dram.is_aligned(8));

        unsafe {
            self.regs.mem_addr.write(descriptor.mem);
            self.regs.dram_addr.write(descriptor.dram.as_u32());
            match direction {
                Direction::FromRdram => self.regs.rd_len.write(descriptor.row.bits()),
                Direction::ToRdram => self.regs.wr_len.write(descriptor.row.bits()),
            }
        }
    }

    #[inline(always)]
    fn status(&self) -> DmaStatus {
        if self.regs.dma_busy.read().get_bit(0) {
            DmaStatus::InProgress
        } else {
            DmaStatus::Completed
        }
    }

    #[inline(always)]
    fn queue_full(&self) -> bool {
        self.regs.dma_full.read().get_bit(0)
    }
}
