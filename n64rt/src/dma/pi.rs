//! # PI DMA
//!
//! The Peripheral Interface moves data between RDRAM and the cartridge bus.
//! One transfer at a time, no queue; the status word carries an error bit.
//!
//! ## Register Layout (`0x0460_0000`)
//!
//! | Offset | Name        | Description                                  |
//! |--------|-------------|----------------------------------------------|
//! | `0x00` | DRAM_ADDR   | RDRAM address, 8-byte aligned                |
//! | `0x04` | CART_ADDR   | Bus address, 2-byte aligned                  |
//! | `0x08` | RD_LEN      | Length - 1, RDRAM to bus. Starts the DMA     |
//! | `0x0C` | WR_LEN      | Length - 1, bus to RDRAM. Starts the DMA     |
//! | `0x10` | STATUS      | R: busy/io busy/error. W: reset, clear intr  |

use volatile_register::RW;

use crate::{
    cop0::Cpu,
    dma::{DmaEngine, DmaStatus, Direction, EngineCaps},
    mmio::{self, PhysAddr},
    Error,
};

pub const PI_BASE: u32 = 0x0460_0000;

/// Start of the cartridge ROM in PI space.
pub const CART_ROM: u32 = 0x1000_0000;

const STATUS_RESET: u32 = 1 << 0;
const STATUS_CLEAR_INTERRUPT: u32 = 1 << 1;

#[repr(C)]
pub struct PiRegisters {
    pub dram_addr: RW<u32>,
    pub cart_addr: RW<u32>,
    pub rd_len: RW<u32>,
    pub wr_len: RW<u32>,
    pub status: RW<u32>,
}

impl PiRegisters {
    /// # Safety
    ///
    /// Only meaningful on the console; see [`mmio::register_block`].
    #[inline(always)]
    pub unsafe fn new() -> &'static PiRegisters {
        unsafe { mmio::register_block(PI_BASE) }
    }
}

/// One PI transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PiDescriptor {
    /// RDRAM side, 8-byte aligned.
    pub dram: PhysAddr,
    /// Bus side, 2-byte aligned.
    pub cart: PhysAddr,
    /// Bytes to move, even and non-zero.
    pub len: u32,
}

impl PiDescriptor {
    /// Length register encoding.
    #[inline(always)]
    pub const fn len_field(&self) -> u32 {
        self.len - 1
    }
}

pub struct PiDma<'a> {
    regs: &'a PiRegisters,
}

impl<'a> PiDma<'a> {
    pub const CAPS: EngineCaps = EngineCaps {
        queued: false,
        reports_errors: true,
    };

    pub fn new(regs: &'a PiRegisters) -> Self {
        Self { regs }
    }

    /// Acknowledge the PI interrupt in the MI.
    #[inline(always)]
    pub fn clear_interrupt(&mut self) {
        unsafe { self.regs.status.write(STATUS_CLEAR_INTERRUPT) };
    }

    /// Abort whatever the controller is doing.
    #[inline(always)]
    pub fn reset(&mut self) {
        unsafe { self.regs.status.write(STATUS_RESET) };
    }

    /// Start a transfer and idle until it's done.
    pub fn transfer<C: Cpu>(
        &mut self,
        cpu: &mut C,
        descriptor: &PiDescriptor,
        direction: Direction,
    ) -> Result<(), Error> {
        self.start(descriptor, direction);
        self.wait_idle(cpu).into_result()
    }
}

impl DmaEngine for PiDma<'_> {
    type Descriptor = PiDescriptor;
    const CAPS: EngineCaps = PiDma::CAPS;

    #[inline]
    fn start(&mut self, descriptor: &PiDescriptor, direction: Direction) {
        debug_assert!(descriptor.dram.is_aligned(8));
        debug_assert!(descriptor.cart.is_aligned(2));
        debug_assert!(descriptor.len != 0 && descriptor.len % 2 == 0);

        unsafe {
            self.regs.dram_addr.write(descriptor.dram.as_u32());
            self.regs.cart_addr.write(descriptor.cart.as_u32());
            match direction {
                Direction::ToRdram => self.regs.wr_len.write(descriptor.len_field()),
                Direction::FromRdram => self.regs.rd_len.write(descriptor.len_field()),
            }
        }
    }

    #[inline(always)]
    fn status(&self) -> DmaStatus {
        DmaStatus::from_pi_status(self.regs.status.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{zeroed, FakeCpu};

    fn descriptor() -> PiDescriptor {
        PiDescriptor {
            dram: PhysAddr::new(0x8010_0000),
            cart: PhysAddr::new(CART_ROM + 0x1000),
            len: 0x2000,
        }
    }

    #[test]
    fn start_from_cart_writes_wr_len() {
        let regs = zeroed::<PiRegisters>();
        let mut pi = PiDma::new(&regs);
        pi.start(&descriptor(), Direction::ToRdram);

        assert_eq!(regs.dram_addr.read(), 0x0010_0000);
        assert_eq!(regs.cart_addr.read(), 0x1000_1000);
        assert_eq!(regs.wr_len.read(), 0x1FFF);
        assert_eq!(regs.rd_len.read(), 0);
    }

    #[test]
    fn start_to_cart_writes_rd_len() {
        let regs = zeroed::<PiRegisters>();
        let mut pi = PiDma::new(&regs);
        pi.start(&descriptor(), Direction::FromRdram);

        assert_eq!(regs.rd_len.read(), 0x1FFF);
        assert_eq!(regs.wr_len.read(), 0);
    }

    #[test]
    fn status_reads_register_once() {
        let regs = zeroed::<PiRegisters>();
        let pi = PiDma::new(&regs);

        assert_eq!(pi.status(), DmaStatus::Completed);
        unsafe { regs.status.write(0b100) };
        assert_eq!(pi.status(), DmaStatus::IoError);
        unsafe { regs.status.write(0b001) };
        assert_eq!(pi.status(), DmaStatus::InProgress);
    }

    #[test]
    fn transfer_surfaces_io_error() {
        let regs = zeroed::<PiRegisters>();
        let mut cpu = FakeCpu::new();
        let mut pi = PiDma::new(&regs);

        unsafe { regs.status.write(0b100) };
        assert_eq!(
            pi.transfer(&mut cpu, &descriptor(), Direction::ToRdram),
            Err(Error::PiIo)
        );

        unsafe { regs.status.write(0) };
        assert_eq!(pi.transfer(&mut cpu, &descriptor(), Direction::ToRdram), Ok(()));
    }

    #[test]
    fn status_commands() {
        let regs = zeroed::<PiRegisters>();
        let mut pi = PiDma::new(&regs);
        pi.clear_interrupt();
        assert_eq!(regs.status.read(), STATUS_CLEAR_INTERRUPT);
        pi.reset();
        assert_eq!(regs.status.read(), STATUS_RESET);
    }
}
