//! # n64rt
//!
//! Bare-metal runtime for the window between the first-stage loader handing off
//! and a real operating environment existing. There is no scheduler and no heap;
//! the only concurrency is the hardware itself:
//!
//! - the PI and RSP DMA engines moving data while the CPU keeps running,
//! - the VI raising an interrupt at vertical blank.
//!
//! ## Boot Sequence
//!
//! ```ignore
//! let mut console = Console::boot(cpu, sp, peripherals, memory, trampoline, BLACK);
//!
//! console.run(|fb, frame| {
//!     fb.fill_rect(frame % 300, 100, 20, 20, Rgba5551::rgb(31, 0, 0));
//! });
//! ```
//!
//! [`Console::boot`](console::Console::boot) masks interrupts, patches the
//! exception vector with a jump to the interrupt entry, programs the VI for the
//! detected TV standard, clears both framebuffers with RSP DMA and finally arms
//! the VI interrupt. Every frame after that clears the back buffer, draws,
//! waits for vblank and flips.
//!
//! ## Memory Map
//!
//! | Block      | Physical      | Driver                                   |
//! |------------|---------------|------------------------------------------|
//! | SP DMEM    | `0x0400_0000` | [`dma::sp`] (clear pattern lives here)   |
//! | SP regs    | `0x0404_0000` | [`dma::sp::SpRegisters`]                 |
//! | MI regs    | `0x0430_0000` | [`interrupt::mi::MiRegisters`]           |
//! | VI regs    | `0x0440_0000` | [`video::ViRegisters`]                   |
//! | PI regs    | `0x0460_0000` | [`dma::pi::PiRegisters`]                 |
//!
//! All register access goes through the uncached KSEG1 alias, see [`mmio`].

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "mips", feature(asm_experimental_arch))]

pub mod beacon;
pub mod console;
pub mod cop0;
pub mod dma;
pub mod error;
pub mod fence;
pub mod handoff;
pub mod idle;
pub mod interrupt;
pub mod isviewer;
pub mod mmio;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;

pub use error::Error;
