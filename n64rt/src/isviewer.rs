//! # IS-Viewer Log Sink
//!
//! The IS-Viewer 64 was a development cartridge with a text window on the
//! host. Emulators and most flash carts still implement it: bytes go into a
//! buffer on the cartridge bus, and writing the byte count flushes them.
//!
//! | Offset   | Name   |                                          |
//! |----------|--------|------------------------------------------|
//! | `0x14`   | LENGTH | Bytes in the buffer. Write to print      |
//! | `0x20`   | BUFFER | Text, written as big-endian words        |
//!
//! Nothing in the runtime needs this. It only exists so `log` output is
//! visible somewhere; the binary opts in with [`init`].

use core::fmt::{self, Write};

use volatile_register::RW;

use crate::mmio;

pub const ISVIEWER_BASE: u32 = 0x13FF_0000;
/// Bytes sent per flush.
pub const CHUNK: usize = 0x200;

#[repr(C)]
pub struct IsViewerRegisters {
    _magic: RW<u32>,
    _reserved0: [RW<u32>; 4],
    pub length: RW<u32>,
    _reserved1: [RW<u32>; 2],
    pub buffer: [RW<u32>; CHUNK / 4],
}

static_assertions::const_assert_eq!(core::mem::offset_of!(IsViewerRegisters, length), 0x14);
static_assertions::const_assert_eq!(core::mem::offset_of!(IsViewerRegisters, buffer), 0x20);

impl IsViewerRegisters {
    /// # Safety
    ///
    /// Target hardware only. On a cartridge without an IS-Viewer the writes
    /// land in ROM space and are dropped.
    #[inline(always)]
    pub unsafe fn new() -> &'static IsViewerRegisters {
        unsafe { mmio::register_block(ISVIEWER_BASE) }
    }
}

pub struct IsViewer<'a> {
    regs: &'a IsViewerRegisters,
}

impl<'a> IsViewer<'a> {
    pub fn new(regs: &'a IsViewerRegisters) -> Self {
        Self { regs }
    }

    /// Print `bytes`, one flush per [`CHUNK`].
    pub fn put(&self, bytes: &[u8]) {
        for chunk in bytes.chunks(CHUNK) {
            for (slot, word) in self.regs.buffer.iter().zip(chunk.chunks(4)) {
                let mut be = [0u8; 4];
                be[..word.len()].copy_from_slice(word);
                unsafe { slot.write(u32::from_be_bytes(be)) };
            }
            unsafe { self.regs.length.write(chunk.len() as u32) };
        }
    }
}

impl Write for IsViewer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put(s.as_bytes());
        Ok(())
    }
}

struct IsViewerLogger;

impl log::Log for IsViewerLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut out = IsViewer::new(unsafe { IsViewerRegisters::new() });
        let _ = writeln!(out, "[{:<5}] {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: IsViewerLogger = IsViewerLogger;

/// Route `log` output to the IS-Viewer.
///
/// # Safety
///
/// Must run before interrupts are enabled and before anything else touches
/// the logger. Single core only.
pub unsafe fn init(level: log::LevelFilter) {
    unsafe {
        let _ = log::set_logger_racy(&LOGGER);
        log::set_max_level_racy(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::zeroed;

    #[test]
    fn short_message_is_one_flush() {
        let regs = zeroed::<IsViewerRegisters>();
        IsViewer::new(&regs).put(b"Hello N64\n");

        assert_eq!(regs.length.read(), 10);
        assert_eq!(regs.buffer[0].read(), u32::from_be_bytes(*b"Hell"));
        assert_eq!(regs.buffer[1].read(), u32::from_be_bytes(*b"o N6"));
        assert_eq!(regs.buffer[2].read(), u32::from_be_bytes([b'4', b'\n', 0, 0]));
        assert_eq!(regs.buffer[3].read(), 0);
    }

    #[test]
    fn long_message_flushes_per_chunk() {
        let regs = zeroed::<IsViewerRegisters>();
        let text = [b'x'; CHUNK + 6];
        IsViewer::new(&regs).put(&text);

        // last flush wins
        assert_eq!(regs.length.read(), 6);
        assert_eq!(regs.buffer[1].read(), u32::from_be_bytes([b'x', b'x', 0, 0]));
        assert_eq!(regs.buffer[2].read(), u32::from_be_bytes(*b"xxxx"));
    }

    #[test]
    fn formatted_output() {
        let regs = zeroed::<IsViewerRegisters>();
        let mut out = IsViewer::new(&regs);
        write!(out, "{}", 42).unwrap();
        assert_eq!(regs.length.read(), 2);
        assert_eq!(regs.buffer[0].read(), u32::from_be_bytes([b'4', b'2', 0, 0]));
    }
}
