//! # Boot Handoff
//!
//! The IPL leaves a small parameter block in low RDRAM before jumping to us.
//! We only ever read it.
//!
//! | Offset  | Name          | Meaning                                  |
//! |---------|---------------|------------------------------------------|
//! | `0x300` | TV_TYPE       | 0 PAL, 1 NTSC, 2 MPAL                    |
//! | `0x304` | ROM_TYPE      | 0 cartridge, 1 64DD                      |
//! | `0x308` | ROM_BASE      | PI address the ROM was booted from       |
//! | `0x30C` | RESET_TYPE    | 0 cold, 1 warm (reset button)            |
//! | `0x310` | CIC_ID        | Lockout chip seed                        |
//! | `0x314` | VERSION       | IPL version                              |
//! | `0x318` | MEM_SIZE      | RDRAM size in bytes                      |
//! | `0x31C` | APP_NMI_BUF   | 64 bytes that survive a warm reset       |

use volatile_register::RO;

use crate::mmio::{self, PhysAddr};

pub const BOOT_PARAMS: u32 = 0x300;
/// Size of the block up to and including the NMI buffer. Shared with the linker
/// script, which keeps `.text` clear of it.
pub const BOOT_PARAMS_SIZE: usize = 0x5C;

#[repr(C)]
pub struct BootParamBlock {
    pub tv_type: RO<u32>,
    pub rom_type: RO<u32>,
    pub rom_base: RO<u32>,
    pub reset_type: RO<u32>,
    pub cic_id: RO<u32>,
    pub version: RO<u32>,
    pub mem_size: RO<u32>,
    pub app_nmi_buffer: [RO<u32>; 16],
}

static_assertions::const_assert_eq!(core::mem::size_of::<BootParamBlock>(), BOOT_PARAMS_SIZE);

impl BootParamBlock {
    /// # Safety
    ///
    /// Target hardware only, after the IPL has run.
    #[inline(always)]
    pub unsafe fn new() -> &'static BootParamBlock {
        unsafe { mmio::register_block(BOOT_PARAMS) }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TvType {
    Pal,
    Ntsc,
    Mpal,
    Unknown(u32),
}

impl From<u32> for TvType {
    fn from(raw: u32) -> Self {
        match raw {
            0 => Self::Pal,
            1 => Self::Ntsc,
            2 => Self::Mpal,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RomType {
    Cartridge,
    Disk,
    Unknown(u32),
}

impl From<u32> for RomType {
    fn from(raw: u32) -> Self {
        match raw {
            0 => Self::Cartridge,
            1 => Self::Disk,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResetType {
    Cold,
    Warm,
    Unknown(u32),
}

impl From<u32> for ResetType {
    fn from(raw: u32) -> Self {
        match raw {
            0 => Self::Cold,
            1 => Self::Warm,
            other => Self::Unknown(other),
        }
    }
}

/// Decoded copy of the handoff block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BootParams {
    pub tv_type: TvType,
    pub rom_type: RomType,
    pub rom_base: PhysAddr,
    pub reset_type: ResetType,
    pub cic_id: u32,
    pub mem_size: u32,
}

impl BootParams {
    pub fn read(block: &BootParamBlock) -> Self {
        Self {
            tv_type: block.tv_type.read().into(),
            rom_type: block.rom_type.read().into(),
            rom_base: PhysAddr::new(block.rom_base.read()),
            reset_type: block.reset_type.read().into(),
            cic_id: block.cic_id.read(),
            mem_size: block.mem_size.read(),
        }
    }

    /// Expansion Pak fitted.
    pub fn has_expansion(&self) -> bool {
        self.mem_size > 0x40_0000
    }
}

impl Default for BootParams {
    /// A cold NTSC cartridge boot on a stock 4MB console.
    fn default() -> Self {
        Self {
            tv_type: TvType::Ntsc,
            rom_type: RomType::Cartridge,
            rom_base: PhysAddr::new(0x1000_0000),
            reset_type: ResetType::Cold,
            cic_id: 0,
            mem_size: 0x40_0000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::zeroed;

    fn block_with(words: &[u32]) -> Box<BootParamBlock> {
        let mut block = zeroed::<BootParamBlock>();
        let raw = &mut *block as *mut BootParamBlock as *mut u32;
        for (i, word) in words.iter().enumerate() {
            unsafe { raw.add(i).write_volatile(*word) };
        }
        block
    }

    #[test]
    fn decodes_block() {
        let block = block_with(&[0, 0, 0xB000_0000, 1, 0x3F, 6, 0x80_0000]);
        let params = BootParams::read(&block);

        assert_eq!(params.tv_type, TvType::Pal);
        assert_eq!(params.rom_type, RomType::Cartridge);
        assert_eq!(params.rom_base.as_u32(), 0x1000_0000);
        assert_eq!(params.reset_type, ResetType::Warm);
        assert_eq!(params.cic_id, 0x3F);
        assert_eq!(params.mem_size, 0x80_0000);
        assert!(params.has_expansion());
    }

    #[test]
    fn unknown_codes_are_kept() {
        let block = block_with(&[5, 9, 0, 3]);
        let params = BootParams::read(&block);
        assert_eq!(params.tv_type, TvType::Unknown(5));
        assert_eq!(params.rom_type, RomType::Unknown(9));
        assert_eq!(params.reset_type, ResetType::Unknown(3));
    }

    #[test]
    fn default_is_stock_ntsc() {
        let params = BootParams::default();
        assert_eq!(params.tv_type, TvType::Ntsc);
        assert!(!params.has_expansion());
    }
}
