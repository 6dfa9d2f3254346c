//! # Framebuffers
//!
//! Two 320×240 16bpp framebuffers, row-major, RGBA5551. While one is scanned
//! out by the VI the other is the render target.
//!
//! Clearing is done with RSP DMA rather than the CPU: a one-page pattern of the
//! clear colour is loaded into DMEM once, then copied out page by page.
//!
//! ```text
//! framebuffer (153600 bytes)
//! ┌──────┬──────┬──────┬ ─ ─ ─ ┬──────┬────┐
//! │ 4096 │ 4096 │ 4096 │       │ 4096 │2048│   38 transfers
//! └──────┴──────┴──────┴ ─ ─ ─ ┴──────┴────┘
//!    ▲      ▲      ▲               ▲     ▲
//!    └──────┴──────┴── DMEM[0..4096] ────┘
//! ```

use crate::{dma::sp::DMEM_SIZE, mmio::PhysAddr};

pub const WIDTH: usize = 320;
pub const HEIGHT: usize = 240;
pub const PIXELS: usize = WIDTH * HEIGHT;
pub const FRAMEBUFFER_BYTES: usize = PIXELS * 2;

/// Clear pattern size. Matches DMEM and the 12-bit DMA length field.
pub const PAGE_SIZE: usize = DMEM_SIZE;

static_assertions::const_assert!(PAGE_SIZE <= 0x1000);
static_assertions::const_assert!(FRAMEBUFFER_BYTES % 8 == 0);
static_assertions::const_assert!(PAGE_SIZE % 8 == 0);

/// 16-bit colour: 5 bits each of red, green, blue, 1 bit coverage.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rgba5551(pub u16);

impl Rgba5551 {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(31, 31, 31);

    /// Opaque colour from 5-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u16 & 0x1F) << 11) | ((g as u16 & 0x1F) << 6) | ((b as u16 & 0x1F) << 1) | 1)
    }
}

#[repr(C, align(64))]
pub struct Framebuffer {
    pixels: [u16; PIXELS],
}

impl Framebuffer {
    pub const fn new() -> Self {
        Self { pixels: [0; PIXELS] }
    }

    #[inline(always)]
    pub fn pixels(&self) -> &[u16; PIXELS] {
        &self.pixels
    }

    #[inline(always)]
    pub fn pixels_mut(&mut self) -> &mut [u16; PIXELS] {
        &mut self.pixels
    }

    #[inline(always)]
    pub fn phys(&self) -> PhysAddr {
        PhysAddr::of(self.pixels.as_ptr())
    }

    /// Cached virtual address, for cache maintenance.
    #[inline(always)]
    pub fn vaddr(&self) -> u32 {
        self.pixels.as_ptr() as usize as u32
    }

    #[inline(always)]
    pub fn set(&mut self, x: usize, y: usize, color: Rgba5551) {
        if x < WIDTH && y < HEIGHT {
            self.pixels[y * WIDTH + x] = color.0;
        }
    }

    /// Fill a rectangle, clipped to the screen.
    pub fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, color: Rgba5551) {
        let x_end = x.saturating_add(width).min(WIDTH);
        let y_end = y.saturating_add(height).min(HEIGHT);
        if x >= x_end {
            return;
        }
        for row in y..y_end {
            self.pixels[row * WIDTH + x..row * WIDTH + x_end].fill(color.0);
        }
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// One page of clear colour in RDRAM, DMA'd into DMEM.
#[repr(C, align(16))]
pub struct StagingPage {
    words: [u16; PAGE_SIZE / 2],
}

impl StagingPage {
    pub const fn new() -> Self {
        Self {
            words: [0; PAGE_SIZE / 2],
        }
    }

    /// Replicate `color` across the whole page.
    pub fn fill(&mut self, color: Rgba5551) {
        self.words.fill(color.0);
    }

    #[inline(always)]
    pub fn words(&self) -> &[u16; PAGE_SIZE / 2] {
        &self.words
    }

    #[inline(always)]
    pub fn phys(&self) -> PhysAddr {
        PhysAddr::of(self.words.as_ptr())
    }

    #[inline(always)]
    pub fn vaddr(&self) -> u32 {
        self.words.as_ptr() as usize as u32
    }
}

impl Default for StagingPage {
    fn default() -> Self {
        Self::new()
    }
}

/// One page-or-shorter copy out of DMEM.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClearChunk {
    pub offset: usize,
    pub len: usize,
}

/// Split `total` bytes into `page`-sized chunks, last one short.
pub fn clear_plan(total: usize, page: usize) -> ClearPlan {
    ClearPlan {
        offset: 0,
        total,
        page,
    }
}

pub struct ClearPlan {
    offset: usize,
    total: usize,
    page: usize,
}

impl Iterator for ClearPlan {
    type Item = ClearChunk;

    fn next(&mut self) -> Option<ClearChunk> {
        if self.offset >= self.total {
            return None;
        }
        let len = self.page.min(self.total - self.offset);
        let chunk = ClearChunk {
            offset: self.offset,
            len,
        };
        self.offset += len;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.total - self.offset).div_ceil(self.page);
        (n, Some(n))
    }
}

impl ExactSizeIterator for ClearPlan {}
