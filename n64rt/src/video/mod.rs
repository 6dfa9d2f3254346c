//! # Video Output
//!
//! Double-buffered 320×240 output through the VI.
//!
//! ## Double Buffering
//!
//! Exactly one framebuffer is *displaying* and the other is *rendering*. All
//! render-target accessors only ever touch the rendering one; nothing locks
//! the displaying buffer, the discipline is the whole protection.
//!
//! ```ignore
//! loop {
//!     video.render_target_clear(&mut cpu);
//!     draw(video.render_target_get());
//!
//!     video.vblank_wait(&mut cpu);
//!     video.swap_buffers(&mut cpu);   // only valid during vblank
//!     video.vblank_end();
//! }
//! ```
//!
//! ## Register Layout (`0x0440_0000`)
//!
//! | Offset | Name        | Description                                  |
//! |--------|-------------|----------------------------------------------|
//! | `0x00` | CTRL        | Pixel format, AA, pixel advance. Enables out |
//! | `0x04` | ORIGIN      | Physical address of the displayed buffer     |
//! | `0x08` | WIDTH       | Framebuffer width in pixels                  |
//! | `0x0C` | V_INTR      | Half-line to interrupt on                    |
//! | `0x10` | V_CURRENT   | Current half-line. Write clears interrupt    |
//! | `0x14` | BURST       | Colour burst timing                          |
//! | `0x18` | V_SYNC      | Half-lines per field                         |
//! | `0x1C` | H_SYNC      | Line length                                  |
//! | `0x20` | H_SYNC_LEAP | PAL leap pattern                             |
//! | `0x24` | H_VIDEO     | Active horizontal span                       |
//! | `0x28` | V_VIDEO     | Active vertical span                         |
//! | `0x2C` | V_BURST     | Colour burst vertical span                   |
//! | `0x30` | X_SCALE     | 2.10 fixed horizontal scale                  |
//! | `0x34` | Y_SCALE     | 2.10 fixed vertical scale                    |

pub mod framebuffer;
pub mod timing;

use volatile_register::RW;

use crate::{
    cop0::Cpu,
    dma::{
        DmaEngine, Direction,
        sp::{SpDescriptor, DMEM_SIZE},
    },
    fence::VblankFence,
    mmio,
};

use self::{
    framebuffer::{clear_plan, Framebuffer, Rgba5551, StagingPage, FRAMEBUFFER_BYTES, HEIGHT, PAGE_SIZE, WIDTH},
    timing::{AntiAlias, Platform, TimingProfile},
};

pub const VI_BASE: u32 = 0x0440_0000;

/// Half-line the VI interrupts on.
pub const VBLANK_LINE: u32 = 2;

/// DMEM offset the clear pattern is loaded at.
const PATTERN_DMEM: u32 = 0;

static_assertions::const_assert!(PATTERN_DMEM as usize + PAGE_SIZE <= DMEM_SIZE);

#[repr(C)]
pub struct ViRegisters {
    pub ctrl: RW<u32>,
    pub origin: RW<u32>,
    pub width: RW<u32>,
    pub v_intr: RW<u32>,
    pub v_current: RW<u32>,
    pub burst: RW<u32>,
    pub v_sync: RW<u32>,
    pub h_sync: RW<u32>,
    pub h_sync_leap: RW<u32>,
    pub h_video: RW<u32>,
    pub v_video: RW<u32>,
    pub v_burst: RW<u32>,
    pub x_scale: RW<u32>,
    pub y_scale: RW<u32>,
}

impl ViRegisters {
    /// # Safety
    ///
    /// Only meaningful on the console; see [`mmio::register_block`].
    #[inline(always)]
    pub unsafe fn new() -> &'static ViRegisters {
        unsafe { mmio::register_block(VI_BASE) }
    }
}

/// Interrupt-side half of vblank: signal the fence and drop the VI line.
#[inline(always)]
pub fn vblank_handler(regs: &ViRegisters, fence: &VblankFence) {
    fence.signal();
    // any write to V_CURRENT acknowledges the interrupt
    unsafe { regs.v_current.write(0) };
}

/// Owns both framebuffers, the staging page and the vblank fence.
pub struct Video<'a, S: DmaEngine<Descriptor = SpDescriptor>> {
    regs: &'a ViRegisters,
    sp: S,
    framebuffers: &'a mut [Framebuffer; 2],
    staging: &'a mut StagingPage,
    fence: &'a VblankFence,
    displaying: usize,
    platform: Platform,
}

impl<'a, S: DmaEngine<Descriptor = SpDescriptor>> Video<'a, S> {
    /// Clear both buffers to `clear_color` and start scanning out buffer 0.
    ///
    /// Both buffers are cleared before the VI is enabled, so the first visible
    /// frame is never garbage. `VI_CTRL` is written last; nothing is shown
    /// until every other register holds its final value.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize<C: Cpu>(
        cpu: &mut C,
        regs: &'a ViRegisters,
        sp: S,
        framebuffers: &'a mut [Framebuffer; 2],
        staging: &'a mut StagingPage,
        fence: &'a VblankFence,
        platform: Platform,
        clear_color: Rgba5551,
    ) -> Self {
        // blank output while everything else changes
        unsafe { regs.ctrl.write(0) };
        fence.initialize();

        let mut video = Self {
            regs,
            sp,
            framebuffers,
            staging,
            fence,
            displaying: 0,
            platform,
        };

        video.set_clear_color(cpu, clear_color);
        video.clear_framebuffer(cpu, 0);
        video.clear_framebuffer(cpu, 1);

        log::debug!("programming VI for {:?}", platform);
        video.program_timing(platform.profile());
        video
    }

    fn program_timing(&mut self, profile: &TimingProfile) {
        let origin = self.framebuffers[self.displaying].phys().as_u32();
        unsafe {
            self.regs.origin.write(origin);
            self.regs.width.write(WIDTH as u32);
            self.regs.v_intr.write(VBLANK_LINE);
            self.regs.v_current.write(0);
            self.regs.burst.write(profile.burst);
            self.regs.v_sync.write(profile.v_sync);
            self.regs.h_sync.write(profile.h_sync);
            self.regs.h_sync_leap.write(profile.h_sync_leap);
            self.regs.h_video.write(profile.h_video);
            self.regs.v_video.write(profile.v_video);
            self.regs.v_burst.write(profile.v_burst);
            self.regs.x_scale.write(x_scale(profile));
            self.regs.y_scale.write(y_scale(profile));

            self.regs.ctrl.write(profile.ctrl(AntiAlias::ResampleOnly));
        }
    }

    #[inline(always)]
    pub fn sp(&self) -> &S {
        &self.sp
    }

    #[inline(always)]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[inline(always)]
    pub fn displaying_index(&self) -> usize {
        self.displaying
    }

    #[inline(always)]
    pub fn rendering_index(&self) -> usize {
        (self.displaying + 1) % 2
    }

    /// The buffer that is safe to draw into.
    #[inline(always)]
    pub fn render_target_get(&mut self) -> &mut Framebuffer {
        &mut self.framebuffers[self.rendering_index()]
    }

    /// DMA-clear the render target to the current clear colour.
    pub fn render_target_clear<C: Cpu>(&mut self, cpu: &mut C) {
        self.clear_framebuffer(cpu, self.rendering_index());
    }

    /// Change the clear colour and reload the DMEM pattern.
    pub fn set_clear_color<C: Cpu>(&mut self, cpu: &mut C, color: Rgba5551) {
        self.staging.fill(color);
        cpu.dcache_writeback_range(self.staging.vaddr(), PAGE_SIZE as u32);

        // the pattern load can't overlap a clear still reading DMEM
        self.sp.wait_idle(cpu);
        self.sp.start(
            &SpDescriptor::linear(PATTERN_DMEM, self.staging.phys(), PAGE_SIZE),
            Direction::FromRdram,
        );
        self.sp.wait_idle(cpu);
    }

    /// Show the render target.
    ///
    /// Only call while vertical blank is active, otherwise the VI may switch
    /// buffers mid-scanout and tear. Nothing here checks.
    pub fn swap_buffers<C: Cpu>(&mut self, cpu: &mut C) {
        let next = self.rendering_index();
        let fb = &self.framebuffers[next];
        cpu.dcache_writeback_range(fb.vaddr(), FRAMEBUFFER_BYTES as u32);

        self.displaying = next;
        unsafe { self.regs.origin.write(fb.phys().as_u32()) };
    }

    pub fn vblank_wait<C: Cpu>(&self, cpu: &mut C) {
        self.fence.wait(cpu);
    }

    /// Re-arm the fence once the frame's vblank work is done.
    pub fn vblank_end(&self) {
        self.fence.reinitialize();
    }

    pub fn vblank_triggered(&self) -> bool {
        self.fence.is_signaled()
    }

    pub fn vblank_handler(&self) {
        vblank_handler(self.regs, self.fence);
    }

    /// Page-sized DMEM copies into `index`, at most one active and one queued.
    fn clear_framebuffer<C: Cpu>(&mut self, cpu: &mut C, index: usize) {
        let fb = &self.framebuffers[index];
        let base = fb.phys();

        // stale lines would shadow the DMA'd data, dirty ones would overwrite it
        cpu.dcache_invalidate_range(fb.vaddr(), FRAMEBUFFER_BYTES as u32);

        for chunk in clear_plan(FRAMEBUFFER_BYTES, PAGE_SIZE) {
            self.sp.wait_queue(cpu);
            self.sp.start(
                &SpDescriptor::linear(PATTERN_DMEM, base.offset(chunk.offset as u32), chunk.len),
                Direction::ToRdram,
            );
        }
        self.sp.wait_idle(cpu);
    }
}

/// Horizontal scale, 2.10 fixed point: framebuffer pixels per output pixel.
fn x_scale(profile: &TimingProfile) -> u32 {
    (WIDTH as u32 * 0x400) / profile.active_width()
}

/// Vertical scale, 2.10 fixed point: framebuffer lines per output line.
fn y_scale(profile: &TimingProfile) -> u32 {
    (HEIGHT as u32 * 0x400) / (profile.active_half_lines() / 2)
}
