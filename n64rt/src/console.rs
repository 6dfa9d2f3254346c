//! # Console
//!
//! Owns every handle the boot path needs and threads them through the boot
//! sequence and the render loop. Nothing here is a global; the binary builds
//! the handles once at startup and gives them away.

use crate::{
    beacon::{Beacon, BeaconSlot, Stage},
    cop0::{self, Cpu},
    dma::{
        pi::{PiDma, PiRegisters},
        sp::{SpDescriptor, SpRegisters},
        DmaEngine,
    },
    fence::VblankFence,
    handoff::{BootParamBlock, BootParams},
    interrupt::{
        mi::MiRegisters,
        trampoline::{Trampoline, VectorSlot},
        Armed, Interrupts,
    },
    video::{
        framebuffer::{Framebuffer, Rgba5551, StagingPage},
        timing::Platform,
        Video, ViRegisters,
    },
};

/// Register blocks and fixed RDRAM slots.
pub struct Peripherals<'a> {
    pub vi: &'a ViRegisters,
    pub pi: &'a PiRegisters,
    pub sp: &'a SpRegisters,
    pub mi: &'a MiRegisters,
    pub params: &'a BootParamBlock,
    pub beacon: &'a BeaconSlot,
    pub vector: VectorSlot,
}

impl Peripherals<'static> {
    /// # Safety
    ///
    /// Call once, on the console.
    pub unsafe fn take() -> Self {
        unsafe {
            Self {
                vi: ViRegisters::new(),
                pi: PiRegisters::new(),
                sp: SpRegisters::new(),
                mi: MiRegisters::new(),
                params: BootParamBlock::new(),
                beacon: BeaconSlot::new(),
                vector: VectorSlot::general_exception(),
            }
        }
    }
}

/// RDRAM the video path owns for the life of the program.
pub struct FrameMemory<'a> {
    pub framebuffers: &'a mut [Framebuffer; 2],
    pub staging: &'a mut StagingPage,
    pub fence: &'a VblankFence,
}

pub struct Console<'a, C: Cpu, S: DmaEngine<Descriptor = SpDescriptor>> {
    cpu: C,
    video: Video<'a, S>,
    pi: PiDma<'a>,
    interrupts: Interrupts<'a, Armed>,
    params: BootParams,
    beacon: Beacon<'a>,
    frame: u32,
}

impl<'a, C: Cpu, S: DmaEngine<Descriptor = SpDescriptor>> Console<'a, C, S> {
    /// Bring the machine from loader handoff to a running display.
    ///
    /// The exception vector is patched with interrupts masked, video is fully
    /// programmed and both framebuffers are cleared before the VI interrupt is
    /// let through.
    pub fn boot(
        mut cpu: C,
        sp: S,
        mut peripherals: Peripherals<'a>,
        memory: FrameMemory<'a>,
        entry: Trampoline,
        clear_color: Rgba5551,
    ) -> Self {
        let beacon = Beacon::new(peripherals.beacon);
        beacon.mark(Stage::Entry);

        let installed = Interrupts::new(peripherals.mi).install(&mut cpu, entry, &mut peripherals.vector);
        beacon.mark(Stage::Trampoline);

        let params = BootParams::read(peripherals.params);
        let platform = Platform::detect(&params);
        log::info!(
            "{:?} {:?} boot, {:?}, {}KB RDRAM",
            params.reset_type,
            params.rom_type,
            platform,
            params.mem_size / 1024
        );

        let video = Video::initialize(
            &mut cpu,
            peripherals.vi,
            sp,
            memory.framebuffers,
            memory.staging,
            memory.fence,
            platform,
            clear_color,
        );
        beacon.mark(Stage::Video);

        let interrupts = installed.arm_video(&mut cpu);
        beacon.mark(Stage::Armed);

        Self {
            cpu,
            video,
            pi: PiDma::new(peripherals.pi),
            interrupts,
            params,
            beacon,
            frame: 0,
        }
    }

    /// One frame: clear the back buffer, `draw` into it, flip at vblank.
    pub fn frame(&mut self, draw: impl FnOnce(&mut Framebuffer, u32)) {
        self.video.render_target_clear(&mut self.cpu);
        draw(self.video.render_target_get(), self.frame);

        self.video.vblank_wait(&mut self.cpu);
        self.video.swap_buffers(&mut self.cpu);
        self.video.vblank_end();

        self.frame = self.frame.wrapping_add(1);
    }

    pub fn run(mut self, mut draw: impl FnMut(&mut Framebuffer, u32)) -> ! {
        self.beacon.mark(Stage::Loop);
        loop {
            self.frame(&mut draw);
        }
    }

    /// Give up for good.
    pub fn halt(&mut self) -> ! {
        self.beacon.mark(Stage::Halt);
        log::error!("halted after {} frames", self.frame);
        cop0::halt(&mut self.cpu)
    }

    #[inline(always)]
    pub fn cpu(&mut self) -> &mut C {
        &mut self.cpu
    }

    #[inline(always)]
    pub fn video(&mut self) -> &mut Video<'a, S> {
        &mut self.video
    }

    /// Cartridge DMA, with the CPU to idle on.
    #[inline(always)]
    pub fn pi(&mut self) -> (&mut PiDma<'a>, &mut C) {
        (&mut self.pi, &mut self.cpu)
    }

    #[inline(always)]
    pub fn mi(&self) -> &MiRegisters {
        self.interrupts.mi()
    }

    #[inline(always)]
    pub fn params(&self) -> &BootParams {
        &self.params
    }

    #[inline(always)]
    pub fn frame_count(&self) -> u32 {
        self.frame
    }
}
