#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

mod boot;

use n64rt::{
    console::{Console, FrameMemory, Peripherals},
    cop0::Vr4300,
    dma::sp::SpDma,
    fence::VblankFence,
    interrupt::trampoline::Trampoline,
    video::framebuffer::{Framebuffer, Rgba5551, StagingPage, HEIGHT, WIDTH},
};

use crate::boot::__interrupt_entry;

static mut FRAMEBUFFERS: [Framebuffer; 2] = [Framebuffer::new(), Framebuffer::new()];
static mut STAGING: StagingPage = StagingPage::new();
pub static FENCE: VblankFence = VblankFence::new();

const BACKGROUND: Rgba5551 = Rgba5551::rgb(0, 0, 8);
const SQUARE: usize = 24;

pub fn main() -> ! {
    #[cfg(feature = "isviewer")]
    unsafe {
        n64rt::isviewer::init(log::LevelFilter::Debug)
    };

    let cpu = unsafe { Vr4300::new() };
    let peripherals = unsafe { Peripherals::take() };
    let sp = SpDma::new(peripherals.sp);

    // the only references to these statics that will ever exist
    let memory = unsafe {
        FrameMemory {
            framebuffers: &mut *(&raw mut FRAMEBUFFERS),
            staging: &mut *(&raw mut STAGING),
            fence: &FENCE,
        }
    };

    let console = Console::boot(
        cpu,
        sp,
        peripherals,
        memory,
        Trampoline::to(__interrupt_entry),
        BACKGROUND,
    );

    let mut x = 0usize;
    let mut y = 0usize;
    let mut dx = 2isize;
    let mut dy = 1isize;

    console.run(move |fb, frame| {
        let color = Rgba5551::rgb((frame / 2 % 32) as u8, 31, 16);
        fb.fill_rect(x, y, SQUARE, SQUARE, color);

        if (x == 0 && dx < 0) || (x + SQUARE >= WIDTH && dx > 0) {
            dx = -dx;
        }
        if (y == 0 && dy < 0) || (y + SQUARE >= HEIGHT && dy > 0) {
            dy = -dy;
        }
        x = x.saturating_add_signed(dx).min(WIDTH - SQUARE);
        y = y.saturating_add_signed(dy).min(HEIGHT - SQUARE);
    })
}
