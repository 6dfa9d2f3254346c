use core::{arch::global_asm, panic::PanicInfo};

use n64rt::{
    beacon::{Beacon, BeaconSlot, Stage},
    cop0::{self, Vr4300},
    interrupt::{self, frame, mi::MiRegisters},
    video::ViRegisters,
};

use crate::{main, FENCE};

#[panic_handler]
fn panic(info: &PanicInfo<'_>) -> ! {
    let mut cpu = unsafe { Vr4300::new() };
    Beacon::new(unsafe { BeaconSlot::new() }).mark(Stage::Halt);
    log::error!("{}", info);
    cop0::halt(&mut cpu)
}

unsafe extern "C" {
    /// Exception entry. The vector trampoline jumps here.
    pub unsafe fn __interrupt_entry();

    unsafe static mut __bss_start: u8;
    unsafe static mut __bss_end: u8;
}

// IPL3 jumps here with interrupts off and the caches initialised
global_asm!(
    r#"
    .section .boot, "ax"
    .global _start
    .set noreorder
_start:
    la    $sp, __stack_top
    j     __boot
    nop
    .set reorder
"#
);

// Caller-saved registers only, as full doublewords; see `interrupt::frame`.
// EXL is set for the whole of this, so nothing nests.
global_asm!(
    r#"
    .section .text.__interrupt_entry, "ax"
    .global __interrupt_entry
    .set noreorder
    .set noat
__interrupt_entry:
    addiu $sp, $sp, -{frame}
    sd    $at, {at}($sp)
    sd    $v0, {v0}($sp)
    sd    $v1, {v1}($sp)
    sd    $a0, {a0}($sp)
    sd    $a1, {a1}($sp)
    sd    $a2, {a2}($sp)
    sd    $a3, {a3}($sp)
    sd    $t0, {t0}($sp)
    sd    $t1, {t1}($sp)
    sd    $t2, {t2}($sp)
    sd    $t3, {t3}($sp)
    sd    $t4, {t4}($sp)
    sd    $t5, {t5}($sp)
    sd    $t6, {t6}($sp)
    sd    $t7, {t7}($sp)
    sd    $t8, {t8}($sp)
    sd    $t9, {t9}($sp)
    sd    $ra, {ra}($sp)
    mfhi  $k0
    sd    $k0, {hi}($sp)
    mflo  $k0
    sd    $k0, {lo}($sp)

    jal   handle_interrupt
    nop

    ld    $k0, {lo}($sp)
    mtlo  $k0
    ld    $k0, {hi}($sp)
    mthi  $k0
    ld    $ra, {ra}($sp)
    ld    $t9, {t9}($sp)
    ld    $t8, {t8}($sp)
    ld    $t7, {t7}($sp)
    ld    $t6, {t6}($sp)
    ld    $t5, {t5}($sp)
    ld    $t4, {t4}($sp)
    ld    $t3, {t3}($sp)
    ld    $t2, {t2}($sp)
    ld    $t1, {t1}($sp)
    ld    $t0, {t0}($sp)
    ld    $a3, {a3}($sp)
    ld    $a2, {a2}($sp)
    ld    $a1, {a1}($sp)
    ld    $a0, {a0}($sp)
    ld    $v1, {v1}($sp)
    ld    $v0, {v0}($sp)
    ld    $at, {at}($sp)
    addiu $sp, $sp, {frame}
    eret
    .set at
    .set reorder
"#,
    frame = const frame::FRAME_SIZE,
    hi = const frame::HI_OFFSET,
    lo = const frame::LO_OFFSET,
    at = const frame::gpr_slot(0),
    v0 = const frame::gpr_slot(1),
    v1 = const frame::gpr_slot(2),
    a0 = const frame::gpr_slot(3),
    a1 = const frame::gpr_slot(4),
    a2 = const frame::gpr_slot(5),
    a3 = const frame::gpr_slot(6),
    t0 = const frame::gpr_slot(7),
    t1 = const frame::gpr_slot(8),
    t2 = const frame::gpr_slot(9),
    t3 = const frame::gpr_slot(10),
    t4 = const frame::gpr_slot(11),
    t5 = const frame::gpr_slot(12),
    t6 = const frame::gpr_slot(13),
    t7 = const frame::gpr_slot(14),
    t8 = const frame::gpr_slot(15),
    t9 = const frame::gpr_slot(16),
    ra = const frame::gpr_slot(17),
);

#[unsafe(no_mangle)]
extern "C" fn handle_interrupt() {
    let mut cpu = unsafe { Vr4300::new() };
    let (mi, vi) = unsafe { (MiRegisters::new(), ViRegisters::new()) };
    interrupt::handle(&mut cpu, mi, vi, &FENCE);
}

#[inline(always)]
unsafe fn zero_bss() {
    unsafe {
        let mut bss = &raw mut __bss_start as *mut u8;
        let bss_end = &raw mut __bss_end as *mut u8;
        while bss < bss_end {
            bss.write_volatile(0);
            bss = bss.add(1);
        }
    }
}

#[unsafe(no_mangle)]
unsafe extern "C" fn __boot() -> ! {
    unsafe {
        zero_bss();
    }

    // statics are only valid after .bss is cleared, keep main out of this frame
    call_main()
}

#[inline(never)]
fn call_main() -> ! {
    main()
}
