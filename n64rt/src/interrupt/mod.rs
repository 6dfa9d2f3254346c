//! # Interrupts
//!
//! Installation is a one-way state machine, encoded in the type:
//!
//! ```text
//! Interrupts<Uninstalled> ──install()──▶ Interrupts<Installed> ──arm_video()──▶ Interrupts<Armed>
//!                                         (vector patched,                       (VI line unmasked,
//!                                          everything masked)                     IE set)
//! ```
//!
//! There is no way back. Once armed, every exception lands in the low-level
//! entry (context save/restore, outside this crate), which calls [`handle`].
//!
//! ## Dispatch
//!
//! ```text
//! Cause.IP2? ──no──▶ halt
//!    │
//!   yes
//!    ▼
//! MI_INTR & MI_MASK ──▶ InterruptSource ──Vi──▶ signal fence, ack VI
//!                                      └─any other──▶ halt
//! ```

pub mod frame;
pub mod mi;
pub mod trampoline;

use core::marker::PhantomData;

use crate::{
    cop0::{self, Cause, Cpu, CpuStatus},
    fence::VblankFence,
    video::{self, ViRegisters},
};

use self::{
    mi::{MiInterrupts, MiRegisters},
    trampoline::{Trampoline, VectorSlot},
};

/// Vector not yet patched.
pub struct Uninstalled;
/// Vector patched, all lines masked.
pub struct Installed;
/// VI line live.
pub struct Armed;

pub struct Interrupts<'a, S> {
    mi: &'a MiRegisters,
    _state: PhantomData<S>,
}

impl<'a> Interrupts<'a, Uninstalled> {
    pub fn new(mi: &'a MiRegisters) -> Self {
        Self {
            mi,
            _state: PhantomData,
        }
    }

    /// Patch the exception vector with `trampoline`.
    ///
    /// Interrupts are masked first and stay masked on return.
    pub fn install<C: Cpu>(
        self,
        cpu: &mut C,
        trampoline: Trampoline,
        slot: &mut VectorSlot,
    ) -> Interrupts<'a, Installed> {
        cpu.disable_interrupts();
        self.mi.disable(MiInterrupts::all());

        trampoline.install(cpu, slot);

        Interrupts {
            mi: self.mi,
            _state: PhantomData,
        }
    }
}

impl<'a> Interrupts<'a, Installed> {
    /// Let the VI interrupt through and turn interrupts on.
    pub fn arm_video<C: Cpu>(self, cpu: &mut C) -> Interrupts<'a, Armed> {
        self.mi.enable(MiInterrupts::VI);
        cpu.modify_status(|s| {
            s.remove(CpuStatus::EXL | CpuStatus::ERL);
            s.insert(CpuStatus::IM2 | CpuStatus::IE);
        });
        log::info!("VI interrupt armed");

        Interrupts {
            mi: self.mi,
            _state: PhantomData,
        }
    }
}

impl<S> Interrupts<'_, S> {
    #[inline(always)]
    pub fn mi(&self) -> &MiRegisters {
        self.mi
    }
}

/// One RCP device, as routed through the MI.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InterruptSource {
    Sp,
    Si,
    Ai,
    Vi,
    Pi,
    Dp,
}

impl InterruptSource {
    pub const ALL: [InterruptSource; 6] = [Self::Sp, Self::Si, Self::Ai, Self::Vi, Self::Pi, Self::Dp];

    #[inline(always)]
    pub fn line(self) -> MiInterrupts {
        match self {
            Self::Sp => MiInterrupts::SP,
            Self::Si => MiInterrupts::SI,
            Self::Ai => MiInterrupts::AI,
            Self::Vi => MiInterrupts::VI,
            Self::Pi => MiInterrupts::PI,
            Self::Dp => MiInterrupts::DP,
        }
    }

    /// Lowest-numbered source in `pending`.
    pub fn first(pending: MiInterrupts) -> Option<Self> {
        Self::ALL.into_iter().find(|s| pending.contains(s.line()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Handled(InterruptSource),
    Unhandled {
        cause: Cause,
        /// Enabled MI lines that were pending. Empty for non-RCP causes.
        pending: MiInterrupts,
    },
}

/// Work out why we were interrupted and service it if we can.
pub fn dispatch(cause: Cause, mi: &MiRegisters, vi: &ViRegisters, fence: &VblankFence) -> Dispatch {
    if !cause.is_interrupt() || !cause.rcp_pending() {
        return Dispatch::Unhandled {
            cause,
            pending: MiInterrupts::empty(),
        };
    }

    let pending = mi.pending() & mi.enabled();
    match InterruptSource::first(pending) {
        Some(InterruptSource::Vi) => {
            video::vblank_handler(vi, fence);
            Dispatch::Handled(InterruptSource::Vi)
        }
        _ => Dispatch::Unhandled { cause, pending },
    }
}

/// Entry point for the low-level exception glue. Halts on anything unhandled.
///
/// Runs in interrupt context, so nothing here logs. After a halt the cause is
/// still in COP0 and the MI registers for a debugger to read.
pub fn handle<C: Cpu>(cpu: &mut C, mi: &MiRegisters, vi: &ViRegisters, fence: &VblankFence) {
    if let Dispatch::Unhandled { .. } = dispatch(cpu.cause(), mi, vi, fence) {
        cop0::halt(cpu)
    }
}
