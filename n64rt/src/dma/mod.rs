//! # DMA Engines
//!
//! Two engines move data in and out of RDRAM while the CPU keeps running:
//!
//! | Engine     | Other side                 | Queue | Error bit |
//! |------------|----------------------------|-------|-----------|
//! | [`pi`]     | Cartridge / 64DD bus       | none  | yes       |
//! | [`sp`]     | RSP DMEM/IMEM (scratch)    | 1     | no        |
//!
//! Both follow the same protocol: write the address registers, then write a
//! length register. The length write *is* the start command, so the order is
//! fixed. Completion is only ever observed by polling.
//!
//! ```ignore
//! sp.start(&SpDescriptor::linear(0, PhysAddr::of(buf), 4096), Direction::FromRdram);
//! // ... CPU work runs in parallel ...
//! sp.wait_idle(&mut cpu);
//! ```

pub mod pi;
pub mod sp;

use crate::{cop0::Cpu, idle, Error};

/// Which way the bytes go, seen from RDRAM.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    /// Device (cartridge, DMEM) into RDRAM.
    ToRdram,
    /// RDRAM out to the device.
    FromRdram,
}

/// What a single status read says about the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DmaStatus {
    InProgress,
    IoError,
    Completed,
}

impl DmaStatus {
    /// Classify a raw `PI_STATUS` word: bit 0 busy, bit 2 error.
    #[inline(always)]
    pub const fn from_pi_status(raw: u32) -> Self {
        if raw & 0b001 != 0 {
            Self::InProgress
        } else if raw & 0b100 != 0 {
            Self::IoError
        } else {
            Self::Completed
        }
    }

    /// Terminal status as a result. `InProgress` never reaches here from a wait.
    #[inline]
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Self::IoError => Err(Error::PiIo),
            _ => Ok(()),
        }
    }
}

/// What an engine can do beyond a single transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EngineCaps {
    /// A second transfer may be started once the first has begun.
    pub queued: bool,
    /// Completion can report [`DmaStatus::IoError`].
    pub reports_errors: bool,
}

/// Shared start/status/wait protocol.
pub trait DmaEngine {
    type Descriptor;
    const CAPS: EngineCaps;

    /// Program the address registers, then the length register for
    /// `direction`, which starts the transfer.
    ///
    /// Descriptor alignment and the engine's queue depth are the caller's
    /// problem; nothing is checked here.
    fn start(&mut self, descriptor: &Self::Descriptor, direction: Direction);

    /// One read of the hardware status.
    fn status(&self) -> DmaStatus;

    /// The queue slot is occupied. Engines without a queue are never full.
    #[inline(always)]
    fn queue_full(&self) -> bool {
        false
    }

    /// Idle until the engine stops, returning its terminal status.
    ///
    /// Engines without an error bit always complete.
    #[inline]
    fn wait_idle<C: Cpu>(&self, cpu: &mut C) -> DmaStatus {
        idle::spin(cpu, || match self.status() {
            DmaStatus::InProgress => None,
            DmaStatus::IoError if !Self::CAPS.reports_errors => Some(DmaStatus::Completed),
            done => Some(done),
        })
    }

    /// Idle until another transfer can be started.
    ///
    /// Without a hardware queue (or with `dma-queue` disabled) that means
    /// waiting for the engine to go idle.
    #[inline]
    fn wait_queue<C: Cpu>(&self, cpu: &mut C) {
        if Self::CAPS.queued && cfg!(feature = "dma-queue") {
            idle::spin(cpu, || (!self.queue_full()).then_some(()));
        } else {
            self.wait_idle(cpu);
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::{cop0::CpuStatus, testing::FakeCpu};

    /// Plays back a fixed list of raw PI status words, then sticks on the last.
    struct Scripted<'a> {
        words: &'a [u32],
        next: Cell<usize>,
    }

    impl<'a> Scripted<'a> {
        fn new(words: &'a [u32]) -> Self {
            Self { words, next: Cell::new(0) }
        }
    }

    impl DmaEngine for Scripted<'_> {
        type Descriptor = ();
        const CAPS: EngineCaps = EngineCaps { queued: false, reports_errors: true };

        fn start(&mut self, _: &(), _: Direction) {}

        fn status(&self) -> DmaStatus {
            let i = self.next.get();
            self.next.set(i + 1);
            DmaStatus::from_pi_status(self.words[i.min(self.words.len() - 1)])
        }
    }

    #[test]
    fn pi_status_classification() {
        assert_eq!(DmaStatus::from_pi_status(0b000), DmaStatus::Completed);
        assert_eq!(DmaStatus::from_pi_status(0b001), DmaStatus::InProgress);
        assert_eq!(DmaStatus::from_pi_status(0b011), DmaStatus::InProgress);
        // busy wins over error
        assert_eq!(DmaStatus::from_pi_status(0b101), DmaStatus::InProgress);
        assert_eq!(DmaStatus::from_pi_status(0b100), DmaStatus::IoError);
        // IO busy alone is not a DMA in progress
        assert_eq!(DmaStatus::from_pi_status(0b010), DmaStatus::Completed);
    }

    #[test]
    fn wait_idle_returns_terminal_status() {
        let mut cpu = FakeCpu::new();

        let engine = Scripted::new(&[1, 1, 3, 1, 0]);
        assert_eq!(engine.wait_idle(&mut cpu), DmaStatus::Completed);
        assert_eq!(engine.next.get(), 5);

        let engine = Scripted::new(&[1, 5, 4]);
        assert_eq!(engine.wait_idle(&mut cpu), DmaStatus::IoError);
        assert_eq!(engine.next.get(), 3);
    }

    #[test]
    fn wait_idle_never_returns_in_progress() {
        let mut cpu = FakeCpu::new();
        for busy in 0..8 {
            for tail in [0u32, 2, 4, 6] {
                let mut words = vec![1u32; busy];
                words.push(tail);
                let engine = Scripted::new(&words);
                assert_ne!(engine.wait_idle(&mut cpu), DmaStatus::InProgress);
            }
        }
    }

    #[test]
    fn waits_run_in_reduced_power() {
        let mut cpu = FakeCpu::new();
        Scripted::new(&[1, 0]).wait_idle(&mut cpu);
        assert_eq!(cpu.status_writes(), vec![CpuStatus::RP, CpuStatus::empty()]);
    }

    #[test]
    fn wait_queue_without_queue_waits_for_idle() {
        let mut cpu = FakeCpu::new();
        let engine = Scripted::new(&[1, 1, 0]);
        engine.wait_queue(&mut cpu);
        assert_eq!(engine.next.get(), 3);
    }

    /// Same playback, on an engine with no error bit.
    struct NoErrorBit<'a>(Scripted<'a>);

    impl DmaEngine for NoErrorBit<'_> {
        type Descriptor = ();
        const CAPS: EngineCaps = EngineCaps { queued: false, reports_errors: false };

        fn start(&mut self, _: &(), _: Direction) {}

        fn status(&self) -> DmaStatus {
            self.0.status()
        }
    }

    #[test]
    fn error_bit_ignored_without_error_reporting() {
        let mut cpu = FakeCpu::new();
        let engine = NoErrorBit(Scripted::new(&[1, 4]));
        assert_eq!(engine.wait_idle(&mut cpu), DmaStatus::Completed);
        assert_eq!(engine.0.next.get(), 2);
    }

    #[test]
    fn io_error_maps_to_error() {
        assert_eq!(DmaStatus::IoError.into_result(), Err(Error::PiIo));
        assert_eq!(DmaStatus::Completed.into_result(), Ok(()));
    }
}
