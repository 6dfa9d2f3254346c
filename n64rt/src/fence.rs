//! # VBlank Fence
//!
//! One flag shared between the VI interrupt (the only writer of `true`) and the
//! render loop (the only reader, and the only writer of `false`).
//!
//! ```ignore
//! loop {
//!     fence.wait(&mut cpu);   // consume the signal
//!     swap_buffers();
//!     fence.reinitialize();   // arm for the next vblank
//!     draw_next_frame();
//! }
//! ```
//!
//! There is a single waiter and no arbitration. A vblank that fires twice
//! before the loop resets the fence is not detected.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::{cop0::Cpu, idle};

pub struct VblankFence {
    signaled: AtomicBool,
}

impl VblankFence {
    /// An unsignaled fence.
    pub const fn new() -> Self {
        Self {
            signaled: AtomicBool::new(false),
        }
    }

    /// Interrupt context only.
    #[inline(always)]
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    /// Non-blocking check, for CPU-heavy loops that want to yield at vblank.
    #[inline(always)]
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    /// Idle until the interrupt has signaled.
    #[inline]
    pub fn wait<C: Cpu>(&self, cpu: &mut C) {
        idle::spin(cpu, || self.is_signaled().then_some(()));
    }

    /// Force the fence unsignaled before the VI interrupt is armed.
    #[inline(always)]
    pub fn initialize(&self) {
        self.signaled.store(false, Ordering::Release);
    }

    /// Back to unsignaled. Only after the previous signal was consumed.
    #[inline(always)]
    pub fn reinitialize(&self) {
        self.signaled.store(false, Ordering::Release);
    }
}

impl Default for VblankFence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCpu;

    #[test]
    fn round_trip() {
        let mut cpu = FakeCpu::new();
        let fence = VblankFence::new();
        fence.signal();
        fence.initialize();
        assert!(!fence.is_signaled());

        fence.signal();
        assert!(fence.is_signaled());

        fence.wait(&mut cpu);
        assert!(fence.is_signaled());

        fence.reinitialize();
        assert!(!fence.is_signaled());
    }

    #[test]
    fn wait_sees_signal_from_another_context() {
        static FENCE: VblankFence = VblankFence::new();

        let producer = std::thread::spawn(|| {
            std::thread::sleep(std::time::Duration::from_millis(5));
            FENCE.signal();
        });

        let mut cpu = FakeCpu::new();
        FENCE.wait(&mut cpu);
        assert!(FENCE.is_signaled());
        producer.join().unwrap();
    }
}
