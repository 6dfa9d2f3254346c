//! # Idle Bracket
//!
//! Every busy-wait in the runtime runs with the VR4300 in reduced-power mode.
//! RDRAM refresh and the RCP are clocked independently of the CPU pipeline, so
//! nothing we are waiting on slows down.

use crate::cop0::{Cpu, CpuStatus};

/// Holds the CPU in reduced-power mode until dropped.
pub struct IdleGuard<'a, C: Cpu> {
    cpu: &'a mut C,
}

impl<'a, C: Cpu> IdleGuard<'a, C> {
    #[inline(always)]
    pub fn enter(cpu: &'a mut C) -> Self {
        cpu.modify_status(|s| s.insert(CpuStatus::RP));
        Self { cpu }
    }
}

impl<'a, C: Cpu> Drop for IdleGuard<'a, C> {
    #[inline(always)]
    fn drop(&mut self) {
        self.cpu.modify_status(|s| s.remove(CpuStatus::RP));
    }
}

/// Poll until `poll` yields a value, idling in between.
///
/// There is no timeout. Hardware that never finishes hangs the caller.
#[inline]
pub fn spin<C: Cpu, T>(cpu: &mut C, mut poll: impl FnMut() -> Option<T>) -> T {
    let _idle = IdleGuard::enter(cpu);
    loop {
        if let Some(value) = poll() {
            return value;
        }
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCpu;

    #[test]
    fn guard_brackets_reduced_power() {
        let mut cpu = FakeCpu::new();
        cpu.status = CpuStatus::IE;
        {
            let _idle = IdleGuard::enter(&mut cpu);
        }
        assert_eq!(
            cpu.status_writes(),
            vec![CpuStatus::IE | CpuStatus::RP, CpuStatus::IE]
        );
    }

    #[test]
    fn spin_returns_first_ready_value() {
        let mut cpu = FakeCpu::new();
        let mut polls = 0;
        let value = spin(&mut cpu, || {
            polls += 1;
            (polls == 3).then_some(polls * 10)
        });
        assert_eq!(value, 30);
        assert!(!cpu.status.contains(CpuStatus::RP));
    }
}
