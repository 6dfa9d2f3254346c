//! Host-side stand-ins for the hardware.

use core::cell::{Cell, RefCell};
use std::sync::Once;

use crate::{
    cop0::{Cause, Cpu, CpuStatus},
    dma::{
        DmaEngine, DmaStatus, Direction, EngineCaps,
        sp::{SpDescriptor, SpDma},
    },
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CpuEvent {
    SetStatus(CpuStatus),
    ICacheInvalidate(u32),
    DCacheWriteback(u32),
    DCacheInvalidate(u32),
}

/// Records every COP0 write and cache operation in order.
pub struct FakeCpu {
    pub status: CpuStatus,
    pub cause: Cause,
    pub events: Vec<CpuEvent>,
}

impl FakeCpu {
    pub fn new() -> Self {
        Self {
            status: CpuStatus::empty(),
            cause: Cause(0),
            events: Vec::new(),
        }
    }

    pub fn status_writes(&self) -> Vec<CpuStatus> {
        self.events
            .iter()
            .filter_map(|e| match e {
                CpuEvent::SetStatus(s) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

impl Cpu for FakeCpu {
    fn status(&self) -> CpuStatus {
        self.status
    }

    fn set_status(&mut self, status: CpuStatus) {
        self.status = status;
        self.events.push(CpuEvent::SetStatus(status));
    }

    fn cause(&self) -> Cause {
        self.cause
    }

    fn icache_invalidate_line(&mut self, vaddr: u32) {
        self.events.push(CpuEvent::ICacheInvalidate(vaddr));
    }

    fn dcache_writeback_line(&mut self, vaddr: u32) {
        self.events.push(CpuEvent::DCacheWriteback(vaddr));
    }

    fn dcache_invalidate_line(&mut self, vaddr: u32) {
        self.events.push(CpuEvent::DCacheInvalidate(vaddr));
    }
}

/// RSP DMA model: two slots, the head transfer retires after [`FakeSp::LATENCY`]
/// polls of either status bit.
pub struct FakeSp {
    pub started: Vec<(SpDescriptor, Direction)>,
    pub in_flight: Cell<u32>,
    pub max_in_flight: u32,
    /// Polls that saw the queue slot occupied.
    pub full_polls: Cell<u32>,
    polls: Cell<u32>,
}

impl FakeSp {
    pub const LATENCY: u32 = 3;

    pub fn new() -> Self {
        Self {
            started: Vec::new(),
            in_flight: Cell::new(0),
            max_in_flight: 0,
            full_polls: Cell::new(0),
            polls: Cell::new(0),
        }
    }

    fn tick(&self) {
        let n = self.in_flight.get();
        if n == 0 {
            return;
        }
        let polls = self.polls.get() + 1;
        if polls >= Self::LATENCY {
            self.in_flight.set(n - 1);
            self.polls.set(0);
        } else {
            self.polls.set(polls);
        }
    }
}

impl DmaEngine for FakeSp {
    type Descriptor = SpDescriptor;
    const CAPS: EngineCaps = SpDma::CAPS;

    fn start(&mut self, descriptor: &SpDescriptor, direction: Direction) {
        let n = self.in_flight.get() + 1;
        assert!(n <= 2, "RSP DMA accepts one active and one queued transfer");
        self.in_flight.set(n);
        self.max_in_flight = self.max_in_flight.max(n);
        self.started.push((*descriptor, direction));
    }

    fn status(&self) -> DmaStatus {
        let busy = self.in_flight.get() > 0;
        self.tick();
        if busy {
            DmaStatus::InProgress
        } else {
            DmaStatus::Completed
        }
    }

    fn queue_full(&self) -> bool {
        let full = self.in_flight.get() >= 2;
        if full {
            self.full_polls.set(self.full_polls.get() + 1);
        }
        self.tick();
        full
    }
}

/// `log` sink keeping each test thread's records apart.
struct CaptureLog;

thread_local! {
    static RECORDS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

impl log::Log for CaptureLog {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        RECORDS.with(|r| r.borrow_mut().push(record.args().to_string()));
    }

    fn flush(&self) {}
}

static CAPTURE: CaptureLog = CaptureLog;

/// Run `f`, returning everything it logged on this thread.
pub fn captured_logs(f: impl FnOnce()) -> Vec<String> {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        log::set_logger(&CAPTURE).expect("no other logger in tests");
        log::set_max_level(log::LevelFilter::Trace);
    });

    RECORDS.with(|r| r.borrow_mut().clear());
    f();
    RECORDS.with(|r| r.take())
}

/// A register block backed by host memory, all registers reading zero.
pub fn zeroed<T>() -> Box<T> {
    // register blocks are plain u32 cells
    unsafe { Box::new(core::mem::zeroed()) }
}

#[cfg(feature = "dma-queue")]
mod tests {
    use super::*;
    use crate::mmio::PhysAddr;

    fn page() -> SpDescriptor {
        SpDescriptor::linear(0, PhysAddr::new(0x0010_0000), 0x1000)
    }

    #[test]
    fn fake_sp_queues_behind_busy_transfer() {
        let mut cpu = FakeCpu::new();
        let mut sp = FakeSp::new();

        sp.start(&page(), Direction::ToRdram);
        // one transfer active, the slot behind it is free
        sp.wait_queue(&mut cpu);
        assert_eq!(sp.in_flight.get(), 1);
        assert_eq!(sp.full_polls.get(), 0);

        sp.start(&page(), Direction::ToRdram);
        assert_eq!(sp.max_in_flight, 2);

        // blocks until the head retires, then returns with the second still busy
        sp.wait_queue(&mut cpu);
        assert_eq!(sp.in_flight.get(), 1);
        assert!(sp.full_polls.get() > 0);
        assert_eq!(sp.status(), DmaStatus::InProgress);

        assert_eq!(sp.wait_idle(&mut cpu), DmaStatus::Completed);
        assert_eq!(sp.in_flight.get(), 0);
    }
}
