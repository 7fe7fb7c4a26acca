//! Hardware and scheduler doubles for the stepper tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender},
        Mutex
    },
    time::Duration
};

use ec::{FanDuty, FanPort, Voltage, VoltagePort};
use pll::{ClockPort, Dividers};

use crate::scheduler::{Scheduler, Task, TaskHandle};

fn broken_bus() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, "bus is broken")
}

/// Pauses one write: signals `entered`, then waits on `release`.
struct WriteGate {
    entered: Sender<()>,
    release: Receiver<()>
}

/// Behaves like the real synthesizer: writes of the running value are dropped.
pub struct MockClock {
    pub current: Mutex<Dividers>,
    pub writes: Mutex<Vec<Dividers>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    gate: Mutex<Option<WriteGate>>
}

impl MockClock {
    pub fn new(m: u8, n: u16, pci: u8) -> Self {
        Self {
            current: Mutex::new(Dividers { m, n, pci }),
            writes: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            gate: Mutex::new(None)
        }
    }

    /// Makes the next write block until the returned sender fires.
    pub fn hold_next_write(&self) -> (Receiver<()>, Sender<()>) {
        let (entered_sender, entered) = mpsc::channel();
        let (release, release_receiver) = mpsc::channel();
        *self.gate.lock().unwrap() = Some(WriteGate { entered: entered_sender, release: release_receiver });
        (entered, release)
    }

    pub fn current(&self) -> Dividers {
        *self.current.lock().unwrap()
    }

    pub fn writes(&self) -> Vec<Dividers> {
        self.writes.lock().unwrap().clone()
    }
}

impl ClockPort for MockClock {
    fn read(&self) -> Result<Dividers, pll::Error> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(pll::Error::Transaction(broken_bus()));
        }
        Ok(self.current())
    }

    fn write(&self, dividers: Dividers) -> Result<(), pll::Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(pll::Error::Transaction(broken_bus()));
        }

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.send(()).unwrap();
            gate.release.recv().unwrap();
        }

        let mut current = self.current.lock().unwrap();
        if *current != dividers {
            *current = dividers;
            self.writes.lock().unwrap().push(dividers);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanEvent {
    Manual(bool),
    Speed(u8)
}

pub struct MockFan {
    pub manual: Mutex<bool>,
    pub speed: Mutex<FanDuty>,
    pub events: Mutex<Vec<FanEvent>>
}

impl MockFan {
    pub fn new(manual: bool, percent: u8) -> Self {
        Self {
            manual: Mutex::new(manual),
            speed: Mutex::new(FanDuty::new_clamped(percent)),
            events: Mutex::new(Vec::new())
        }
    }

    pub fn events(&self) -> Vec<FanEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl FanPort for MockFan {
    fn manual(&self) -> Result<bool, ec::Error> {
        Ok(*self.manual.lock().unwrap())
    }

    fn set_manual(&self, manual: bool) -> Result<(), ec::Error> {
        *self.manual.lock().unwrap() = manual;
        self.events.lock().unwrap().push(FanEvent::Manual(manual));
        Ok(())
    }

    fn speed(&self) -> Result<FanDuty, ec::Error> {
        Ok(*self.speed.lock().unwrap())
    }

    fn set_speed(&self, duty: FanDuty) -> Result<(), ec::Error> {
        *self.speed.lock().unwrap() = duty;
        self.events.lock().unwrap().push(FanEvent::Speed(duty.get()));
        Ok(())
    }

    fn rpm(&self) -> Result<u16, ec::Error> {
        Ok(u16::from(self.speed.lock().unwrap().get()) * 50)
    }
}

#[derive(Default)]
pub struct MockVoltage {
    pub level: Mutex<Voltage>
}

impl MockVoltage {
    pub fn level(&self) -> Voltage {
        *self.level.lock().unwrap()
    }
}

impl VoltagePort for MockVoltage {
    fn voltage(&self) -> Result<Voltage, ec::Error> {
        Ok(self.level())
    }

    fn set_voltage(&self, voltage: Voltage) -> Result<(), ec::Error> {
        *self.level.lock().unwrap() = voltage;
        Ok(())
    }
}

/// Holds scheduled tasks until the test fires them.
#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<VecDeque<(TaskHandle, Duration, Task)>>,
    next_id: AtomicU64
}

impl ManualScheduler {
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn pending_delays(&self) -> Vec<Duration> {
        self.pending.lock().unwrap().iter().map(|(_, delay, _)| *delay).collect()
    }

    /// Removes the oldest task without running it.
    pub fn take_next(&self) -> Option<Task> {
        self.pending.lock().unwrap().pop_front().map(|(_, _, task)| task)
    }

    /// Runs the oldest task, returns `false` if there was none.
    pub fn run_next(&self) -> bool {
        match self.take_next() {
            Some(task) => {
                task();
                true
            }
            None => false
        }
    }

    /// Fires tasks until none is left, returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut count = 0;
        while self.run_next() {
            count += 1;
            assert!(count < 10_000, "scheduling never stops");
        }
        count
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, delay: Duration, task: Task) -> TaskHandle {
        let handle = TaskHandle(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.pending.lock().unwrap().push_back((handle, delay, task));
        handle
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        let mut pending = self.pending.lock().unwrap();
        let before = pending.len();
        pending.retain(|(id, _, _)| *id != handle);
        pending.len() != before
    }

    fn drain(&self) {}
}
