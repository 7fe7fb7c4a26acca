//! In-memory Eee PC for the surface and console tests.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex
    },
    time::Duration
};

use ec::{FanDuty, FanPort, Thermometer, Voltage, VoltagePort};
use pll::{ClockPort, Dividers};
use stepper::{Calibration, Ports, Scheduler, StepController, Task, TaskHandle};

struct Board {
    dividers: Dividers,
    voltage: Voltage,
    manual: bool,
    duty: FanDuty
}

pub struct MockHardware {
    board: Mutex<Board>
}

impl ClockPort for MockHardware {
    fn read(&self) -> Result<Dividers, pll::Error> {
        Ok(self.board.lock().unwrap().dividers)
    }

    fn write(&self, dividers: Dividers) -> Result<(), pll::Error> {
        self.board.lock().unwrap().dividers = dividers;
        Ok(())
    }
}

impl FanPort for MockHardware {
    fn manual(&self) -> Result<bool, ec::Error> {
        Ok(self.board.lock().unwrap().manual)
    }

    fn set_manual(&self, manual: bool) -> Result<(), ec::Error> {
        self.board.lock().unwrap().manual = manual;
        Ok(())
    }

    fn speed(&self) -> Result<FanDuty, ec::Error> {
        Ok(self.board.lock().unwrap().duty)
    }

    fn set_speed(&self, duty: FanDuty) -> Result<(), ec::Error> {
        self.board.lock().unwrap().duty = duty;
        Ok(())
    }

    fn rpm(&self) -> Result<u16, ec::Error> {
        Ok(3200)
    }
}

impl VoltagePort for MockHardware {
    fn voltage(&self) -> Result<Voltage, ec::Error> {
        Ok(self.board.lock().unwrap().voltage)
    }

    fn set_voltage(&self, voltage: Voltage) -> Result<(), ec::Error> {
        self.board.lock().unwrap().voltage = voltage;
        Ok(())
    }
}

impl Thermometer for MockHardware {
    fn temperature(&self) -> Result<u8, ec::Error> {
        Ok(54)
    }
}

/// Accepts tasks and never runs them.
#[derive(Default)]
pub struct ShelfScheduler {
    next_id: AtomicU64
}

impl Scheduler for ShelfScheduler {
    fn schedule_once(&self, _delay: Duration, _task: Task) -> TaskHandle {
        TaskHandle(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn cancel(&self, _handle: TaskHandle) -> bool {
        false
    }

    fn drain(&self) {}
}

pub type TestController = StepController<Arc<MockHardware>, Arc<MockHardware>, Arc<MockHardware>, ShelfScheduler>;

pub struct Rig {
    pub controller: TestController,
    pub hardware: Arc<MockHardware>
}

/// Board running at (50, 420, 15) with the fan at 30% under EC control.
pub fn rig() -> Rig {
    let hardware = Arc::new(MockHardware {
        board: Mutex::new(Board {
            dividers: Dividers { m: 50, n: 420, pci: 15 },
            voltage: Voltage::Low,
            manual: false,
            duty: FanDuty::new_clamped(30)
        })
    });

    let controller = StepController::new(
        Calibration::default(),
        Ports {
            clock: Arc::clone(&hardware),
            fan: Arc::clone(&hardware),
            voltage: Arc::clone(&hardware)
        },
        ShelfScheduler::default()
    ).unwrap();

    Rig { controller, hardware }
}
