use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration
};

use ec::{FanDuty, FanPort, Voltage, VoltagePort};
use log::{debug, error, info, warn};
use pll::{ClockPort, Dividers, Mhz};

use crate::{
    calibration::{Calibration, Regime},
    error::Error,
    fan_memory::FanMemory,
    scheduler::{Scheduler, TaskHandle}
};

/// Log target of the per-tick trace.
pub const STEP_TARGET: &str = "step";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Stepping,
    ShuttingDown
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClockState {
    pub m_current: u8,
    pub m_target: u8,
    pub n_current: u16,
    pub n_target: u16,
    pub pci_target: u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub state: State,
    pub clock: ClockState,
    /// The last session ended on a window clamp.
    pub terminal: bool
}

pub struct Ports<Clock, Fan, Volt> {
    pub clock: Clock,
    pub fan: Fan,
    pub voltage: Volt
}

struct Session {
    state: State,
    clock: ClockState,
    fan: FanMemory,
    terminal: bool,
    generation: u64,
    pending: Option<TaskHandle>,
    last_error: Option<Error>
}

struct Shared<Clock, Fan, Volt, Sched> {
    calibration: Calibration,
    ports: Ports<Clock, Fan, Volt>,
    scheduler: Sched,
    session: Mutex<Session>,
    settled: Condvar
}

/// Drives the PLL towards a requested frequency, one tick at a time.
///
/// All the state lives behind one lock: a request, a tick and a shutdown never
/// overlap, and at most one tick is scheduled at any moment.
pub struct StepController<Clock, Fan, Volt, Sched>
where
    Clock: ClockPort + Send + Sync + 'static,
    Fan: FanPort + Send + Sync + 'static,
    Volt: VoltagePort + Send + Sync + 'static,
    Sched: Scheduler + 'static
{
    shared: Arc<Shared<Clock, Fan, Volt, Sched>>
}

impl<Clock, Fan, Volt, Sched> StepController<Clock, Fan, Volt, Sched>
where
    Clock: ClockPort + Send + Sync + 'static,
    Fan: FanPort + Send + Sync + 'static,
    Volt: VoltagePort + Send + Sync + 'static,
    Sched: Scheduler + 'static
{
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the calibration is inconsistent.
    pub fn new(calibration: Calibration, ports: Ports<Clock, Fan, Volt>, scheduler: Sched) -> Result<Self, Error> {
        calibration.validate()?;

        let session = Session {
            state: State::Idle,
            clock: ClockState::default(),
            fan: FanMemory::default(),
            terminal: false,
            generation: 0,
            pending: None,
            last_error: None
        };

        Ok(Self {
            shared: Arc::new(Shared {
                calibration,
                ports,
                scheduler,
                session: Mutex::new(session),
                settled: Condvar::new()
            })
        })
    }

    #[must_use]
    pub fn calibration(&self) -> &Calibration {
        &self.shared.calibration
    }

    /// Direct hardware access, bypassing the stepping session.
    #[must_use]
    pub fn ports(&self) -> &Ports<Clock, Fan, Volt> {
        &self.shared.ports
    }

    /// Starts a new stepping session towards `mhz`, replacing the running one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] after [`Self::shutdown`], or a hardware error.
    /// On error the controller stays idle and keeps its previous targets.
    pub fn request_frequency(&self, mhz: Mhz) -> Result<(), Error> {
        let shared = &self.shared;
        let mut session = shared.lock();

        if session.state == State::ShuttingDown {
            return Err(Error::ShuttingDown);
        }

        if let Some(handle) = session.pending.take() {
            shared.scheduler.cancel(handle);
        }
        session.generation += 1;
        session.state = State::Idle;

        match shared.arm(&mut session, mhz) {
            Ok(clock) => {
                info!(
                    "Stepping to {mhz} MHz: M {}->{}, N {}->{}",
                    clock.m_current, clock.m_target, clock.n_current, clock.n_target
                );
                session.clock = clock;
                session.terminal = false;
                session.last_error = None;
                session.state = State::Stepping;
                Shared::schedule_tick(shared, &mut session);
                Ok(())
            }
            Err(err) => {
                error!("Unable to start stepping to {mhz} MHz: {err}");
                shared.settled.notify_all();
                Err(err)
            }
        }
    }

    /// Stops stepping for good: cancels the pending tick and waits for a running one.
    pub fn shutdown(&self) {
        let shared = &self.shared;
        {
            let mut session = shared.lock();
            if session.state == State::ShuttingDown {
                return;
            }

            session.state = State::ShuttingDown;
            session.generation += 1;
            if let Some(handle) = session.pending.take() {
                shared.scheduler.cancel(handle);
            }
        }

        shared.scheduler.drain();
        shared.settled.notify_all();
        info!("Clock stepping stopped");
    }

    #[must_use]
    pub fn status(&self) -> Status {
        let session = self.shared.lock();
        Status {
            state: session.state,
            clock: session.clock,
            terminal: session.terminal
        }
    }

    /// Waits until no session is stepping, returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let session = self.shared.lock();
        let (session, _) = self.shared.settled
            .wait_timeout_while(session, timeout, |session| session.state == State::Stepping)
            .unwrap_or_else(PoisonError::into_inner);
        session.state != State::Stepping
    }

    /// The error that ended the last session, if any.
    pub fn take_error(&self) -> Option<Error> {
        self.shared.lock().last_error.take()
    }
}

impl<Clock, Fan, Volt, Sched> Drop for StepController<Clock, Fan, Volt, Sched>
where
    Clock: ClockPort + Send + Sync + 'static,
    Fan: FanPort + Send + Sync + 'static,
    Volt: VoltagePort + Send + Sync + 'static,
    Sched: Scheduler + 'static
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<Clock, Fan, Volt, Sched> Shared<Clock, Fan, Volt, Sched>
where
    Clock: ClockPort + Send + Sync + 'static,
    Fan: FanPort + Send + Sync + 'static,
    Volt: VoltagePort + Send + Sync + 'static,
    Sched: Scheduler + 'static
{
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Computes the targets of a new session and applies the fan policy of its regime.
    fn arm(&self, session: &mut Session, mhz: Mhz) -> Result<ClockState, Error> {
        let calibration = &self.calibration;
        let current = self.ports.clock.read()?;

        let (m_target, n_target) = match calibration.regime(mhz) {
            Regime::Standard => {
                session.fan.release(&self.ports.fan)?;

                let wanted = calibration.codec.to_dividers(mhz, calibration.standard_m);
                let n_target = calibration.standard_window.clamp(wanted);
                if n_target != wanted {
                    warn!(
                        "{mhz} MHz needs N={wanted}, limited to N={n_target} by the window {}",
                        calibration.standard_window
                    );
                }
                (calibration.standard_m, n_target)
            }
            Regime::Overclock => {
                let forced = FanDuty::new_clamped(calibration.overclock_fan_percent);
                session.fan.engage(&self.ports.fan, forced)?;
                (calibration.overclock_m, calibration.overclock_n)
            }
        };

        Ok(ClockState {
            m_current: current.m,
            m_target,
            n_current: current.n,
            n_target,
            pci_target: current.pci
        })
    }

    fn schedule_tick(shared: &Arc<Self>, session: &mut Session) {
        let weak: Weak<Self> = Arc::downgrade(shared);
        let generation = session.generation;
        let handle = shared.scheduler.schedule_once(
            shared.calibration.step_delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    Self::tick(&shared, generation);
                }
            })
        );
        session.pending = Some(handle);
    }

    fn tick(shared: &Arc<Self>, generation: u64) {
        let mut session = shared.lock();
        if session.state != State::Stepping || session.generation != generation {
            debug!(target: STEP_TARGET, "Stale tick of session #{generation} ignored");
            return;
        }
        session.pending = None;

        let Session { clock, terminal, .. } = &mut *session;
        match shared.step(clock, terminal) {
            Ok(true) => {
                let clock = session.clock;
                if session.terminal {
                    warn!("Stepping stopped at M={} N={}", clock.m_current, clock.n_current);
                } else {
                    info!(
                        "Reached {} MHz (M={} N={})",
                        shared.calibration.codec.to_frequency(clock.m_current, clock.n_current),
                        clock.m_current,
                        clock.n_current
                    );
                }
                session.state = State::Idle;
                shared.settled.notify_all();
            }
            Ok(false) => Self::schedule_tick(shared, &mut session),
            Err(err) => {
                error!("Stepping aborted: {err}");
                session.state = State::Idle;
                session.last_error = Some(err);
                shared.settled.notify_all();
            }
        }
    }

    fn program(&self, m: u8, n: u16, pci: u8) -> Result<(), Error> {
        self.ports.clock.write(Dividers { m, n, pci })?;
        Ok(())
    }

    /// Advances the session by one step. Returns `true` once the session is over.
    fn step(&self, clock: &mut ClockState, terminal: &mut bool) -> Result<bool, Error> {
        let calibration = &self.calibration;
        let pci = clock.pci_target;

        // Raising the divisor lowers the frequency: do it before N grows.
        if clock.n_target > clock.n_current && clock.m_target > clock.m_current {
            clock.m_current = clock.m_target;
            self.program(clock.m_current, clock.n_current, pci)?;
        }

        clock.n_current = if clock.n_current < clock.n_target {
            clock.n_current.saturating_add(calibration.n_step).min(clock.n_target)
        } else {
            clock.n_current.saturating_sub(calibration.n_step).max(clock.n_target)
        };
        self.program(clock.m_target, clock.n_current, pci)?;

        let window = calibration.window(clock.m_current, clock.m_target);
        if !window.contains(clock.n_current) {
            let clamped = window.clamp(clock.n_current);
            warn!("N={} left the window {window}, clamped to N={clamped}", clock.n_current);
            clock.n_current = clamped;
            self.program(clock.m_target, clock.n_current, pci)?;
            *terminal = true;
        }

        let near_floor = clock.n_current <= window.min.saturating_add(calibration.n_step);
        if (*terminal || clock.n_current == clock.n_target || near_floor) && clock.m_target != clock.m_current {
            clock.m_current = clock.m_target;
            self.program(clock.m_current, clock.n_current, pci)?;
        }

        let effective = calibration.codec.to_frequency(clock.m_target, clock.n_current);
        let voltage = if effective >= calibration.high_voltage_mhz {
            Voltage::High
        } else {
            Voltage::Low
        };
        self.ports.voltage.set_voltage(voltage)?;

        debug!(
            target: STEP_TARGET,
            "M={}/{} N={}/{} -> {effective} MHz, {voltage:?} voltage",
            clock.m_current, clock.m_target, clock.n_current, clock.n_target
        );

        Ok(*terminal || clock.n_current == clock.n_target)
    }
}
