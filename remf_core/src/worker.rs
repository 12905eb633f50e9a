//! `MeasurementCore`: owns the periodic worker that drives a
//! `MeasurementEngine`.
//!
//! The worker thread multiplexes a command channel and a ticker. Ticks and
//! commands run to completion one at a time, so a tick can never be
//! interrupted by an interval change or a stop request. Dropping the core
//! (or calling `shutdown`) stops the ticker, releases the relay and joins the
//! thread before returning.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::WrapErr;

use crate::engine::{EngineStatus, MeasurementEngine, MeasurementEvent};
use crate::error::{CoreError, Result};
use crate::step::StepSettings;
use crate::tracker::StepTracker;

type StepJob = Box<dyn FnOnce(&mut StepTracker) + Send>;

enum Command {
    Start(xch::Sender<bool>),
    Stop(xch::Sender<bool>),
    SetInterval(Duration, xch::Sender<Duration>),
    SetThermoEmf(bool, xch::Sender<bool>),
    SetResistance(bool),
    Steps(StepJob),
    Status(xch::Sender<EngineStatus>),
    Subscribe(xch::Sender<xch::Receiver<MeasurementEvent>>),
    Shutdown,
}

pub struct MeasurementCore {
    cmd: xch::Sender<Command>,
    join_handle: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for MeasurementCore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MeasurementCore")
            .field("running", &self.join_handle.is_some())
            .finish()
    }
}

impl MeasurementCore {
    /// Move the engine onto a worker thread and start ticking.
    pub fn spawn(mut engine: MeasurementEngine) -> Result<Self> {
        let (cmd, cmd_rx) = xch::unbounded::<Command>();
        let join_handle = std::thread::Builder::new()
            .name("remf-measure".into())
            .spawn(move || {
                run_worker(&mut engine, &cmd_rx);
                engine.release();
                tracing::trace!("measurement worker exiting cleanly");
            })
            .wrap_err("spawn measurement worker")?;
        Ok(Self {
            cmd,
            join_handle: Some(join_handle),
        })
    }

    pub fn start_measurements(&self) -> Result<bool> {
        self.request(Command::Start)
    }

    pub fn stop_measurements(&self) -> Result<bool> {
        self.request(Command::Stop)
    }

    /// Returns the interval actually applied after clamping.
    pub fn set_interval(&self, interval: Duration) -> Result<Duration> {
        self.request(|tx| Command::SetInterval(interval, tx))
    }

    /// Returns whether thermo-EMF measurement is now active.
    pub fn set_measure_thermo_emf(&self, on: bool) -> Result<bool> {
        self.request(|tx| Command::SetThermoEmf(on, tx))
    }

    pub fn set_measure_resistance(&self, on: bool) -> Result<()> {
        self.send(Command::SetResistance(on))
    }

    pub fn status(&self) -> Result<EngineStatus> {
        self.request(Command::Status)
    }

    /// Subscribe to measurement events.
    pub fn subscribe(&self) -> Result<xch::Receiver<MeasurementEvent>> {
        self.request(Command::Subscribe)
    }

    /// Run `f` against the step program on the worker, between ticks.
    pub fn with_steps<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut StepTracker) -> R + Send + 'static,
    ) -> Result<R> {
        self.request(move |tx| {
            Command::Steps(Box::new(move |t: &mut StepTracker| {
                let _ = tx.send(f(t));
            }))
        })
    }

    pub fn select_step(&self, index: usize) -> Result<bool> {
        self.with_steps(move |t| t.select(index))?
    }

    pub fn push_step(&self, step: StepSettings) -> Result<()> {
        self.with_steps(move |t| t.push_step(step))
    }

    pub fn insert_step(&self, index: usize, step: StepSettings) -> Result<()> {
        self.with_steps(move |t| t.insert_step(index, step))?
    }

    pub fn remove_step(&self, index: usize) -> Result<StepSettings> {
        self.with_steps(move |t| t.remove_step(index))?
    }

    pub fn replace_step(&self, index: usize, step: StepSettings) -> Result<StepSettings> {
        self.with_steps(move |t| t.replace_step(index, step))?
    }

    pub fn edit_step(
        &self,
        index: usize,
        f: impl FnOnce(&mut StepSettings) + Send + 'static,
    ) -> Result<()> {
        self.with_steps(move |t| t.edit_step(index, f))?
    }

    pub fn steps(&self) -> Result<Vec<StepSettings>> {
        self.with_steps(|t| t.program().iter().cloned().collect())
    }

    /// Stop the worker and wait for it to exit. Further calls fail with
    /// `CoreError::State`.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.join_handle.take() else {
            return Ok(());
        };
        let _ = self.cmd.send(Command::Shutdown);
        handle.join().map_err(|_| {
            eyre::Report::new(CoreError::State("measurement worker panicked".into()))
        })
    }

    fn send(&self, c: Command) -> Result<()> {
        if self.join_handle.is_none() {
            return Err(eyre::Report::new(CoreError::State(
                "measurement core is shut down".into(),
            )));
        }
        self.cmd
            .send(c)
            .map_err(|_| eyre::Report::new(CoreError::Disconnected))
    }

    fn request<R>(&self, make: impl FnOnce(xch::Sender<R>) -> Command) -> Result<R> {
        let (tx, rx) = xch::bounded(1);
        self.send(make(tx))?;
        rx.recv()
            .map_err(|_| eyre::Report::new(CoreError::Disconnected))
    }
}

impl Drop for MeasurementCore {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.cmd.send(Command::Shutdown);
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("measurement worker joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "measurement worker panicked during shutdown");
                }
            }
        }
    }
}

fn run_worker(engine: &mut MeasurementEngine, cmd_rx: &xch::Receiver<Command>) {
    let mut ticker = xch::tick(engine.interval());
    loop {
        let mut retick = None;
        xch::select! {
            recv(cmd_rx) -> msg => match msg {
                Ok(Command::Shutdown) | Err(_) => {
                    tracing::debug!("measurement worker received shutdown");
                    break;
                }
                Ok(c) => retick = handle(engine, c),
            },
            recv(ticker) -> _ => {
                engine.tick();
            },
        }
        if let Some(interval) = retick {
            ticker = xch::tick(interval);
        }
    }
}

/// Apply one command. Returns a new interval when the ticker must restart.
fn handle(engine: &mut MeasurementEngine, c: Command) -> Option<Duration> {
    match c {
        Command::Start(tx) => {
            let _ = tx.send(engine.start_measurements());
        }
        Command::Stop(tx) => {
            let _ = tx.send(engine.stop_measurements());
        }
        Command::SetInterval(d, tx) => {
            let applied = engine.set_interval(d);
            let _ = tx.send(applied);
            return Some(applied);
        }
        Command::SetThermoEmf(on, tx) => {
            let _ = tx.send(engine.set_measure_thermo_emf(on));
        }
        Command::SetResistance(on) => engine.set_measure_resistance(on),
        Command::Steps(job) => engine.with_steps(job),
        Command::Status(tx) => {
            let _ = tx.send(engine.status());
        }
        Command::Subscribe(tx) => {
            let _ = tx.send(engine.subscribe());
        }
        Command::Shutdown => {}
    }
    None
}
