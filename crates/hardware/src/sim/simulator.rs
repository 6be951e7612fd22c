//! Simulation driver: owns the frozen system and its engine side-by-side.
//!
//! A `Simulation` is the explicit context of one run. It moves through
//! `Built → Instantiated → Running → Terminated` exactly once:
//! 1. **Instantiate:** Validates the graph and lets the engine allocate its state. A
//!    failure here is final: the simulation moves to `Failed` and can never run.
//! 2. **Simulate:** Blocks until the engine reports an exit; engine failures while
//!    running are turned into an exit event so they reach the same summary path.
//! 3. **Report:** The exit tick and cause stay available afterwards.

use std::fmt;

use crate::common::{EngineFault, Tick};
use crate::sim::engine::{Engine, ExitEvent, TimingEngine};
use crate::soc::System;

/// Lifecycle phase of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Graph constructed, not yet frozen.
    Built,
    /// Graph frozen and engine state allocated.
    Instantiated,
    /// The engine is advancing time.
    Running,
    /// The run is over.
    Terminated,
    /// Instantiation was refused; nothing can be retried.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Built => "built",
            Self::Instantiated => "instantiated",
            Self::Running => "running",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One run of a system on an engine.
#[derive(Debug)]
pub struct Simulation<E: Engine = TimingEngine> {
    system: System,
    engine: E,
    phase: Phase,
    exit: Option<ExitEvent>,
}

impl Simulation<TimingEngine> {
    /// Wraps `system` with the built-in timing engine.
    pub fn new(system: System) -> Self {
        Self::with_engine(system, TimingEngine::new())
    }
}

impl<E: Engine> Simulation<E> {
    /// Wraps `system` with a custom engine.
    pub const fn with_engine(system: System, engine: E) -> Self {
        Self {
            system,
            engine,
            phase: Phase::Built,
            exit: None,
        }
    }

    /// Freezes the graph and allocates engine state.
    ///
    /// # Errors
    ///
    /// * [`EngineFault::InvalidPhase`] unless the simulation is still `Built`.
    /// * [`EngineFault::Validation`] if the graph fails its structural checks.
    /// * Any fault raised by the engine.
    ///
    /// After either failure the simulation is `Failed` and every later call is rejected.
    pub fn instantiate(&mut self) -> Result<(), EngineFault> {
        self.expect_phase(Phase::Built, "instantiate")?;
        let frozen = self
            .system
            .validate()
            .map_err(EngineFault::from)
            .and_then(|()| self.engine.instantiate(&self.system));
        if let Err(fault) = frozen {
            self.phase = Phase::Failed;
            tracing::error!(%fault, "instantiation failed");
            return Err(fault);
        }
        self.phase = Phase::Instantiated;
        tracing::info!(
            cpus = self.system.cpus().len(),
            components = self.system.tree().len(),
            "system instantiated"
        );
        Ok(())
    }

    /// Runs with the tick limit from the system configuration, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EngineFault::InvalidPhase`] unless the simulation is `Instantiated`.
    pub fn simulate(&mut self) -> Result<ExitEvent, EngineFault> {
        let limit = self.system.general().max_tick;
        self.simulate_until(limit)
    }

    /// Runs until every process exits or `max_tick` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`EngineFault::InvalidPhase`] unless the simulation is `Instantiated`.
    /// Failures while running are not errors; they end the run with an
    /// [`ExitKind::Fault`](crate::sim::engine::ExitKind::Fault) event.
    pub fn simulate_until(&mut self, max_tick: Option<Tick>) -> Result<ExitEvent, EngineFault> {
        self.expect_phase(Phase::Instantiated, "simulate")?;
        self.phase = Phase::Running;
        tracing::info!(max_tick, "simulation started");

        let exit = self.engine.simulate(max_tick).unwrap_or_else(|fault| {
            tracing::error!(%fault, "engine fault while running");
            ExitEvent::fault(self.engine.cur_tick(), &fault)
        });

        self.phase = Phase::Terminated;
        tracing::info!(tick = exit.tick, cause = %exit.cause, "simulation terminated");
        self.exit = Some(exit.clone());
        Ok(exit)
    }

    fn expect_phase(&self, expected: Phase, operation: &'static str) -> Result<(), EngineFault> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineFault::InvalidPhase {
                operation,
                found: self.phase,
            })
        }
    }

    /// Current virtual time.
    pub fn cur_tick(&self) -> Tick {
        self.engine.cur_tick()
    }

    /// Current lifecycle phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// How the run ended, once it has.
    pub const fn exit_event(&self) -> Option<&ExitEvent> {
        self.exit.as_ref()
    }

    /// The simulated system.
    pub const fn system(&self) -> &System {
        &self.system
    }

    /// The engine.
    pub const fn engine(&self) -> &E {
        &self.engine
    }
}
