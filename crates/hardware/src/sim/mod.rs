//! Simulation: workloads, engines and the lifecycle driver.
//!
//! Resolves the workload image, turns a built `System` into engine state and drives
//! it from instantiation to the exit report.

/// Discrete event queue.
pub mod event;

/// Engine trait and the built-in timing engine.
pub mod engine;

/// Lifecycle driver.
pub mod simulator;

/// Workload images and processes.
pub mod workload;

pub use engine::{Engine, ExitEvent, ExitKind, TimingEngine};
pub use simulator::{Phase, Simulation};
