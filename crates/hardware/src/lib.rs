//! Multi-core system model library.
//!
//! This crate assembles a multi-core machine and drives it through a timing simulation:
//! 1. **Configuration:** Hardware parameters with defaults, and the resolved run record.
//! 2. **Topology:** Clock domain, cpus, private and shared caches, crossbars, interrupt
//!    controllers and the memory controller, wired through a typed port registry.
//! 3. **Workloads:** One image, resolved once, run by every core as its own process.
//! 4. **Simulation:** The `Built → Instantiated → Running → Terminated` driver and the
//!    built-in trace-driven timing engine.

/// Common types and constants (addresses, units, errors).
pub mod common;
/// Model configuration (defaults, enums, hierarchical config structures, run record).
pub mod config;
/// Workloads, engines and the simulation driver.
pub mod sim;
/// System-on-chip components and the system builder.
pub mod soc;

/// Root hardware configuration; use `Config::default()` or deserialize from JSON.
pub use crate::config::{Config, RunConfig, RunOptions};
/// Errors surfaced at the process boundary.
pub use crate::common::{ConfigError, EngineFault, SimError, TopologyError};
/// Lifecycle driver and exit report.
pub use crate::sim::{ExitEvent, Phase, Simulation};
/// Top-level system graph; construct with `System::build`.
pub use crate::soc::System;
