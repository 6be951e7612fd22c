//! System-on-Chip (SoC) Components.
//!
//! This module organizes the components that make up the simulated machine: the
//! ownership tree and port registry that hold the graph together, the clock domain,
//! caches, crossbars, interrupt controllers, the memory controller and the cpus, and
//! the builder that assembles them into a `System`.

/// System builder and the top-level graph.
pub mod builder;

/// Private and shared caches, and the tag store model.
pub mod cache;

/// Clock and voltage domains.
pub mod clock;

/// Component identity and ownership tree.
pub mod component;

/// Processing elements.
pub mod cpu;

/// Crossbars and address maps.
pub mod interconnect;

/// Per-core interrupt controllers.
pub mod interrupts;

/// Memory controller and latency models.
pub mod memory;

/// Typed port registry.
pub mod port;

pub use builder::{System, TopologySummary};
