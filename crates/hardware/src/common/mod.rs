//! Common utilities and types used throughout the system model.
//!
//! This module provides the building blocks shared by every layer. It includes:
//! 1. **Address Ranges:** Half-open physical address intervals.
//! 2. **Constants:** Tick resolution, process id base, interrupt windows.
//! 3. **Units:** Parsers for sizes, frequencies, times, and voltages.
//! 4. **Error Handling:** The configuration, topology, and engine error taxonomy.

/// Physical address ranges.
pub mod addr;

/// Common constants used throughout the simulator.
pub mod constants;

/// Error types for configuration, topology, and engine failures.
pub mod error;

/// Quantity parsing (sizes, frequencies, times, voltages).
pub mod units;

pub use addr::AddrRange;
pub use error::{ConfigError, EngineFault, SimError, TopologyError};
pub use units::{Frequency, Tick};
