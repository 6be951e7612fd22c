//! Error taxonomy of the system model.
//!
//! This module defines the three failure classes of a run, in the order they can occur:
//! 1. **`ConfigError`:** The resolved configuration is unusable; raised before any
//!    component exists.
//! 2. **`TopologyError`:** The component graph is structurally wrong (double connection,
//!    overlapping ranges, orphaned clock domain); construction never commits partially.
//! 3. **`EngineFault`:** The engine rejected the graph during instantiation or failed
//!    while running it.
//!
//! `SimError` wraps all three for the process boundary.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::addr::AddrRange;
use crate::sim::simulator::Phase;
use crate::soc::port::PortDirection;

/// Invalid or missing configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested number of cores is zero or negative.
    #[error("core count must be at least 1, got {0}")]
    NonPositiveCoreCount(i64),

    /// The core count is not an integer.
    #[error("core count '{0}' is not an integer")]
    InvalidCoreCount(String),

    /// A memory size string could not be parsed.
    #[error("invalid size '{value}': {reason}")]
    InvalidSize {
        /// The offending input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A cache associativity is not a positive integer.
    #[error("invalid associativity '{value}': {reason}")]
    InvalidAssociativity {
        /// The offending input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Size, associativity and line size do not describe a realisable cache.
    #[error("invalid geometry for cache '{cache}': {reason}")]
    InvalidCacheGeometry {
        /// Which cache (`l1_i`, `l1_d`, `llc`).
        cache: String,
        /// Why the geometry is rejected.
        reason: String,
    },

    /// A frequency string could not be parsed.
    #[error("invalid frequency '{value}': {reason}")]
    InvalidFrequency {
        /// The offending input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A time/latency string could not be parsed.
    #[error("invalid time '{value}': {reason}")]
    InvalidTime {
        /// The offending input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A voltage string could not be parsed.
    #[error("invalid voltage '{value}': {reason}")]
    InvalidVoltage {
        /// The offending input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The workload binary does not exist.
    #[error("binary '{}' does not exist", .0.display())]
    MissingBinary(PathBuf),

    /// A configuration file could not be read.
    #[error("cannot read config file '{}'", path.display())]
    ConfigFile {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A configuration document is not valid JSON for [`crate::config::Config`].
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Structural violations found while building or freezing the component graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// A component id does not belong to this graph.
    #[error("unknown component #{0}")]
    UnknownComponent(u32),

    /// The component does not expose the requested port.
    #[error("no such port: {0}")]
    UnknownPort(String),

    /// A core id too large to derive a process id from.
    #[error(
        "core {0} has no process id: {base} + {0} does not fit in 32 bits",
        base = crate::common::constants::PROCESS_PID_BASE
    )]
    PidOutOfRange(usize),

    /// A port was declared twice on the same component.
    #[error("port {0} is already declared")]
    PortAlreadyDeclared(String),

    /// A single port already has a peer.
    #[error("port {port} is already connected to {peer}")]
    PortAlreadyConnected {
        /// Port that was connected a second time.
        port: String,
        /// Its existing peer.
        peer: String,
    },

    /// Both ends of a connection point the same way.
    #[error("cannot connect {a} to {b}: both are {direction} ports")]
    IncompatiblePorts {
        /// First port.
        a: String,
        /// Second port.
        b: String,
        /// The shared direction.
        direction: PortDirection,
    },

    /// A component tried to connect one of its ports to itself.
    #[error("port {0} cannot be connected to its own component")]
    SelfConnection(String),

    /// A required port was left without a peer at freeze time.
    #[error("required port {0} is not connected")]
    UnconnectedPort(String),

    /// Two claimed address ranges intersect.
    #[error("address range {a} overlaps {b}")]
    AddressRangeOverlap {
        /// Owner and range of the first claim.
        a: String,
        /// Owner and range of the second claim.
        b: String,
    },

    /// A memory range is not covered by the system's declared ranges.
    #[error("{owner} claims {range}, which is outside the system memory ranges")]
    RangeNotDeclared {
        /// Component claiming the range.
        owner: String,
        /// The undeclared range.
        range: AddrRange,
    },

    /// A clocked component has no clock domain on its ownership path.
    #[error("{0} is not reachable from any clock domain")]
    UnreachableClockDomain(String),

    /// The system has no processing elements.
    #[error("a system needs at least one cpu")]
    NoCores,

    /// A cpu already has a workload bound.
    #[error("{0} already has a workload bound")]
    DuplicateWorkload(String),

    /// An address range with no addresses in it.
    #[error("empty address range [{start:#x}:{end:#x})")]
    EmptyAddressRange {
        /// Requested first address.
        start: u64,
        /// Requested end address.
        end: u64,
    },
}

/// Failures raised by the simulation engine or by lifecycle misuse.
#[derive(Debug, Error)]
pub enum EngineFault {
    /// A lifecycle operation was called in the wrong phase.
    #[error("cannot {operation} while {found}")]
    InvalidPhase {
        /// The attempted operation.
        operation: &'static str,
        /// Phase the simulation was in.
        found: Phase,
    },

    /// The graph failed freeze-time validation.
    #[error("instantiation failed: {0}")]
    Validation(#[from] TopologyError),

    /// The workload image could not be read.
    #[error("cannot read workload image '{}'", path.display())]
    ImageRead {
        /// Image path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The workload image is not a loadable program.
    #[error("cannot load workload image '{}': {reason}", path.display())]
    ImageParse {
        /// Image path.
        path: PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// No downstream port of a crossbar claims the address.
    #[error("{from} has no route for address {addr:#x}")]
    Unroutable {
        /// Crossbar that failed to route.
        from: String,
        /// The address.
        addr: u64,
    },

    /// A cpu reached instantiation with no process bound.
    #[error("{0} has no workload")]
    MissingWorkload(String),
}

/// Umbrella error for the process boundary.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Graph construction failed.
    #[error(transparent)]
    Topology(#[from] TopologyError),
    /// Instantiation or execution failed.
    #[error(transparent)]
    Engine(#[from] EngineFault),
}
